// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::Error;
use crate::json;
use crate::json::EncodeOptions;
use crate::packer::Packer;
use crate::record::Record;

/// A packer rendering records as JSON objects.
///
/// Output format:
///
/// ```json
/// {"timestamp":"2024-08-11T22:44:57.172105+08:00","channel":"app","tag":"info","context":{"pid":42},"payload":{"message":"Hello!"}}
/// ```
///
/// # Examples
///
/// ```
/// use flogger::json::EncodeOptions;
/// use flogger::packer::JsonPacker;
///
/// let packer = JsonPacker::default().options(EncodeOptions::default().with_pretty_print(true));
/// ```
#[derive(Default, Debug, Clone)]
pub struct JsonPacker {
    options: EncodeOptions,
}

impl JsonPacker {
    /// Set the encoder options.
    pub fn options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }
}

impl Packer for JsonPacker {
    fn pack(&self, record: &Record) -> Result<String, Error> {
        Ok(json::encode(&record.to_value(), &self.options))
    }
}
