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
use crate::value::Map;
use crate::value::Value;

/// A packer rendering records in the Fluentd forward message form.
///
/// Output format:
///
/// ```json
/// ["app.error",1723387497,{"channel":"app","context":{},"payload":{"message":"Hello!"}}]
/// ```
#[derive(Default, Debug, Clone)]
pub struct FluentdPacker {
    options: EncodeOptions,
}

impl FluentdPacker {
    /// Set the encoder options.
    pub fn options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }
}

impl Packer for FluentdPacker {
    fn pack(&self, record: &Record) -> Result<String, Error> {
        let mut body = Map::new();
        body.insert("channel", record.channel());
        body.insert("context", record.context().clone());
        body.insert("payload", record.payload().clone());

        let message = Value::Seq(vec![
            Value::from(record.tag()),
            Value::Int(record.epoch_seconds()),
            Value::Map(body),
        ]);
        Ok(json::encode(&message, &self.options))
    }
}
