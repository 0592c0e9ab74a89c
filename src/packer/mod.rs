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

//! Packers for rendering records as text.

use std::fmt;

use crate::Error;
use crate::record::Record;

mod fluentd;
mod json;
mod line;

pub use self::fluentd::FluentdPacker;
pub use self::json::JsonPacker;
pub use self::line::DEFAULT_PATTERN;
pub use self::line::LinePacker;
pub use self::line::MAX_WIDTH;

/// A packer renders a record as text.
pub trait Packer: fmt::Debug + Send + Sync + 'static {
    /// Render `record`.
    ///
    /// Values are encoded with [`crate::json::encode`], so this only fails on residual faults,
    /// such as a timestamp pattern that cannot be applied.
    fn pack(&self, record: &Record) -> Result<String, Error>;
}

impl<T: Packer> From<T> for Box<dyn Packer> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use jiff::Timestamp;
    use jiff::tz::TimeZone;

    use crate::record::Record;
    use crate::value::Map;

    /// A record at `2024-08-11T14:44:57.172105Z` in UTC.
    pub(crate) fn record(channel: &str, tag: &str, payload: Map, context: Map) -> Record {
        let ts: Timestamp = "2024-08-11T14:44:57.172105Z".parse().unwrap();
        Record::new(ts.to_zoned(TimeZone::UTC), channel, tag, payload, context)
    }
}
