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

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use jiff::Zoned;
use jiff::tz::TimeZone;

use crate::Error;
use crate::value::Map;
use crate::value::Value;

/// The wire format of record timestamps, e.g. `2024-08-11T22:44:57.172105+08:00`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%6f%:z";

/// One log entry.
#[derive(Debug, Clone)]
pub struct Record {
    timestamp: Zoned,
    channel: String,
    tag: String,
    payload: Map,
    context: Map,
}

impl Record {
    /// Create a record with an explicit timestamp.
    pub fn new(
        timestamp: Zoned,
        channel: impl Into<String>,
        tag: impl Into<String>,
        payload: Map,
        context: Map,
    ) -> Self {
        Self {
            timestamp,
            channel: channel.into(),
            tag: tag.into(),
            payload,
            context,
        }
    }

    /// Create a record stamped with the current time in `timezone`.
    pub fn now(
        timezone: &TimeZone,
        channel: impl Into<String>,
        tag: impl Into<String>,
        payload: Map,
        context: Map,
    ) -> Self {
        let timestamp = Timestamp::now().to_zoned(timezone.clone());
        Self::new(timestamp, channel, tag, payload, context)
    }

    pub fn timestamp(&self) -> &Zoned {
        &self.timestamp
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn payload(&self) -> &Map {
        &self.payload
    }

    pub fn context(&self) -> &Map {
        &self.context
    }

    /// The timestamp in wire format.
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.strftime(TIMESTAMP_FORMAT).to_string()
    }

    /// Whole seconds since the Unix epoch.
    pub fn epoch_seconds(&self) -> i64 {
        self.timestamp.timestamp().as_second()
    }

    /// The record as a map with keys `timestamp, channel, tag, context, payload`.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("timestamp", self.formatted_timestamp());
        map.insert("channel", self.channel.as_str());
        map.insert("tag", self.tag.as_str());
        map.insert("context", self.context.clone());
        map.insert("payload", self.payload.clone());
        Value::Map(map)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record ({}, {})", self.channel, self.tag)
    }
}

/// The eight syslog severities, used as record tags by [`Logger`](crate::Logger) methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl Level {
    pub const ALL: [Level; 8] = [
        Level::Emergency,
        Level::Alert,
        Level::Critical,
        Level::Error,
        Level::Warning,
        Level::Notice,
        Level::Info,
        Level::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Emergency => "emergency",
            Level::Alert => "alert",
            Level::Critical => "critical",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Notice => "notice",
            Level::Info => "info",
            Level::Debug => "debug",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::configuration(format!("unknown level: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accessors_and_value() {
        let ts: Timestamp = "2024-08-11T14:44:57.172105Z".parse().unwrap();
        let tz = TimeZone::fixed(jiff::tz::offset(8));
        let record = Record::new(
            ts.to_zoned(tz),
            "app",
            "info",
            Map::from([("message", "hello")]),
            Map::from([("pid", 42)]),
        );

        assert_eq!(record.channel(), "app");
        assert_eq!(record.tag(), "info");
        assert_eq!(record.formatted_timestamp(), "2024-08-11T22:44:57.172105+08:00");
        assert_eq!(record.epoch_seconds(), 1723387497);

        let value = record.to_value();
        let map = value.as_map().unwrap();
        assert_eq!(
            map.keys().collect::<Vec<_>>(),
            vec!["timestamp", "channel", "tag", "context", "payload"]
        );
        assert_eq!(record.to_string(), "Record (app, info)");
    }

    #[test]
    fn test_level_round_trip() {
        for level in Level::ALL {
            assert_eq!(level.as_str().parse::<Level>().unwrap(), level);
        }
        assert_eq!("WARNING".parse::<Level>().unwrap(), Level::Warning);
        assert!("verbose".parse::<Level>().is_err());
    }
}
