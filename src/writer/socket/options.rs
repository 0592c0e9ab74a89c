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

use std::time::Duration;

use serde::Deserialize;

use crate::Error;
use crate::value::Map;
use crate::value::Value;

/// Default connection timeout, in seconds.
pub const DEFAULT_CONNECTION_TIMEOUT: u64 = 3;
/// Default read and write timeout, in seconds.
pub const DEFAULT_SOCKET_TIMEOUT: u64 = 3;
/// Default number of retries after a failed send.
pub const DEFAULT_WRITE_RETRY_COUNT: u32 = 3;
/// Default base sleep between retries, in microseconds.
pub const DEFAULT_WRITE_RETRY_SLEEP: u64 = 1000;
/// Default growth factor of the sleep between retries.
pub const DEFAULT_WRITE_RETRY_FACTOR: u32 = 1;

/// Options of a [`SocketWriter`](crate::writer::SocketWriter).
///
/// Options can be built in code, deserialized, or read from an options [`Map`] with the keys
/// named after the fields.
///
/// # Examples
///
/// ```
/// use flogger::writer::SocketOptions;
///
/// let options = SocketOptions {
///     persistent: true,
///     write_retry_factor: 2,
///     ..Default::default()
/// };
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SocketOptions {
    /// Seconds to wait for the connection to be established, at least 1.
    pub connection_timeout: u64,
    /// Seconds to wait on a blocked read or write, at least 1.
    pub socket_timeout: u64,
    /// Share the connection through the process-wide registry and never close it on drop.
    pub persistent: bool,
    /// Retries after a failed send; 0 disables retrying.
    pub write_retry_count: u32,
    /// Base sleep between retries in microseconds, at least 1.
    pub write_retry_sleep: u64,
    /// The sleep before retry `n` is `write_retry_sleep * write_retry_factor^n`. At least 1.
    pub write_retry_factor: u32,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
            persistent: false,
            write_retry_count: DEFAULT_WRITE_RETRY_COUNT,
            write_retry_sleep: DEFAULT_WRITE_RETRY_SLEEP,
            write_retry_factor: DEFAULT_WRITE_RETRY_FACTOR,
        }
    }
}

impl SocketOptions {
    /// Check every bound, failing with a configuration error on the first violation.
    pub fn validate(&self) -> Result<(), Error> {
        at_least(self.write_retry_sleep, 1, "Invalid retry sleep value")?;
        at_least(u64::from(self.write_retry_factor), 1, "Invalid retry factor value")?;
        at_least(self.connection_timeout, 1, "Invalid socket connection timeout")?;
        at_least(self.socket_timeout, 1, "Invalid socket timeout")?;
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout)
    }

    /// The sleep before retry number `retry` (1-based), saturating.
    pub fn retry_delay(&self, retry: u32) -> Duration {
        let factor = u64::from(self.write_retry_factor).saturating_pow(retry);
        Duration::from_micros(self.write_retry_sleep.saturating_mul(factor))
    }
}

fn at_least(value: u64, min: u64, message: &str) -> Result<(), Error> {
    if value >= min {
        Ok(())
    } else {
        Err(Error::configuration(format!("{message}: {value}")))
    }
}

/// Read options from a map. Missing keys take their default; unknown keys are ignored.
impl TryFrom<&Map> for SocketOptions {
    type Error = Error;

    fn try_from(map: &Map) -> Result<Self, Self::Error> {
        let defaults = SocketOptions::default();
        let options = SocketOptions {
            connection_timeout: int(
                map,
                "connection_timeout",
                defaults.connection_timeout,
                "Invalid socket connection timeout",
            )?,
            socket_timeout: int(
                map,
                "socket_timeout",
                defaults.socket_timeout,
                "Invalid socket timeout",
            )?,
            persistent: match map.get("persistent") {
                None => defaults.persistent,
                Some(Value::Bool(b)) => *b,
                Some(other) => {
                    return Err(Error::configuration(format!(
                        "Invalid socket persistent flag, expected bool but got {}",
                        other.kind()
                    )));
                }
            },
            write_retry_count: int(
                map,
                "write_retry_count",
                defaults.write_retry_count,
                "Invalid retry count value",
            )?,
            write_retry_sleep: int(
                map,
                "write_retry_sleep",
                defaults.write_retry_sleep,
                "Invalid retry sleep value",
            )?,
            write_retry_factor: int(
                map,
                "write_retry_factor",
                defaults.write_retry_factor,
                "Invalid retry factor value",
            )?,
        };
        options.validate()?;
        Ok(options)
    }
}

fn int<T: TryFrom<i64>>(map: &Map, key: &str, default: T, message: &str) -> Result<T, Error> {
    match map.get(key) {
        None => Ok(default),
        Some(Value::Int(i)) => {
            T::try_from(*i).map_err(|_| Error::configuration(format!("{message}: {i}")))
        }
        Some(other) => Err(Error::configuration(format!("{message}: {}", other.kind()))),
    }
}
