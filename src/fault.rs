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

//! Structured dumps of errors and their source chains.

use std::backtrace::Backtrace;
use std::backtrace::BacktraceStatus;
use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;
use std::sync::OnceLock;

use crate::value::Map;
use crate::value::Value;

/// A captured error, serialized as a structured dump instead of its native form.
///
/// The dump is computed on first access and reused afterwards.
pub struct Fault {
    error: Box<dyn StdError + Send + Sync + 'static>,
    class: &'static str,
    location: &'static Location<'static>,
    backtrace: Backtrace,
    dump: OnceLock<FaultDump>,
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("class", &self.class)
            .field("error", &self.error)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fault ({})", self.class)
    }
}

impl Fault {
    /// Capture `err` with the caller's location and a backtrace.
    #[track_caller]
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            error: Box::new(err),
            class: std::any::type_name::<E>(),
            location: Location::caller(),
            backtrace: Backtrace::capture(),
            dump: OnceLock::new(),
        }
    }

    /// Return the wrapped error.
    pub fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.error.as_ref()
    }

    /// Return the structured dump, computing it on first access.
    pub fn dump(&self) -> &FaultDump {
        self.dump.get_or_init(|| self.compute())
    }

    fn compute(&self) -> FaultDump {
        let primary: &(dyn StdError + 'static) = self.error.as_ref();

        let mut stack = vec![];
        let mut cause = primary.source();
        while let Some(err) = cause {
            stack.push(FaultFrame {
                class: class_of(err),
                message: err.to_string(),
                code: code_of(err),
                file: None,
                line: None,
            });
            cause = err.source();
        }

        FaultDump {
            frame: FaultFrame {
                class: self.class.to_string(),
                message: primary.to_string(),
                code: code_of(primary),
                file: Some(self.location.file().to_string()),
                line: Some(self.location.line()),
            },
            trace: self.trace(),
            stack,
        }
    }

    fn trace(&self) -> Vec<String> {
        match self.backtrace.status() {
            BacktraceStatus::Captured => self
                .backtrace
                .to_string()
                .lines()
                .map(|line| line.trim_end().to_string())
                .filter(|line| !line.is_empty())
                .collect(),
            _ => vec![format!(
                "#0 {}({})",
                self.location.file(),
                self.location.line()
            )],
        }
    }
}

/// One error of a chain: `{class, message, code, file, line}`.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultFrame {
    pub class: String,
    pub message: String,
    pub code: i64,
    /// Only known for the primary error.
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl FaultFrame {
    fn fill(&self, map: &mut Map) {
        map.insert("class", self.class.as_str());
        map.insert("message", self.message.as_str());
        map.insert("code", self.code);
        map.insert("file", self.file.clone());
        map.insert("line", self.line);
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        self.fill(&mut map);
        Value::Map(map)
    }
}

/// The structured dump of a [`Fault`].
#[derive(Debug, Clone, PartialEq)]
pub struct FaultDump {
    /// The primary error.
    pub frame: FaultFrame,
    /// Backtrace lines, captured where the fault was built.
    pub trace: Vec<String>,
    /// The source chain without the primary error, innermost first.
    pub stack: Vec<FaultFrame>,
}

impl FaultDump {
    /// Render as a map with keys `class, message, code, file, line, trace, stack`.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        self.frame.fill(&mut map);
        map.insert(
            "trace",
            Value::Seq(self.trace.iter().map(|t| Value::from(t.as_str())).collect()),
        );
        map.insert(
            "stack",
            Value::Seq(self.stack.iter().map(FaultFrame::to_value).collect()),
        );
        Value::Map(map)
    }
}

fn class_of(err: &(dyn StdError + 'static)) -> String {
    macro_rules! known {
        ($($t:ty),* $(,)?) => {
            $(
                if err.is::<$t>() {
                    return std::any::type_name::<$t>().to_string();
                }
            )*
        };
    }

    known!(
        std::io::Error,
        std::fmt::Error,
        std::str::Utf8Error,
        std::string::FromUtf8Error,
        std::num::ParseIntError,
        std::num::ParseFloatError,
        serde_json::Error,
        crate::Error,
    );

    // Fall back to the leading identifier of the Debug form, e.g. `MyError { .. }`.
    let debug = format!("{err:?}");
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if name.is_empty() {
        "dyn std::error::Error".to_string()
    } else {
        name
    }
}

fn code_of(err: &(dyn StdError + 'static)) -> i64 {
    if let Some(err) = err.downcast_ref::<std::io::Error>() {
        return err.raw_os_error().map_or(0, i64::from);
    }
    if let Some(err) = err.downcast_ref::<crate::Error>() {
        return err.os_code().map_or(0, i64::from);
    }
    0
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[derive(Debug)]
    struct Layered {
        message: &'static str,
        source: Option<Box<dyn StdError + Send + Sync>>,
    }

    impl fmt::Display for Layered {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl StdError for Layered {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.source.as_ref().map(|s| s.as_ref() as _)
        }
    }

    #[test]
    fn test_dump_walks_the_source_chain() {
        let x1 = io::Error::from_raw_os_error(2);
        let x2 = Layered {
            message: "x2",
            source: Some(Box::new(x1)),
        };
        let x3 = Layered {
            message: "x3",
            source: Some(Box::new(x2)),
        };

        let fault = Fault::new(x3);
        let line = line!() - 1;
        let dump = fault.dump();

        assert!(dump.frame.class.ends_with("Layered"));
        assert_eq!(dump.frame.message, "x3");
        assert_eq!(dump.frame.code, 0);
        assert_eq!(dump.frame.file.as_deref(), Some(file!()));
        assert_eq!(dump.frame.line, Some(line));
        assert!(!dump.trace.is_empty());

        assert_eq!(dump.stack.len(), 2);
        assert_eq!(dump.stack[0].class, "Layered");
        assert_eq!(dump.stack[0].message, "x2");
        assert_eq!(dump.stack[0].file, None);
        assert!(dump.stack[1].class.starts_with("std::io"));
        assert_eq!(dump.stack[1].code, 2);
    }

    #[test]
    fn test_dump_is_memoized() {
        let fault = Fault::new(io::Error::other("kaput"));
        let first = fault.dump() as *const FaultDump;
        let second = fault.dump() as *const FaultDump;
        assert_eq!(first, second);
    }

    #[test]
    fn test_dump_value_keys() {
        let fault = Fault::new(io::Error::other("kaput"));
        let value = fault.dump().to_value();
        let map = value.as_map().unwrap();
        assert_eq!(
            map.keys().collect::<Vec<_>>(),
            vec!["class", "message", "code", "file", "line", "trace", "stack"]
        );
        assert_eq!(map.get("message"), Some(&Value::from("kaput")));
        assert_eq!(map.get("stack"), Some(&Value::Seq(vec![])));
    }
}
