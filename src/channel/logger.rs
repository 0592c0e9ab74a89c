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

use crate::record::Level;
use crate::value::Map;

/// The application-facing logging interface.
///
/// Implementations never report failures to the caller.
pub trait Logger: fmt::Debug + Send + Sync + 'static {
    /// Post a structured `payload` under `tag`.
    fn post(&self, tag: &str, payload: Map);

    /// Post `message` under the `level` tag.
    ///
    /// Each `{key}` of `message` naming an entry of `vars` is replaced by the entry's JSON
    /// encoding without surrounding quotes, and the entry is dropped. The remaining `vars` plus
    /// the interpolated `message` form the payload.
    fn log(&self, level: &str, message: &str, vars: Map);

    fn emergency(&self, message: &str, vars: Map) {
        self.log(Level::Emergency.as_str(), message, vars);
    }

    fn alert(&self, message: &str, vars: Map) {
        self.log(Level::Alert.as_str(), message, vars);
    }

    fn critical(&self, message: &str, vars: Map) {
        self.log(Level::Critical.as_str(), message, vars);
    }

    fn error(&self, message: &str, vars: Map) {
        self.log(Level::Error.as_str(), message, vars);
    }

    fn warning(&self, message: &str, vars: Map) {
        self.log(Level::Warning.as_str(), message, vars);
    }

    fn notice(&self, message: &str, vars: Map) {
        self.log(Level::Notice.as_str(), message, vars);
    }

    fn info(&self, message: &str, vars: Map) {
        self.log(Level::Info.as_str(), message, vars);
    }

    fn debug(&self, message: &str, vars: Map) {
        self.log(Level::Debug.as_str(), message, vars);
    }
}

/// A logger discarding everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn post(&self, _: &str, _: Map) {}

    fn log(&self, _: &str, _: &str, _: Map) {}
}

impl fmt::Display for NullLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NullLogger")
    }
}
