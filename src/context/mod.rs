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

//! Contexts hold the ambient key-values attached to every record of a channel.

use std::fmt;

use crate::value::Map;
use crate::value::Value;

mod store;
mod usage;

pub use self::store::RevertingContext;
pub use self::store::SimpleContext;
pub use self::usage::ElapsedTime;
pub use self::usage::MemoryPeakUsage;
pub use self::usage::format_bytes;

/// A mutable, shareable key-value store.
///
/// Channels read [`Context::map`] once per posted record; the returned map is a snapshot and is
/// not affected by later updates.
pub trait Context: fmt::Debug + Send + Sync + 'static {
    /// A snapshot of every entry.
    fn map(&self) -> Map;

    /// The value stored under `key`, if any.
    fn value(&self, key: &str) -> Option<Value>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: Value);

    /// Remove the entries named by `keys`. Missing keys are ignored.
    fn remove(&self, keys: &[&str]);
}
