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

//! Filters decide which tags a channel posts.

use std::fmt;

mod custom;
#[cfg(feature = "filter-regex")]
mod regex;
mod text;

pub use self::custom::CustomFilter;
#[cfg(feature = "filter-regex")]
pub use self::regex::RegexFilter;
pub use self::text::ContainsFilter;
pub use self::text::EndsWithFilter;
pub use self::text::EqualsFilter;
pub use self::text::StartsWithFilter;

/// A predicate over record tags.
pub trait Filter: fmt::Debug + Send + Sync + 'static {
    /// Whether a record tagged `tag` should be posted.
    fn accept(&self, tag: &str) -> bool;
}

impl<T: Filter> From<T> for Box<dyn Filter> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// A match outcome turned into a decision: accepting filters pass matches, denying filters pass
/// everything else.
fn decide(matched: bool, accept: bool) -> bool {
    matched == accept
}
