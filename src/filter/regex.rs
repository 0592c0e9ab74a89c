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

use regex::Regex;

use crate::Error;
use crate::filter::Filter;
use crate::filter::decide;

/// A filter matching tags against a regular expression.
///
/// The expression is unanchored; use `^` and `$` to match whole tags.
#[derive(Debug, Clone)]
pub struct RegexFilter {
    regex: Regex,
    accept: bool,
}

impl RegexFilter {
    /// Accept the tags matching `pattern`.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let regex = Regex::new(pattern).map_err(|err| {
            Error::configuration(format!("Invalid filter expression: \"{pattern}\""))
                .with_source(err)
        })?;
        Ok(Self {
            regex,
            accept: true,
        })
    }

    /// Reject the matching tags and accept every other tag.
    pub fn deny(mut self) -> Self {
        self.accept = false;
        self
    }
}

impl Filter for RegexFilter {
    fn accept(&self, tag: &str) -> bool {
        decide(self.regex.is_match(tag), self.accept)
    }
}
