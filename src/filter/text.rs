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

use std::borrow::Cow;

use crate::filter::Filter;
use crate::filter::decide;

/// A filter accepting exactly one tag, or every tag but one.
///
/// # Examples
///
/// ```
/// use flogger::Filter;
/// use flogger::filter::EqualsFilter;
///
/// let filter = EqualsFilter::new("debug").deny();
/// assert!(filter.accept("info"));
/// assert!(!filter.accept("debug"));
/// ```
#[derive(Debug, Clone)]
pub struct EqualsFilter {
    value: String,
    accept: bool,
}

impl EqualsFilter {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            accept: true,
        }
    }

    /// Reject the tag and accept every other tag.
    pub fn deny(mut self) -> Self {
        self.accept = false;
        self
    }
}

impl Filter for EqualsFilter {
    fn accept(&self, tag: &str) -> bool {
        decide(tag == self.value, self.accept)
    }
}

/// Shared state of the substring filters.
#[derive(Debug, Clone)]
struct Needle {
    needle: String,
    accept: bool,
    ignore_case: bool,
}

impl Needle {
    fn new(needle: String) -> Self {
        Self {
            needle,
            accept: true,
            ignore_case: false,
        }
    }

    fn ignore_case(&mut self) {
        self.ignore_case = true;
        self.needle = self.needle.to_lowercase();
    }

    fn haystack<'a>(&self, tag: &'a str) -> Cow<'a, str> {
        if self.ignore_case {
            Cow::Owned(tag.to_lowercase())
        } else {
            Cow::Borrowed(tag)
        }
    }
}

macro_rules! substring_filter {
    ($(#[$meta:meta])* $name:ident, $matches:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(Needle);

        impl $name {
            pub fn new(needle: impl Into<String>) -> Self {
                Self(Needle::new(needle.into()))
            }

            /// Reject matching tags and accept every other tag.
            pub fn deny(mut self) -> Self {
                self.0.accept = false;
                self
            }

            /// Compare tags without regard to case.
            pub fn ignore_case(mut self) -> Self {
                self.0.ignore_case();
                self
            }
        }

        impl Filter for $name {
            fn accept(&self, tag: &str) -> bool {
                let matches: fn(&str, &str) -> bool = $matches;
                let haystack = self.0.haystack(tag);
                decide(matches(&haystack, &self.0.needle), self.0.accept)
            }
        }
    };
}

substring_filter!(
    /// A filter matching tags by prefix, such as every tag of a subsystem.
    ///
    /// # Examples
    ///
    /// ```
    /// use flogger::Filter;
    /// use flogger::filter::StartsWithFilter;
    ///
    /// let filter = StartsWithFilter::new("db.").ignore_case();
    /// assert!(filter.accept("DB.query"));
    /// assert!(!filter.accept("http.request"));
    /// ```
    StartsWithFilter,
    |haystack, needle| haystack.starts_with(needle)
);

substring_filter!(
    /// A filter matching tags by suffix.
    EndsWithFilter,
    |haystack, needle| haystack.ends_with(needle)
);

substring_filter!(
    /// A filter matching tags containing a substring.
    ContainsFilter,
    |haystack, needle| haystack.contains(needle)
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equals_filter() {
        let filter = EqualsFilter::new("info");
        assert!(filter.accept("info"));
        assert!(!filter.accept("INFO"));
        assert!(!filter.accept("info.more"));

        let filter = EqualsFilter::new("info").deny();
        assert!(!filter.accept("info"));
        assert!(filter.accept("debug"));
    }

    #[test]
    fn test_starts_with_filter() {
        let filter = StartsWithFilter::new("app.");
        assert!(filter.accept("app.info"));
        assert!(!filter.accept("APP.info"));
        assert!(!filter.accept("ap"));

        let filter = StartsWithFilter::new("App.").ignore_case();
        assert!(filter.accept("APP.info"));
        assert!(filter.accept("app.info"));

        let filter = StartsWithFilter::new("app.").deny();
        assert!(!filter.accept("app.info"));
        assert!(filter.accept("db.info"));
    }

    #[test]
    fn test_ends_with_and_contains_filters() {
        let filter = EndsWithFilter::new(".error");
        assert!(filter.accept("db.error"));
        assert!(!filter.accept("db.error.retry"));

        let filter = EndsWithFilter::new(".ERROR").ignore_case().deny();
        assert!(!filter.accept("db.error"));
        assert!(filter.accept("db.info"));

        let filter = ContainsFilter::new("sql");
        assert!(filter.accept("db.sql.slow"));
        assert!(!filter.accept("db.SQL.slow"));
        assert!(ContainsFilter::new("sql").ignore_case().accept("db.SQL.slow"));
    }

    #[test]
    fn test_empty_needle_matches_everything() {
        assert!(StartsWithFilter::new("").accept("anything"));
        assert!(!ContainsFilter::new("").deny().accept("anything"));
    }
}
