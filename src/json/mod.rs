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

//! A JSON encoder that never fails.
//!
//! [`encode`] tries three stages in turn:
//!
//! 1. encode the value as is;
//! 2. sanitize the value (non-finite floats, malformed text, opaque objects and handles, errors,
//!    excessive nesting) and encode the result;
//! 3. encode a document whose only key is [`JSON_ENCODE_ERROR`], holding the dump of the error
//!    raised by the second stage.
//!
//! ```
//! use flogger::Value;
//! use flogger::json;
//!
//! let value = Value::Seq(vec![Value::Float(f64::INFINITY), Value::bytes(b"\xCE".to_vec())]);
//! assert_eq!(
//!     json::encode(&value, &json::EncodeOptions::default()),
//!     r#"["INF","*** MALFORMED UTF-8 ***"]"#
//! );
//! ```

mod sanitize;
mod strict;

use serde::Deserialize;
use serde::Serialize;
use serde_json::ser::CompactFormatter;
use serde_json::ser::Formatter;
use serde_json::ser::PrettyFormatter;

use crate::value::Map;
use crate::value::Value;

/// The default maximum nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Replacement for text that is not valid UTF-8.
pub const MALFORMED_UTF8: &str = "*** MALFORMED UTF-8 ***";

/// Key of the document produced when even the sanitized value cannot be encoded.
pub const JSON_ENCODE_ERROR: &str = "*** JSON ENCODE ERROR ***";

const LAST_RESORT: &str = r#"{"*** JSON ENCODE ERROR ***":null}"#;

/// Replacement for collections nested deeper than `max_depth`.
pub fn max_depth_reached(max_depth: usize) -> String {
    format!("*** MAX STACK DEPTH REACHED ({max_depth}) ***")
}

/// Output flags of the encoder. All flags are off by default.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct EncodeFlags {
    /// Indent with four spaces.
    pub pretty_print: bool,
    /// Escape `/` as `\/`.
    pub escape_slashes: bool,
    /// Escape every non-ASCII character as `\uXXXX`.
    pub escape_unicode: bool,
    /// Encode numeric strings as numbers.
    pub numeric_check: bool,
}

/// Options of [`encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    #[serde(flatten)]
    pub flags: EncodeFlags,
    max_depth: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            flags: EncodeFlags::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EncodeOptions {
    /// Set the maximum nesting depth. Values below 1 are treated as 1.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_pretty_print(mut self, yes: bool) -> Self {
        self.flags.pretty_print = yes;
        self
    }

    pub fn with_escape_slashes(mut self, yes: bool) -> Self {
        self.flags.escape_slashes = yes;
        self
    }

    pub fn with_escape_unicode(mut self, yes: bool) -> Self {
        self.flags.escape_unicode = yes;
        self
    }

    pub fn with_numeric_check(mut self, yes: bool) -> Self {
        self.flags.numeric_check = yes;
        self
    }

    /// The effective maximum nesting depth, at least 1.
    pub fn max_depth(&self) -> usize {
        self.max_depth.max(1)
    }
}

/// Encode `value` as JSON. The result is always a valid JSON document.
pub fn encode(value: &Value, options: &EncodeOptions) -> String {
    if let Ok(out) = encode_strict(value, options) {
        return out;
    }

    let max_depth = options.max_depth();
    let sanitized = sanitize::sanitize(value, max_depth, 0);
    let err = match encode_strict(&sanitized, options) {
        Ok(out) => return out,
        Err(err) => err,
    };

    let options = options.with_max_depth(DEFAULT_MAX_DEPTH);
    let mut doc = Map::new();
    doc.insert(JSON_ENCODE_ERROR, Value::fault(err));
    let doc = sanitize::sanitize(&Value::Map(doc), DEFAULT_MAX_DEPTH, 0);
    encode_strict(&doc, &options).unwrap_or_else(|_| LAST_RESORT.to_string())
}

/// Encode `value` with the default options.
pub fn to_string(value: &Value) -> String {
    encode(value, &EncodeOptions::default())
}

fn encode_strict(value: &Value, options: &EncodeOptions) -> Result<String, serde_json::Error> {
    let strict = strict::Strict {
        value,
        level: 0,
        options,
    };

    let buf = if options.flags.pretty_print {
        write_with(&strict, PrettyFormatter::with_indent(b"    "))?
    } else {
        write_with(&strict, CompactFormatter)?
    };

    let out = String::from_utf8(buf).map_err(<serde_json::Error as serde::ser::Error>::custom)?;
    Ok(escape(out, &options.flags))
}

fn write_with<F: Formatter>(value: &impl Serialize, formatter: F) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(128);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

// '/' and non-ASCII characters only ever occur inside JSON strings.
fn escape(out: String, flags: &EncodeFlags) -> String {
    if !flags.escape_slashes && !flags.escape_unicode {
        return out;
    }

    let mut buf = String::with_capacity(out.len());
    for c in out.chars() {
        match c {
            '/' if flags.escape_slashes => buf.push_str("\\/"),
            c if flags.escape_unicode && !c.is_ascii() => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    buf.push_str(&format!("\\u{unit:04x}"));
                }
            }
            c => buf.push(c),
        }
    }
    buf
}
