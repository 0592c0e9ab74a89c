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

use serde::Serialize;
use serde::Serializer;
use serde::ser::Error as _;
use serde::ser::SerializeMap;
use serde::ser::SerializeSeq;

use crate::json::EncodeOptions;
use crate::value::Value;

/// Serializes a [`Value`] as is, failing on anything JSON cannot represent.
pub(super) struct Strict<'a> {
    pub(super) value: &'a Value,
    pub(super) level: usize,
    pub(super) options: &'a EncodeOptions,
}

impl<'a> Strict<'a> {
    fn nested(&self, value: &'a Value, level: usize) -> Strict<'a> {
        Strict {
            value,
            level,
            options: self.options,
        }
    }

    fn enter<E: serde::ser::Error>(&self) -> Result<usize, E> {
        let level = self.level + 1;
        if level > self.options.max_depth() {
            return Err(E::custom(format_args!(
                "Maximum stack depth exceeded ({})",
                self.options.max_depth()
            )));
        }
        Ok(level)
    }
}

impl Serialize for Strict<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.value {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(_) => Err(S::Error::custom("Inf and NaN cannot be JSON encoded")),
            Value::String(s) => serialize_str(s, self.options, serializer),
            Value::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) => serialize_str(s, self.options, serializer),
                Err(err) => Err(S::Error::custom(format_args!(
                    "Malformed UTF-8 characters, possibly incorrectly encoded: {err}"
                ))),
            },
            Value::Seq(items) => {
                let level = self.enter()?;
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&self.nested(item, level))?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let level = self.enter()?;
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries.iter() {
                    map.serialize_entry(k, &self.nested(v, level))?;
                }
                map.end()
            }
            Value::Describe(d) => {
                let mut described = d.describe();
                let mut hops = 1;
                while let Value::Describe(next) = &described {
                    hops += 1;
                    if hops > self.options.max_depth() {
                        return Err(S::Error::custom(
                            "Self-describing value never resolved to plain data",
                        ));
                    }
                    described = next.describe();
                }
                self.nested(&described, self.level).serialize(serializer)
            }
            Value::Fault(_) | Value::Object(_) | Value::Resource(_) => Err(S::Error::custom(
                format_args!("Type is not supported: {}", self.value.kind()),
            )),
        }
    }
}

fn serialize_str<S: Serializer>(
    s: &str,
    options: &EncodeOptions,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if options.flags.numeric_check {
        match numeric(s) {
            Some(Numeric::Int(i)) => return serializer.serialize_i64(i),
            Some(Numeric::Float(f)) => return serializer.serialize_f64(f),
            None => {}
        }
    }
    serializer.serialize_str(s)
}

enum Numeric {
    Int(i64),
    Float(f64),
}

fn numeric(s: &str) -> Option<Numeric> {
    let s = s.trim_matches([' ', '\t', '\n', '\r', '\x0b', '\x0c']);
    let plausible = s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !plausible || !s.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Numeric::Int(i));
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Numeric::Float)
}
