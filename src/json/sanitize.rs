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

use crate::json::MALFORMED_UTF8;
use crate::json::max_depth_reached;
use crate::value::Map;
use crate::value::Value;

/// Rebuild `value` so that the strict encoder accepts it.
///
/// `level` is the number of collections entered so far; the root call passes 0.
pub(super) fn sanitize(value: &Value, max_depth: usize, level: usize) -> Value {
    match value {
        Value::Null | Value::Bool(_) | Value::Int(_) | Value::String(_) => value.clone(),
        Value::Float(f) if f.is_finite() => value.clone(),
        Value::Float(f) if f.is_nan() => Value::from("NAN"),
        Value::Float(f) if f.is_sign_negative() => Value::from("-INF"),
        Value::Float(_) => Value::from("INF"),
        Value::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => Value::from(s),
            Err(_) => Value::from(MALFORMED_UTF8),
        },
        Value::Seq(items) => {
            let level = level + 1;
            if level > max_depth {
                return Value::String(max_depth_reached(max_depth));
            }
            Value::Seq(
                items
                    .iter()
                    .map(|item| sanitize(item, max_depth, level))
                    .collect(),
            )
        }
        Value::Map(entries) => {
            let level = level + 1;
            if level > max_depth {
                return Value::String(max_depth_reached(max_depth));
            }
            let map: Map = entries
                .iter()
                .map(|(k, v)| (k, sanitize(v, max_depth, level)))
                .collect();
            Value::Map(map)
        }
        Value::Fault(fault) => fault.dump().to_value(),
        // resolved by the strict encoder
        Value::Describe(_) => value.clone(),
        Value::Object(name) => Value::String(format!("object ({name})")),
        Value::Resource(kind) => Value::String(format!("resource ({kind})")),
    }
}
