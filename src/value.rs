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

//! The data model carried by payloads and contexts.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::fault::Fault;

/// An object that knows how to describe itself as a serializable [`Value`].
///
/// The description is computed lazily, when the value is finally encoded.
pub trait Describe: fmt::Debug + Send + Sync + 'static {
    /// Return the serializable form of this object.
    fn describe(&self) -> Value;
}

/// A loosely typed value, as found in record payloads and contexts.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The absence of a value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A float, possibly non-finite.
    Float(f64),
    /// A valid UTF-8 string.
    String(String),
    /// Text whose encoding has not been verified.
    Bytes(Vec<u8>),
    /// An ordered sequence of values.
    Seq(Vec<Value>),
    /// An ordered map of values.
    Map(Map),
    /// An error, serialized as its structured dump.
    Fault(Arc<Fault>),
    /// An object providing its own serializable form.
    Describe(Arc<dyn Describe>),
    /// An opaque object, known only by its type name.
    Object(Cow<'static, str>),
    /// An opaque OS handle, known only by its kind.
    Resource(Cow<'static, str>),
}

impl Value {
    /// Wrap an error so that it is serialized as a structured dump.
    #[track_caller]
    pub fn fault<E>(err: E) -> Value
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Value::Fault(Arc::new(Fault::new(err)))
    }

    /// Build an opaque object placeholder named after `T`.
    pub fn object<T: ?Sized>() -> Value {
        Value::Object(Cow::Borrowed(std::any::type_name::<T>()))
    }

    /// Build an opaque handle placeholder of the given kind, e.g. `"stream"`.
    pub fn resource(kind: impl Into<Cow<'static, str>>) -> Value {
        Value::Resource(kind.into())
    }

    /// Wrap a self-describing object.
    pub fn describe<D: Describe>(d: D) -> Value {
        Value::Describe(Arc::new(d))
    }

    /// Build a value from text of unverified encoding.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Value {
        Value::Bytes(bytes.into())
    }

    /// Return the name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Seq(_) => "seq",
            Value::Map(_) => "map",
            Value::Fault(_) => "fault",
            Value::Describe(_) => "describe",
            Value::Object(_) => "object",
            Value::Resource(_) => "resource",
        }
    }

    /// Return the string slice if this is a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Return the map if this is a [`Value::Map`].
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Fault(a), Value::Fault(b)) => Arc::ptr_eq(a, b),
            (Value::Describe(a), Value::Describe(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Resource(a), Value::Resource(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => Value::Int(v),
            Err(_) => Value::Float(v as f64),
        }
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::from(v as u64)
    }
}

impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Cow<'_, str>> for Value {
    fn from(v: Cow<'_, str>) -> Self {
        Value::String(v.into_owned())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Value::Map(v)
    }
}

impl From<Arc<Fault>> for Value {
    fn from(v: Arc<Fault>) -> Self {
        Value::Fault(v)
    }
}

impl From<Arc<dyn Describe>> for Value {
    fn from(v: Arc<dyn Describe>) -> Self {
        Value::Describe(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::Seq(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => Value::Map(o.into_iter().collect()),
        }
    }
}

/// An ordered map with unique keys.
///
/// Keys keep their insertion order. Inserting an existing key replaces its value in place.
#[derive(Clone, Default, PartialEq)]
pub struct Map {
    entries: Vec<(String, Value)>,
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous value of the key if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => Some(std::mem::replace(v, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove a key, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Map::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Map {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Map {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl IntoIterator for Map {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keeps_insertion_order_and_replaces_in_place() {
        let mut map = Map::from([("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(map.insert("b", 20), Some(Value::Int(2)));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(map.get("b"), Some(&Value::Int(20)));

        assert_eq!(map.remove("a"), Some(Value::Int(1)));
        assert_eq!(map.remove("a"), None);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(u64::MAX), Value::Float(u64::MAX as f64));
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(
            Value::from(vec![1, 2]),
            Value::Seq(vec![Value::Int(1), Value::Int(2)])
        );

        let json = serde_json::json!({"k": [1, 2.5, "s", null]});
        let value = Value::from(json);
        let map = value.as_map().unwrap();
        assert_eq!(
            map.get("k"),
            Some(&Value::Seq(vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::String("s".into()),
                Value::Null
            ]))
        );
    }

    #[test]
    fn test_object_placeholder_uses_type_name() {
        struct Opaque;
        match Value::object::<Opaque>() {
            Value::Object(name) => assert!(name.ends_with("Opaque")),
            other => panic!("unexpected value: {other:?}"),
        }
    }
}
