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
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use crate::context::Context;
use crate::value::Map;
use crate::value::Value;

#[derive(Debug, Default)]
struct Entries(RwLock<Map>);

impl Entries {
    fn new(map: Map) -> Self {
        Self(RwLock::new(map))
    }

    fn read(&self) -> RwLockReadGuard<'_, Map> {
        self.0.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Map> {
        self.0.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// A context whose removed keys are gone.
///
/// # Examples
///
/// ```
/// use flogger::Context;
/// use flogger::Value;
/// use flogger::context::SimpleContext;
///
/// let context = SimpleContext::default();
/// context.put("request_id", Value::from("f00"));
/// assert_eq!(context.value("request_id"), Some(Value::from("f00")));
///
/// context.remove(&["request_id"]);
/// assert!(context.map().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct SimpleContext {
    entries: Entries,
}

impl SimpleContext {
    pub fn new(map: Map) -> Self {
        Self {
            entries: Entries::new(map),
        }
    }
}

impl fmt::Display for SimpleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimpleContext (size={})", self.entries.read().len())
    }
}

impl Context for SimpleContext {
    fn map(&self) -> Map {
        self.entries.read().clone()
    }

    fn value(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    fn put(&self, key: &str, value: Value) {
        self.entries.write().insert(key, value);
    }

    fn remove(&self, keys: &[&str]) {
        let mut entries = self.entries.write();
        for key in keys {
            entries.remove(key);
        }
    }
}

/// A context starting from a set of defaults, where removing a key restores its default.
///
/// Keys without a default are deleted.
#[derive(Debug)]
pub struct RevertingContext {
    entries: Entries,
    defaults: Map,
}

impl RevertingContext {
    pub fn new(defaults: Map) -> Self {
        Self {
            entries: Entries::new(defaults.clone()),
            defaults,
        }
    }

    pub fn defaults(&self) -> &Map {
        &self.defaults
    }
}

impl fmt::Display for RevertingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RevertingContext (size={}, defaults={})",
            self.entries.read().len(),
            self.defaults.len()
        )
    }
}

impl Context for RevertingContext {
    fn map(&self) -> Map {
        self.entries.read().clone()
    }

    fn value(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    fn put(&self, key: &str, value: Value) {
        self.entries.write().insert(key, value);
    }

    fn remove(&self, keys: &[&str]) {
        let mut entries = self.entries.write();
        for key in keys {
            if !entries.contains_key(key) {
                continue;
            }
            match self.defaults.get(key) {
                Some(default) => {
                    entries.insert(*key, default.clone());
                }
                None => {
                    entries.remove(key);
                }
            }
        }
    }
}
