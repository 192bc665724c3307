// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process-wide run cache and variable resolution pipeline.

use jw_core::subst::{lookup_in, substitute, CACHE_PATTERN, GLOBALS_PATTERN};
use parking_lot::Mutex;
use regex::RegexBuilder;
use serde_json::Value;
use std::collections::HashMap;

/// Key/value cache shared by every snippet of a run.
///
/// `capture` merges the named groups of a regex match; string-valued
/// variable reads pass through [`DataStore::variable`], which resolves
/// `${{globals.…}}` and `${{cache.…}}` references at access time.
#[derive(Default)]
pub struct DataStore {
    cache: Mutex<HashMap<String, Value>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `pattern` over `data` (dot matches newlines) and merge every
    /// matched named group into the cache.
    pub fn capture(&self, data: &str, pattern: &str) -> Result<(), regex::Error> {
        let re = RegexBuilder::new(pattern).dot_matches_new_line(true).build()?;
        if let Some(caps) = re.captures(data) {
            let mut cache = self.cache.lock();
            for name in re.capture_names().flatten() {
                if let Some(m) = caps.name(name) {
                    cache.insert(name.to_string(), Value::String(m.as_str().to_string()));
                }
            }
        }
        Ok(())
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.cache.lock().insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.cache.lock().get(name).cloned()
    }

    pub fn delete(&self, name: &str) {
        self.cache.lock().remove(name);
    }

    pub fn all(&self) -> HashMap<String, Value> {
        self.cache.lock().clone()
    }

    pub fn reset(&self) {
        self.cache.lock().clear();
    }

    /// Read a snippet variable, resolving references at access time.
    ///
    /// Globals references resolve first, then cache references; a whole-
    /// reference string keeps the referenced value's type.
    pub fn variable(&self, vars: &Value, name: &str, globals: &Value) -> Value {
        let mut value = vars.get(name).cloned().unwrap_or(Value::Null);
        if let Value::String(text) = &value {
            value = substitute(text, &GLOBALS_PATTERN, lookup_in(globals));
        }
        if let Value::String(text) = &value {
            value = substitute(text, &CACHE_PATTERN, |key| {
                self.get(key).unwrap_or(Value::Null)
            });
        }
        value
    }
}

#[cfg(test)]
#[path = "datastore_tests.rs"]
mod tests;
