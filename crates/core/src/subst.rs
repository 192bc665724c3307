// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `${{namespace.key.path}}` reference substitution.
//!
//! Three namespaces share one grammar: `variables` is resolved at compile
//! time against the job document, `globals` and `cache` at access time
//! inside the runner. A value that *is* exactly one reference keeps the
//! referenced value's type; a value that merely *contains* references gets
//! them stringified and spliced in place.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

// Allow expect here as the regex patterns are compile-time verified to be valid
#[allow(clippy::expect_used)]
pub static VARIABLES_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\{variables\.([\w-]+(?:\.[\w-]+)*)\}\}")
        .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
pub static GLOBALS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\{globals\.([\w-]+(?:\.[\w-]+)*)\}\}")
        .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
pub static CACHE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\{cache\.([\w-]+(?:\.[\w-]+)*)\}\}")
        .expect("constant regex pattern is valid")
});

/// Substitute every reference of one namespace inside `input`.
///
/// `resolve` maps the first key of a dotted path to a value; the remaining
/// keys drill into nested mappings. Missing keys resolve to null; drilling
/// stops at the first non-mapping value, which then passes through as-is.
pub fn substitute(input: &str, pattern: &Regex, resolve: impl Fn(&str) -> Value) -> Value {
    if let Some(m) = pattern.find(input) {
        // The whole string is a single reference: keep the value's type.
        if m.start() == 0 && m.end() == input.len() {
            if let Some(caps) = pattern.captures(input) {
                if let Some(path) = caps.get(1) {
                    return resolve_path(&resolve, path.as_str());
                }
            }
        }
    }

    let mut out = input.to_string();
    for caps in pattern.captures_iter(input) {
        let (Some(occurrence), Some(path)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = resolve_path(&resolve, path.as_str());
        out = out.replacen(occurrence.as_str(), &stringify(&value), 1);
    }
    Value::String(out)
}

/// Render a value for splicing into surrounding text.
///
/// Strings stay bare; everything else renders as JSON (`null`, numbers,
/// composites).
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A resolver that reads first keys out of a mapping value.
pub fn lookup_in(map: &Value) -> impl Fn(&str) -> Value + '_ {
    move |key| map.get(key).cloned().unwrap_or(Value::Null)
}

fn resolve_path(resolve: &impl Fn(&str) -> Value, path: &str) -> Value {
    let mut keys = path.split('.');
    let Some(first) = keys.next() else {
        return Value::Null;
    };
    let mut current = resolve(first);
    for key in keys {
        if let Value::Object(map) = &current {
            current = map.get(key).cloned().unwrap_or(Value::Null);
        }
    }
    current
}

#[cfg(test)]
#[path = "subst_tests.rs"]
mod tests;
