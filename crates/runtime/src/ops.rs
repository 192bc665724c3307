// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The snippet body language: one operation per line.
//!
//! ```text
//! # comments and blank lines are skipped
//! log deploying to ${{globals.env.name}}
//! set attempt 1
//! capture ${{variables.payload}} status=(?P<status>\w+)
//! expect ${{cache.status}} ok
//! sleep 2
//! emit ready
//! fail giving up
//! ```
//!
//! Operation arguments pass through the access-time substitution pipeline
//! before execution. Execution stops at the first failing operation; the
//! wrapper turns the result into `done` or `error` and always writes the
//! ending line.

use crate::handler::{BodyFn, RunContext};
use jw_core::subst::{
    lookup_in, stringify, substitute, CACHE_PATTERN, GLOBALS_PATTERN, VARIABLES_PATTERN,
};
use regex::RegexBuilder;
use serde_json::Value;
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The explicit failure signal (`fail <message>`, failed `expect`).
    #[error("{0}")]
    Failure(String),
    /// A malformed or failing operation.
    #[error("line {line}: {message}")]
    Op { line: usize, message: String },
}

/// How a single operation went wrong.
enum OpFault {
    /// Raise the failure signal with this message.
    Failure(String),
    /// The operation itself is invalid.
    Invalid(String),
}

/// Wrap a body source into the begin/run/done-or-error/ending bookkeeping.
pub fn script_body(source: String) -> BodyFn {
    Box::new(move |ctx| {
        let started = Instant::now();
        ctx.snippet.begin();
        match run_ops(&source, ctx) {
            Ok(()) => ctx.snippet.done(),
            Err(BodyError::Failure(message)) => ctx.snippet.error(&message),
            Err(other) => ctx.snippet.error(&other.to_string()),
        }
        ctx.snippet.ending(started.elapsed().as_secs_f64());
    })
}

fn run_ops(source: &str, ctx: &RunContext) -> Result<(), BodyError> {
    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (op, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        run_op(ctx, op, rest.trim()).map_err(|fault| match fault {
            OpFault::Failure(message) => BodyError::Failure(message),
            OpFault::Invalid(message) => BodyError::Op { line: index + 1, message },
        })?;
    }
    Ok(())
}

fn run_op(ctx: &RunContext, op: &str, rest: &str) -> Result<(), OpFault> {
    match op {
        "log" => {
            ctx.snippet.log(&expand_text(ctx, rest));
            Ok(())
        }
        "sleep" => {
            let arg = expand_text(ctx, rest);
            let secs: f64 = arg
                .parse()
                .map_err(|_| OpFault::Invalid(format!("invalid sleep duration '{arg}'")))?;
            ctx.snippet.log(&format!("sleeping for {arg} sec"));
            std::thread::sleep(std::time::Duration::from_secs_f64(secs.max(0.0)));
            Ok(())
        }
        "emit" => {
            ctx.snippet.emit(&expand_text(ctx, rest));
            Ok(())
        }
        "fail" => Err(OpFault::Failure(expand_text(ctx, rest))),
        "set" => {
            let (key, value) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| OpFault::Invalid("set needs a key and a value".to_string()))?;
            ctx.store.set(key, expand_value(ctx, value.trim()));
            Ok(())
        }
        "capture" => {
            let (data_ref, pattern) = rest.split_once(char::is_whitespace).ok_or_else(|| {
                OpFault::Invalid("capture needs a value and a pattern".to_string())
            })?;
            let data = expand_text(ctx, data_ref);
            ctx.store
                .capture(&data, pattern.trim())
                .map_err(|e| OpFault::Invalid(format!("invalid capture pattern: {e}")))
        }
        "expect" => {
            let (data_ref, pattern) = rest.split_once(char::is_whitespace).ok_or_else(|| {
                OpFault::Invalid("expect needs a value and a pattern".to_string())
            })?;
            let data = expand_text(ctx, data_ref);
            let pattern = pattern.trim();
            let re = RegexBuilder::new(pattern)
                .dot_matches_new_line(true)
                .build()
                .map_err(|e| OpFault::Invalid(format!("invalid expect pattern: {e}")))?;
            // Anchored at the start, a prefix match.
            if re.find(&data).is_some_and(|m| m.start() == 0) {
                Ok(())
            } else {
                Err(OpFault::Failure(format!("pattern '{pattern}' not matched on '{data}'")))
            }
        }
        other => Err(OpFault::Invalid(format!("unknown operation '{other}'"))),
    }
}

/// Resolve `${{…}}` references in an argument, keeping the value's type
/// when the argument is exactly one reference.
fn expand_value(ctx: &RunContext, text: &str) -> Value {
    let vars = &ctx.snippet.variables;
    let mut value = substitute(text, &VARIABLES_PATTERN, |key| {
        ctx.store.variable(vars, key, &ctx.globals)
    });
    if let Value::String(s) = &value {
        value = substitute(s, &GLOBALS_PATTERN, lookup_in(&ctx.globals));
    }
    if let Value::String(s) = &value {
        value = substitute(s, &CACHE_PATTERN, |key| ctx.store.get(key).unwrap_or(Value::Null));
    }
    value
}

fn expand_text(ctx: &RunContext, text: &str) -> String {
    stringify(&expand_value(ctx, text))
}

#[cfg(test)]
#[path = "ops_tests.rs"]
mod tests;
