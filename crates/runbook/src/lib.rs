// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jw-runbook: YAML job documents and the job compiler.
//!
//! A job document describes either a single inline snippet or an ordered
//! DAG of snippets. [`compile::Compiler`] turns a document into the
//! execution-directory artifacts the runner consumes: a `job.json` manifest
//! and one body file per snippet.

pub mod compile;
pub mod doc;
pub mod globals;

pub use compile::{CompileError, Compiler};
pub use doc::{DagJob, DocError, InlineJob, JobDoc, SnippetDecl};
pub use globals::{GlobalsError, GlobalsStore};
