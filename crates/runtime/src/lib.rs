// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jw-runtime: the snippet runtime linked into the runner process.
//!
//! Four co-resident pieces drive one job run: the [`JobHandler`] dispatcher
//! loop, the [`Snippet`] DAG nodes, the process-wide [`DataStore`] cache,
//! and the [`JobTracer`] log sink. Snippet bodies are programs in a small
//! line-oriented operation language interpreted by [`ops`].

pub mod datastore;
pub mod handler;
pub mod ops;
pub mod snippet;
pub mod tracer;

pub use datastore::DataStore;
pub use handler::{BodyFn, JobHandler, RunContext};
pub use ops::{script_body, BodyError};
pub use snippet::{EventKind, Snippet, SnippetEvent, MSG_DONE, MSG_FAILURE};
pub use tracer::JobTracer;
