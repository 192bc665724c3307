// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! jw-runner: executes one compiled job directory.
//!
//! Invoked by the engine as `jw-runner <job-dir>`. Loads the manifest and
//! snippet bodies, drives the DAG through the dispatcher, and exits with
//! the aggregate return code (0 pass, 3 error). Normal operation writes
//! nothing to stdout/stderr; the run's output is the job log.

use jw_core::{CompiledJob, RetCode};
use jw_runtime::{script_body, DataStore, JobHandler, JobTracer, Snippet};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code.exit_code() as u8),
        Err(message) => {
            eprintln!("jw-runner: {message}");
            ExitCode::from(RetCode::Error.exit_code() as u8)
        }
    }
}

fn run() -> Result<RetCode, String> {
    let mut args = std::env::args_os().skip(1);
    let job_dir = match (args.next(), args.next()) {
        (Some(dir), None) => PathBuf::from(dir),
        _ => return Err("usage: jw-runner <job-dir>".to_string()),
    };

    let manifest =
        CompiledJob::load(&job_dir).map_err(|e| format!("cannot load compiled job: {e}"))?;
    let tracer =
        Arc::new(JobTracer::open(&job_dir).map_err(|e| format!("cannot open job log: {e}"))?);
    let store = Arc::new(DataStore::new());
    let mut handler = JobHandler::new(manifest.globals.clone(), store);

    for compiled in &manifest.snippets {
        let body = std::fs::read_to_string(job_dir.join(&compiled.body))
            .map_err(|e| format!("cannot read body for snippet '{}': {e}", compiled.name))?;
        let snippet = Snippet::new(
            compiled.id,
            compiled.name.clone(),
            compiled.description.clone(),
            compiled.variables.clone(),
            handler.sender(),
            tracer.clone(),
        );
        handler.register(snippet, &compiled.when, script_body(body));
    }

    Ok(handler.run())
}
