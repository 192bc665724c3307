// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-run log sink: `<job-dir>/job.log`.
//!
//! Lines follow the grammar `HH:MM:SS.mmmm <ref> <kind> <payload>` where
//! `mmmm` is a 4-digit fraction of the current second (100µs units) and
//! `ref` is `0` for job-level lines or the snippet id otherwise.

use chrono::Local;
use jw_core::JobState;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const LOG_FILE: &str = "job.log";

pub struct JobTracer {
    path: PathBuf,
    file: Mutex<File>,
}

impl JobTracer {
    /// Open (append mode) the job log inside an execution directory.
    pub fn open(job_dir: &Path) -> std::io::Result<Self> {
        let path = job_dir.join(LOG_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file: Mutex::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        let now = Local::now();
        let frac = now.timestamp_subsec_micros() / 100;
        format!("{}.{:04}", now.format("%H:%M:%S"), frac)
    }

    fn trace(&self, value: &str) {
        let line = format!("{} {}\n", Self::timestamp(), value);
        let mut file = self.file.lock();
        if let Err(e) = file.write_all(line.as_bytes()) {
            tracing::warn!(error = %e, "failed to write job log");
        }
    }

    pub fn log_job_started(&self) {
        self.trace("0 job-started");
    }

    pub fn log_job_stopped(&self, result: JobState, duration: f64) {
        self.trace(&format!("0 job-stopped {result} {duration:.3}"));
        let _ = self.file.lock().flush();
    }

    pub fn log_job_error(&self, message: &str) {
        self.trace(&format!("0 job-error {message}"));
    }

    pub fn log_job_info(&self, message: &str) {
        self.trace(&format!("0 job-log {message}"));
    }

    pub fn log_snippet_started(&self, ref_id: u32, description: &str) {
        self.trace(&format!("{ref_id} snippet-begin {description}"));
    }

    pub fn log_snippet_stopped(&self, ref_id: u32, result: JobState, duration: f64) {
        self.trace(&format!("{ref_id} snippet-ending {result} {duration:.3}"));
    }

    pub fn log_snippet_error(&self, ref_id: u32, message: &str) {
        self.trace(&format!("{ref_id} snippet-error {message}"));
    }

    pub fn log_snippet_info(&self, ref_id: u32, message: &str) {
        self.trace(&format!("{ref_id} snippet-log {message}"));
    }
}

#[cfg(test)]
#[path = "tracer_tests.rs"]
mod tests;
