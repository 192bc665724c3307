// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One scheduled job: timing, the runner child process, kill and cancel.

use crate::queue::EventHandle;
use chrono::{DateTime, Local};
use jw_core::{
    sched, EngineError, JobBackup, JobId, JobSource, JobState, JobStatus, SchedAt, SchedError,
    SchedMode, UserRef,
};
use jw_runtime::JobTracer;
use jw_storage::{BackupStore, ExecutionStore};
use parking_lot::Mutex;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

/// A job instance, WAITING until its queue event fires.
///
/// Shared between the control plane and the fire callback; every mutable
/// field sits behind its own lock.
pub struct Job {
    pub id: JobId,
    pub source: JobSource,
    pub name: String,
    pub workspace: String,
    pub user: UserRef,
    pub sched_mode: SchedMode,
    pub sched_at: SchedAt,
    state: Mutex<JobState>,
    duration: Mutex<f64>,
    sched_timestamp: Mutex<f64>,
    sched_event: Mutex<Option<EventHandle>>,
    process_id: Mutex<Option<u32>>,
}

impl Job {
    pub fn new(
        source: JobSource,
        workspace: impl Into<String>,
        sched_mode: SchedMode,
        sched_at: SchedAt,
        user: UserRef,
    ) -> Self {
        let id = JobId::new();
        let name = match source.file() {
            Some(file) => file.to_string(),
            None => format!("Job #{id}"),
        };
        Self {
            id,
            source,
            name,
            workspace: workspace.into(),
            user,
            sched_mode,
            sched_at,
            state: Mutex::new(JobState::Waiting),
            duration: Mutex::new(0.0),
            sched_timestamp: Mutex::new(0.0),
            sched_event: Mutex::new(None),
            process_id: Mutex::new(None),
        }
    }

    pub fn state(&self) -> JobState {
        *self.state.lock()
    }

    pub fn sched_timestamp(&self) -> f64 {
        *self.sched_timestamp.lock()
    }

    pub fn set_sched_timestamp(&self, timestamp: f64) {
        *self.sched_timestamp.lock() = timestamp;
    }

    pub fn set_event(&self, handle: EventHandle) {
        *self.sched_event.lock() = Some(handle);
    }

    pub fn take_event(&self) -> Option<EventHandle> {
        self.sched_event.lock().take()
    }

    pub fn is_recurring(&self) -> bool {
        self.sched_mode.is_recurring()
    }

    /// The status document view of this job.
    pub fn status(&self) -> JobStatus {
        JobStatus {
            id: self.id.clone(),
            state: self.state(),
            name: self.name.clone(),
            duration: *self.duration.lock(),
            sched_mode: self.sched_mode,
            sched_at: self.sched_at,
            sched_timestamp: self.sched_timestamp(),
            user: self.user.clone(),
            workspace: self.workspace.clone(),
        }
    }

    /// The backup document for recurring recovery.
    pub fn backup(&self) -> JobBackup {
        JobBackup {
            status: self.status(),
            file: self.source.file().map(str::to_string),
            descr: self.source.inline().map(str::to_string),
        }
    }

    /// Update the state and persist the status document.
    pub fn set_state(&self, state: JobState, store: &ExecutionStore) {
        tracing::debug!(job_id = %self.id, %state, "job state update");
        *self.state.lock() = state;
        if let Err(e) = store.write_status(&self.status()) {
            tracing::error!(job_id = %self.id, error = %e, "status update failed");
        }
    }

    /// Compute and record the first deadline from the schedule request.
    pub fn init_start_time(&self, now: DateTime<Local>) -> Result<(), SchedError> {
        let deadline = sched::initial_deadline(self.sched_mode, self.sched_at, now)?;
        self.set_sched_timestamp(deadline);
        Ok(())
    }

    /// Deadline of the next occurrence (current deadline plus the stride).
    pub fn next_start_time(&self) -> f64 {
        self.sched_timestamp() + sched::stride_secs(self.sched_mode, self.sched_at)
    }

    /// Send the terminate-now signal to the child process.
    pub fn kill(&self) -> Result<(), EngineError> {
        tracing::debug!(job_id = %self.id, "kill the job");
        let pid = (*self.process_id.lock())
            .ok_or_else(|| EngineError::not_found("job has no running process"))?;
        nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(pid as i32),
            nix::sys::signal::Signal::SIGKILL,
        )
        .map_err(|e| EngineError::internal(format!("unable to kill: {e}")))
    }

    /// Cancel a waiting job: drop its execution directory and backup.
    pub fn cancel(&self, store: &ExecutionStore, backups: &BackupStore) {
        tracing::debug!(job_id = %self.id, "cancel the job");
        store.reset(self.id.as_str());
        if self.is_recurring() {
            backups.remove(self.id.as_str());
        }
    }

    /// The fire path: RUNNING, fork the runner over the execution
    /// directory, wait, record stderr and duration, land in a terminal
    /// state. Recurrence bookkeeping happens in the manager before this.
    pub async fn run_once(&self, store: &ExecutionStore, runner: &Path) {
        let started = Instant::now();
        self.set_state(JobState::Running, store);

        let job_dir = store.path(self.id.as_str());
        let tracer = match JobTracer::open(&job_dir) {
            Ok(tracer) => tracer,
            Err(e) => {
                tracing::error!(job_id = %self.id, error = %e, "unable to open job log");
                self.set_state(JobState::Failure, store);
                return;
            }
        };
        tracer.log_job_started();

        let spawned = tokio::process::Command::new(runner)
            .arg(&job_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let child = match spawned {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(job_id = %self.id, error = %e, "unable to run job");
                tracer.log_job_error(&format!("unable to run job: {e}"));
                self.set_state(JobState::Failure, store);
                tracer.log_job_stopped(JobState::Failure, started.elapsed().as_secs_f64());
                return;
            }
        };
        *self.process_id.lock() = child.id();

        let result = match child.wait_with_output().await {
            Ok(output) => {
                let code = output.status.code().unwrap_or(-1);
                // Stray child output lands in the job log: stdout as
                // job-log lines, stderr as one job-error line.
                let stdout = String::from_utf8_lossy(&output.stdout);
                for line in stdout.lines() {
                    tracer.log_job_info(line);
                }
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.is_empty() {
                    tracer.log_job_error(stderr.trim_end());
                }
                JobState::from_exit(code)
            }
            Err(e) => {
                tracing::error!(job_id = %self.id, error = %e, "wait on job process failed");
                tracer.log_job_error(&format!("wait on job process failed: {e}"));
                JobState::Failure
            }
        };
        *self.process_id.lock() = None;

        let duration = started.elapsed().as_secs_f64();
        *self.duration.lock() = duration;
        self.set_state(result, store);
        tracer.log_job_stopped(result, duration);
        tracing::info!(job_id = %self.id, state = %result, "job terminated");
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
