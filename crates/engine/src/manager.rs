// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job registry and control-plane entry point.
//!
//! Scheduling composes the stores, the compiler, and the event queue:
//! init the execution directory, compile the document (rolling the
//! directory back on failure), compute the deadline, persist the backup
//! for recurring modes, and register the fire callback. The job list is
//! mutated from control-plane calls and from the queue worker (recurring
//! re-schedules); one lock serializes every path.

use crate::job::Job;
use crate::queue::{EventCallback, EventQueue};
use chrono::Local;
use jw_core::{
    Clock, EngineError, JobId, JobSource, JobState, JobStatus, SchedAt, SchedMode, SystemClock,
    UserRef,
};
use jw_runbook::Compiler;
use jw_storage::{BackupStore, ExecutionStore};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a schedule call needs.
pub struct ScheduleRequest {
    pub user: UserRef,
    pub source: JobSource,
    pub workspace: String,
    pub sched_mode: SchedMode,
    pub sched_at: SchedAt,
    /// Verbatim deadline override (backup reload); computed from the mode
    /// when absent.
    pub sched_timestamp: Option<f64>,
}

pub struct JobsManager<C: Clock = SystemClock> {
    jobs: Mutex<Vec<Arc<Job>>>,
    queue: Arc<EventQueue<C>>,
    store: Arc<ExecutionStore>,
    backups: Arc<BackupStore>,
    compiler: Compiler,
    runner_bin: PathBuf,
}

impl<C: Clock + 'static> JobsManager<C> {
    pub fn new(
        queue: Arc<EventQueue<C>>,
        store: Arc<ExecutionStore>,
        backups: Arc<BackupStore>,
        compiler: Compiler,
        runner_bin: impl Into<PathBuf>,
    ) -> Arc<Self> {
        Arc::new(Self {
            jobs: Mutex::new(Vec::new()),
            queue,
            store,
            backups,
            compiler,
            runner_bin: runner_bin.into(),
        })
    }

    pub fn get_job(&self, job_id: &str) -> Option<Arc<Job>> {
        self.jobs.lock().iter().find(|j| j.id == job_id).cloned()
    }

    /// Jobs of a workspace still WAITING or RUNNING.
    pub fn list(&self, workspace: &str) -> Vec<JobStatus> {
        self.jobs
            .lock()
            .iter()
            .filter(|j| {
                j.workspace == workspace
                    && matches!(j.state(), JobState::Waiting | JobState::Running)
            })
            .map(|j| j.status())
            .collect()
    }

    /// Schedule a job; returns its id.
    pub fn schedule(self: &Arc<Self>, request: ScheduleRequest) -> Result<JobId, EngineError> {
        let job = Arc::new(Job::new(
            request.source,
            request.workspace,
            request.sched_mode,
            request.sched_at,
            request.user,
        ));
        tracing::debug!(job_id = %job.id, mode = %job.sched_mode, "schedule job");

        self.store
            .init(job.id.as_str())
            .map_err(|e| EngineError::internal(e.to_string()))?;

        let job_dir = self.store.path(job.id.as_str());
        if let Err(e) = self.compiler.compile(&job.source, &job.workspace, &job.id, &job_dir) {
            // No execution directory leaks out of a failed compile.
            self.store.reset(job.id.as_str());
            return Err(EngineError::new(e.kind(), e.to_string()));
        }

        match request.sched_timestamp {
            Some(timestamp) if timestamp > 0.0 => job.set_sched_timestamp(timestamp),
            _ => {
                if let Err(e) = job.init_start_time(Local::now()) {
                    self.store.reset(job.id.as_str());
                    return Err(EngineError::failed(e.to_string()));
                }
            }
        }
        self.store
            .write_status(&job.status())
            .map_err(|e| EngineError::internal(e.to_string()))?;

        if job.is_recurring() {
            self.backups
                .save(&job.backup())
                .map_err(|e| EngineError::internal(e.to_string()))?;
        }

        tracing::info!(job_id = %job.id, deadline = job.sched_timestamp(), "adding job in scheduler");
        let handle = self.queue.add(
            job.id.to_string(),
            job.sched_timestamp(),
            self.fire_callback(job.clone()),
        );
        job.set_event(handle);
        self.jobs.lock().push(job.clone());

        Ok(job.id.clone())
    }

    fn fire_callback(self: &Arc<Self>, job: Arc<Job>) -> EventCallback {
        let manager = Arc::clone(self);
        Box::new(move || {
            Box::pin(async move {
                manager.execute(job).await;
                Ok(())
            })
        })
    }

    /// The fire path, invoked by the queue worker.
    pub async fn execute(self: &Arc<Self>, job: Arc<Job>) {
        tracing::info!(job_id = %job.id, "starting job");
        job.take_event();

        // Recurrence first: drop the fired backup and register the next
        // occurrence as an independent job sharing source and parameters.
        if job.is_recurring() {
            self.backups.remove(job.id.as_str());
            let next = ScheduleRequest {
                user: job.user.clone(),
                source: job.source.clone(),
                workspace: job.workspace.clone(),
                sched_mode: job.sched_mode,
                sched_at: job.sched_at,
                sched_timestamp: Some(job.next_start_time()),
            };
            if let Err(e) = self.schedule(next) {
                tracing::error!(job_id = %job.id, error = %e, "re-schedule of recurring job failed");
            }
        }

        job.run_once(&self.store, &self.runner_bin).await;
    }

    /// Kill (RUNNING) or cancel (WAITING) a job. Admins may delete any
    /// job; other users only their own.
    pub fn delete(&self, job_id: &str, user: &UserRef) -> Result<(), EngineError> {
        tracing::info!(job_id, "delete job");
        let job = self
            .get_job(job_id)
            .ok_or_else(|| EngineError::not_found("job does not exist"))?;

        if !user.is_admin() && job.user.login != user.login {
            return Err(EngineError::forbidden("access denied"));
        }

        match job.state() {
            JobState::Running => {
                tracing::info!(job_id, "killing job");
                if let Err(e) = job.kill() {
                    tracing::error!(job_id, error = %e, "kill failed");
                }
            }
            JobState::Waiting => {
                tracing::info!(job_id, "cancelling job");
                job.cancel(&self.store, &self.backups);
                if let Some(handle) = job.take_event() {
                    self.queue.remove(handle);
                }
                self.jobs.lock().retain(|j| j.id != job.id);
            }
            JobState::Success | JobState::Failure => {}
        }
        Ok(())
    }

    /// Re-schedule every backed-up recurring job (daemon boot), using the
    /// stored deadline verbatim. Stale backup files are dropped; the
    /// schedule path writes fresh ones.
    pub fn reload_from_backups(self: &Arc<Self>) -> Result<(), EngineError> {
        tracing::info!("reloading jobs");
        let backups = self
            .backups
            .load_all()
            .map_err(|e| EngineError::internal(e.to_string()))?;

        for backup in backups {
            let old_id = backup.status.id.clone();
            let Some(source) = backup.source() else {
                tracing::error!(job_id = %old_id, "backup has no job source, skipping");
                self.backups.remove(old_id.as_str());
                continue;
            };
            let request = ScheduleRequest {
                user: backup.status.user,
                source,
                workspace: backup.status.workspace,
                sched_mode: backup.status.sched_mode,
                sched_at: backup.status.sched_at,
                sched_timestamp: Some(backup.status.sched_timestamp),
            };
            if let Err(e) = self.schedule(request) {
                tracing::error!(job_id = %old_id, error = %e, "backup re-schedule failed");
            }
            self.backups.remove(old_id.as_str());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
