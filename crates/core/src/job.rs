// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job states, ownership, and the persisted status/backup documents.

use crate::id::JobId;
use crate::sched::{SchedAt, SchedMode};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a job.
///
/// `WAITING --fire--> RUNNING --> SUCCESS | FAILURE`, with deletion escaping
/// from WAITING (cancel) or RUNNING (kill, which lands in FAILURE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Waiting,
    Running,
    Success,
    Failure,
}

impl JobState {
    /// Terminal state implied by a runner exit code.
    pub fn from_exit(code: i32) -> Self {
        if code == 0 {
            JobState::Success
        } else {
            JobState::Failure
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Success | JobState::Failure)
    }
}

crate::simple_display! {
    JobState {
        Waiting => "WAITING",
        Running => "RUNNING",
        Success => "SUCCESS",
        Failure => "FAILURE",
    }
}

/// User roles recognized by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Operator,
}

crate::simple_display! {
    Role {
        Admin => "admin",
        Operator => "operator",
    }
}

/// Owner descriptor attached to every job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub login: String,
    pub role: Role,
}

impl UserRef {
    pub fn new(login: impl Into<String>, role: Role) -> Self {
        Self { login: login.into(), role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Where a job's YAML document comes from: inline text or a path relative
/// to the workspace action store. Exactly one of the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource {
    Inline(String),
    File(String),
}

impl JobSource {
    /// The workspace-relative file path, when the source is a file.
    pub fn file(&self) -> Option<&str> {
        match self {
            JobSource::File(path) => Some(path),
            JobSource::Inline(_) => None,
        }
    }

    /// The inline document text, when the source is inline.
    pub fn inline(&self) -> Option<&str> {
        match self {
            JobSource::Inline(text) => Some(text),
            JobSource::File(_) => None,
        }
    }
}

/// The `status.json` document written into each execution directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(rename = "job-id")]
    pub id: JobId,
    #[serde(rename = "job-state")]
    pub state: JobState,
    #[serde(rename = "job-name")]
    pub name: String,
    #[serde(rename = "job-duration")]
    pub duration: f64,
    #[serde(rename = "sched-mode")]
    pub sched_mode: SchedMode,
    #[serde(rename = "sched-at")]
    pub sched_at: SchedAt,
    #[serde(rename = "sched-timestamp")]
    pub sched_timestamp: f64,
    pub user: UserRef,
    pub workspace: String,
}

/// The recurring-job backup document (`<backups>/<job-id>.json`).
///
/// A status document augmented with the original source, enough to
/// re-schedule the job verbatim after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobBackup {
    #[serde(flatten)]
    pub status: JobStatus,
    #[serde(rename = "job-file")]
    pub file: Option<String>,
    #[serde(rename = "job-descr")]
    pub descr: Option<String>,
}

impl JobBackup {
    /// Reconstruct the job source stored in this backup.
    pub fn source(&self) -> Option<JobSource> {
        match (&self.file, &self.descr) {
            (Some(path), _) => Some(JobSource::File(path.clone())),
            (None, Some(text)) => Some(JobSource::Inline(text.clone())),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
