// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job execution directories: `<root>/<job-id>/`.

use jw_core::{JobState, JobStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

pub const STATUS_FILE: &str = "status.json";
pub const LOG_FILE: &str = "job.log";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("result id={0} does not exist")]
    UnknownJob(String),
    #[error("add result folder error: {0}")]
    InitFailed(std::io::Error),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("status encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Store of execution directories with an in-memory status cache.
///
/// The cache is warmed at construction from every `status.json` under the
/// root and kept current by [`ExecutionStore::write_status`]; read-side
/// views never touch the disk for status lookups.
pub struct ExecutionStore {
    root: PathBuf,
    cache: Mutex<HashMap<String, JobStatus>>,
}

impl ExecutionStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let mut cache = HashMap::new();
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            match load_status(&entry.path()) {
                Ok(status) => {
                    cache.insert(status.id.to_string(), status);
                }
                Err(e) => {
                    tracing::error!(entry = %entry.path().display(), error = %e, "bad entry");
                }
            }
        }
        Ok(Self { root, cache: Mutex::new(cache) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a job's execution directory.
    pub fn path(&self, job_id: &str) -> PathBuf {
        self.root.join(job_id)
    }

    /// Create the execution directory for a new job.
    pub fn init(&self, job_id: &str) -> Result<(), StorageError> {
        fs::create_dir(self.path(job_id)).map_err(StorageError::InitFailed)
    }

    /// Recursively remove a job's execution directory. Best-effort: a
    /// missing directory is not an error.
    pub fn reset(&self, job_id: &str) {
        if let Err(e) = fs::remove_dir_all(self.path(job_id)) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::error!(job_id, error = %e, "rm result failed");
            }
        }
        self.cache.lock().remove(job_id);
    }

    /// Remove a terminal job's results (control-plane deletion).
    pub fn delete(&self, job_id: &str) -> Result<(), StorageError> {
        if !self.cache.lock().contains_key(job_id) {
            return Err(StorageError::UnknownJob(job_id.to_string()));
        }
        self.reset(job_id);
        Ok(())
    }

    /// Atomically overwrite `status.json` and refresh the cache.
    pub fn write_status(&self, status: &JobStatus) -> Result<(), StorageError> {
        let dir = self.path(status.id.as_str());
        let tmp = dir.join(".status.json.tmp");
        fs::write(&tmp, serde_json::to_string(status)?)?;
        fs::rename(&tmp, dir.join(STATUS_FILE))?;
        self.cache.lock().insert(status.id.to_string(), status.clone());
        Ok(())
    }

    pub fn read_status(&self, job_id: &str) -> Result<JobStatus, StorageError> {
        self.cache
            .lock()
            .get(job_id)
            .cloned()
            .ok_or_else(|| StorageError::UnknownJob(job_id.to_string()))
    }

    /// Completed and running executions of a workspace, most recent first.
    pub fn list_by_workspace(&self, workspace: &str) -> Vec<JobStatus> {
        let mut listing: Vec<JobStatus> = self
            .cache
            .lock()
            .values()
            .filter(|s| s.state != JobState::Waiting && s.workspace == workspace)
            .cloned()
            .collect();
        listing.sort_by(|a, b| {
            b.sched_timestamp
                .partial_cmp(&a.sched_timestamp)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        listing
    }

    /// Read `job.log` from a byte offset; returns the text and the offset
    /// to resume from. A missing log file yields empty text at the same
    /// offset.
    pub fn read_logs(&self, job_id: &str, offset: u64) -> Result<(String, u64), StorageError> {
        if !self.cache.lock().contains_key(job_id) {
            return Err(StorageError::UnknownJob(job_id.to_string()));
        }
        let path = self.path(job_id).join(LOG_FILE);
        let mut file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok((String::new(), offset));
            }
            Err(e) => return Err(StorageError::Io(e)),
        };
        file.seek(SeekFrom::Start(offset))?;
        let mut text = String::new();
        file.read_to_string(&mut text)?;
        let next = file.stream_position()?;
        Ok((text, next))
    }
}

fn load_status(dir: &Path) -> Result<JobStatus, StorageError> {
    let text = fs::read_to_string(dir.join(STATUS_FILE))?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
