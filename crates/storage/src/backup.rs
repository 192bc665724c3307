// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recurring-job backups: `<root>/<job-id>.json`.
//!
//! Exactly one backup document exists while a recurring job is WAITING; it
//! is removed when the run fires and re-created for the next occurrence.

use crate::execution::StorageError;
use jw_core::JobBackup;
use std::fs;
use std::path::PathBuf;

pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn path(&self, job_id: &str) -> PathBuf {
        self.root.join(format!("{job_id}.json"))
    }

    pub fn save(&self, backup: &JobBackup) -> Result<(), StorageError> {
        let text = serde_json::to_string(backup)?;
        fs::write(self.path(backup.status.id.as_str()), text)?;
        Ok(())
    }

    /// Best-effort removal; a missing backup is not an error.
    pub fn remove(&self, job_id: &str) {
        if let Err(e) = fs::remove_file(self.path(job_id)) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::error!(job_id, error = %e, "backup removal failed");
            }
        }
    }

    /// Load every backup document, skipping malformed entries with an
    /// error log (no partial re-schedule, per the recovery rules).
    pub fn load_all(&self) -> Result<Vec<JobBackup>, StorageError> {
        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match fs::read_to_string(entry.path())
                .map_err(StorageError::Io)
                .and_then(|text| serde_json::from_str(&text).map_err(StorageError::Json))
            {
                Ok(backup) => backups.push(backup),
                Err(e) => {
                    tracing::error!(entry = %entry.path().display(), error = %e, "bad backup entry");
                }
            }
        }
        Ok(backups)
    }
}

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;
