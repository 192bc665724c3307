// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The compiled-job manifest: the contract between the compiler and the
//! runner process.
//!
//! The compiler writes `job.json` plus one `snippet<N>.src` body file per
//! snippet into the execution directory; the runner parses the manifest and
//! reads the bodies back. The engine treats both as opaque after generation.

use crate::id::JobId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A compiled job, ready for the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledJob {
    #[serde(rename = "job-id")]
    pub job_id: JobId,
    pub workspace: String,
    /// Workspace globals, resolved at compile time.
    pub globals: serde_json::Value,
    pub snippets: Vec<CompiledSnippet>,
}

/// One snippet node of a compiled job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledSnippet {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Incoming links: predecessor name → expected message.
    #[serde(default)]
    pub when: IndexMap<String, String>,
    /// Declared variables after the `with:` overlay.
    #[serde(default)]
    pub variables: serde_json::Value,
    /// Body file name, relative to the job directory.
    pub body: String,
}

impl CompiledSnippet {
    pub fn body_file_name(id: u32) -> String {
        format!("snippet{id}.src")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("manifest encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CompiledJob {
    pub const FILE_NAME: &'static str = "job.json";

    /// Write the manifest into a job directory.
    pub fn save(&self, job_dir: &Path) -> Result<(), ManifestError> {
        let text = serde_json::to_string(self)?;
        std::fs::write(job_dir.join(Self::FILE_NAME), text)?;
        Ok(())
    }

    /// Load the manifest from a job directory.
    pub fn load(job_dir: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(job_dir.join(Self::FILE_NAME))?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
