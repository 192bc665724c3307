// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the end-to-end specs.

#![allow(dead_code)]

use jw_core::JobId;
use jw_runbook::Compiler;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SPEC_WAIT_MAX_MS: u64 = 10_000;

/// The runner binary built by this workspace.
pub fn runner_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("jw-runner")
}

/// A temporary project tree: one `common` workspace with globals, plus
/// empty execution/backup roots.
pub struct Project {
    root: tempfile::TempDir,
}

impl Project {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let ws = root.path().join("workspaces").join("common");
        std::fs::create_dir_all(ws.join("snippets")).unwrap();
        std::fs::create_dir_all(ws.join("actions")).unwrap();
        std::fs::write(ws.join("globals.yml"), "env:\n  name: spec\n").unwrap();
        std::fs::create_dir_all(root.path().join("executions")).unwrap();
        std::fs::create_dir_all(root.path().join("backups")).unwrap();
        Self { root }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn workspaces(&self) -> PathBuf {
        self.path().join("workspaces")
    }

    pub fn executions(&self) -> PathBuf {
        self.path().join("executions")
    }

    pub fn backups(&self) -> PathBuf {
        self.path().join("backups")
    }

    pub fn compiler(&self) -> Compiler {
        Compiler::new(self.workspaces())
    }

    /// Drop a snippet source into the common workspace's snippet store.
    pub fn write_snippet(&self, name: &str, content: &str) {
        std::fs::write(self.workspaces().join("common").join("snippets").join(name), content)
            .unwrap();
    }

    /// Compile an inline job document into a fresh job directory (no
    /// engine involved) and return the directory.
    pub fn compile_job(&self, doc: &str) -> PathBuf {
        let id = JobId::new();
        let job_dir = self.path().join("jobs").join(id.as_str());
        std::fs::create_dir_all(&job_dir).unwrap();
        self.compiler()
            .compile(&jw_core::JobSource::Inline(doc.to_string()), "common", &id, &job_dir)
            .unwrap();
        job_dir
    }
}

/// Poll `cond` until it holds or `max_ms` elapsed.
pub async fn wait_for(max_ms: u64, mut cond: impl FnMut() -> bool) -> bool {
    let started = std::time::Instant::now();
    while started.elapsed() < Duration::from_millis(max_ms) {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Log-line payloads with the leading timestamp stripped.
pub fn log_payloads(log: &str) -> Vec<String> {
    log.lines()
        .filter_map(|line| line.split_once(' ').map(|(_, rest)| rest.to_string()))
        .collect()
}

/// Index of the first payload starting with `prefix`.
pub fn payload_position(payloads: &[String], prefix: &str) -> usize {
    payloads
        .iter()
        .position(|p| p.starts_with(prefix))
        .unwrap_or_else(|| panic!("no log line starting with '{prefix}' in {payloads:?}"))
}
