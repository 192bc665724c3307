// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's YAML configuration document.
//!
//! ```yaml
//! name: jobwright
//! paths:
//!   workspaces: /var/lib/jobwright/workspaces
//!   executions: /var/lib/jobwright/executions
//!   backups: /var/lib/jobwright/backups
//!   runner: /usr/local/bin/jw-runner
//! log:
//!   level: info
//!   file: /var/log/jobwright/jwd.log
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    Missing(PathBuf),
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad yaml config file provided: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default = "default_name")]
    pub name: String,
    pub paths: Paths,
    #[serde(default)]
    pub log: LogConfig,
}

/// Filesystem roots the engine components are built from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Paths {
    pub workspaces: PathBuf,
    pub executions: PathBuf,
    pub backups: PathBuf,
    /// The runner binary forked for each fire.
    pub runner: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// Server log file; stderr when absent.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_level(), file: None }
    }
}

fn default_name() -> String {
    "jobwright".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::Missing(path.to_path_buf())
            } else {
                ConfigError::Io(e)
            }
        })?;
        Ok(serde_yaml::from_str(&text)?)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
