// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-scoped globals: `<workspaces>/<workspace>/globals.yml`.

use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum GlobalsError {
    #[error("globals file missing for workspace={workspace}")]
    Missing { workspace: String },
    #[error("invalid yaml - {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("globals for workspace={workspace} must be a mapping")]
    NotMapping { workspace: String },
    #[error("globals io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid value in globals: {0}")]
    Value(#[from] serde_json::Error),
}

/// Read/write access to per-workspace globals documents.
pub struct GlobalsStore {
    workspaces_root: PathBuf,
}

impl GlobalsStore {
    pub fn new(workspaces_root: impl Into<PathBuf>) -> Self {
        Self { workspaces_root: workspaces_root.into() }
    }

    pub fn path(&self, workspace: &str) -> PathBuf {
        self.workspaces_root.join(workspace).join("globals.yml")
    }

    /// Load a workspace's globals as a JSON mapping.
    ///
    /// An empty document resolves to an empty mapping; a missing file is an
    /// error because compiled jobs embed the resolved globals.
    pub fn load(&self, workspace: &str) -> Result<Value, GlobalsError> {
        let path = self.path(workspace);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GlobalsError::Missing { workspace: workspace.to_string() }
            } else {
                GlobalsError::Io(e)
            }
        })?;
        let yaml: serde_yaml::Value = serde_yaml::from_str(&text)?;
        match yaml {
            serde_yaml::Value::Null => Ok(Value::Object(serde_json::Map::new())),
            other => {
                let json = serde_json::to_value(other)?;
                if json.is_object() {
                    Ok(json)
                } else {
                    Err(GlobalsError::NotMapping { workspace: workspace.to_string() })
                }
            }
        }
    }

    /// The raw document text, for the control plane's read surface.
    pub fn read_raw(&self, workspace: &str) -> Result<String, GlobalsError> {
        let path = self.path(workspace);
        std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GlobalsError::Missing { workspace: workspace.to_string() }
            } else {
                GlobalsError::Io(e)
            }
        })
    }

    /// Validate and overwrite a workspace's globals document.
    pub fn save(&self, workspace: &str, content: &str) -> Result<(), GlobalsError> {
        serde_yaml::from_str::<serde_yaml::Value>(content)?;
        let path = self.path(workspace);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "globals_tests.rs"]
mod tests;
