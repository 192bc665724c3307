// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job compiler: YAML document → execution-directory artifacts.
//!
//! Compilation resolves the job source, validates the document, loads the
//! workspace globals, applies the compile-time `${{variables.…}}`
//! substitution to each snippet's `with:` parameters, and materializes the
//! manifest plus one body file per snippet. Output is deterministic on
//! `(document, workspace, job id)`.

use crate::doc::{DagJob, DocError, InlineJob, JobDoc, SnippetDecl};
use crate::globals::{GlobalsError, GlobalsStore};
use jw_core::subst::{lookup_in, substitute, VARIABLES_PATTERN};
use jw_core::{CompiledJob, CompiledSnippet, ErrorKind, JobId, JobSource, ManifestError};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Workspace subdirectory holding user-authored job documents.
pub const ACTIONS_DIR: &str = "actions";
/// Workspace subdirectory holding executable snippet sources.
pub const SNIPPETS_DIR: &str = "snippets";

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("file={file} not found in workspace={workspace}")]
    SourceNotFound { file: String, workspace: String },
    #[error(transparent)]
    Doc(#[from] DocError),
    #[error(transparent)]
    Globals(#[from] GlobalsError),
    #[error("job directory write error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

impl CompileError {
    /// Wire kind the engine reports for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::SourceNotFound { .. } => ErrorKind::NotFound,
            CompileError::Doc(_) => ErrorKind::Failed,
            CompileError::Globals(_) | CompileError::Io(_) | CompileError::Manifest(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// A snippet source file: body text plus declared variables.
#[derive(Debug, Deserialize)]
struct SnippetSource {
    script: String,
    #[serde(default)]
    variables: serde_yaml::Value,
}

pub struct Compiler {
    workspaces_root: PathBuf,
}

impl Compiler {
    pub fn new(workspaces_root: impl Into<PathBuf>) -> Self {
        Self { workspaces_root: workspaces_root.into() }
    }

    pub fn workspaces_root(&self) -> &Path {
        &self.workspaces_root
    }

    /// Compile a job document into `job_dir`.
    pub fn compile(
        &self,
        source: &JobSource,
        workspace: &str,
        job_id: &JobId,
        job_dir: &Path,
    ) -> Result<(), CompileError> {
        let text = self.source_text(source, workspace)?;
        let doc = JobDoc::parse(&text)?;
        let globals = GlobalsStore::new(&self.workspaces_root).load(workspace)?;

        let snippets = match &doc {
            JobDoc::Inline(inline) => vec![compile_inline(inline, job_dir)?],
            JobDoc::Dag(dag) => self.compile_dag(dag, workspace, job_dir)?,
        };

        let manifest = CompiledJob {
            job_id: job_id.clone(),
            workspace: workspace.to_string(),
            globals,
            snippets,
        };
        manifest.save(job_dir)?;
        tracing::debug!(job_id = %job_id, workspace, "compiled job manifest");
        Ok(())
    }

    fn source_text(&self, source: &JobSource, workspace: &str) -> Result<String, CompileError> {
        match source {
            JobSource::Inline(text) => Ok(text.clone()),
            JobSource::File(file) => {
                let path = self.workspaces_root.join(workspace).join(ACTIONS_DIR).join(file);
                std::fs::read_to_string(&path).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        CompileError::SourceNotFound {
                            file: file.clone(),
                            workspace: workspace.to_string(),
                        }
                    } else {
                        CompileError::Io(e)
                    }
                })
            }
        }
    }

    fn compile_dag(
        &self,
        dag: &DagJob,
        workspace: &str,
        job_dir: &Path,
    ) -> Result<Vec<CompiledSnippet>, CompileError> {
        let resolve = lookup_in(&dag.variables);
        let mut compiled = Vec::with_capacity(dag.snippets.len());

        for (index, decl) in dag.snippets.iter().enumerate() {
            let id = (index + 1) as u32;
            let (body, mut variables) = match self.load_snippet_source(decl, workspace) {
                Ok(loaded) => loaded,
                Err(reason) => {
                    // Degraded body: the run reports the error instead of
                    // failing the whole schedule.
                    tracing::error!(snippet = %decl.name, %reason, "snippet source unavailable");
                    (format!("fail {reason}"), empty_mapping())
                }
            };

            // Substitute job variables into `with:`, then overlay onto the
            // snippet's declared variables (declared keys only).
            let mut with = decl.with.clone();
            for value in with.values_mut() {
                if let Value::String(text) = value {
                    *value = substitute(text, &VARIABLES_PATTERN, &resolve);
                }
            }
            if let Value::Object(vars) = &mut variables {
                for (key, value) in &with {
                    if vars.contains_key(key) {
                        vars.insert(key.clone(), value.clone());
                    }
                }
            }

            let file_name = CompiledSnippet::body_file_name(id);
            std::fs::write(job_dir.join(&file_name), &body)?;
            compiled.push(CompiledSnippet {
                id,
                name: decl.name.clone(),
                description: decl.description.clone(),
                when: decl.when.clone(),
                variables,
                body: file_name,
            });
        }
        Ok(compiled)
    }

    fn load_snippet_source(
        &self,
        decl: &SnippetDecl,
        workspace: &str,
    ) -> Result<(String, Value), String> {
        let Some(execute) = &decl.execute else {
            return Err(format!("no snippet source declared for '{}'", decl.name));
        };
        let path = self.workspaces_root.join(workspace).join(SNIPPETS_DIR).join(execute);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(format!("file={execute} not found in workspace={workspace}"));
            }
            Err(e) => return Err(format!("file={execute} read error - {e}")),
        };
        let source: SnippetSource =
            serde_yaml::from_str(&text).map_err(|e| format!("yaml loading error - {e}"))?;
        let variables = match serde_json::to_value(source.variables) {
            Ok(v) if v.is_object() => v,
            _ => empty_mapping(),
        };
        Ok((source.script, variables))
    }
}

fn compile_inline(inline: &InlineJob, job_dir: &Path) -> Result<CompiledSnippet, CompileError> {
    let file_name = CompiledSnippet::body_file_name(0);
    std::fs::write(job_dir.join(&file_name), &inline.script)?;
    Ok(CompiledSnippet {
        id: 0,
        name: "script".to_string(),
        description: String::new(),
        when: indexmap::IndexMap::new(),
        variables: inline.variables.clone(),
        body: file_name,
    })
}

fn empty_mapping() -> Value {
    Value::Object(serde_json::Map::new())
}

#[cfg(test)]
#[path = "compile_tests.rs"]
mod tests;
