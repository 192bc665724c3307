// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The YAML job document model.
//!
//! Two mutually exclusive shapes:
//!
//! ```yaml
//! # inline: one snippet, body text under `script`
//! script: |
//!   log hello
//! variables:
//!   greeting: hello
//! ```
//!
//! ```yaml
//! # DAG: ordered sequence of singleton `name: spec` mappings
//! snippets:
//!   - fetch:
//!       execute: fetch.yml
//!   - report:
//!       description: build the report
//!       when: { fetch: done }
//!       with: { source: "${{variables.source}}" }
//! variables:
//!   source: nightly
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("yaml loading error - {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid value in document: {0}")]
    Value(#[from] serde_json::Error),
    #[error("job document must declare exactly one of 'script' or 'snippets'")]
    AmbiguousShape,
    #[error("'variables' must be a mapping")]
    VariablesNotMapping,
    #[error("snippet entry {0} must be a single 'name: spec' mapping")]
    NotSingleton(usize),
    #[error("duplicate snippet name '{0}'")]
    DuplicateName(String),
    #[error("snippet '{name}' references predecessor '{predecessor}' not declared earlier in the sequence")]
    UnknownPredecessor { name: String, predecessor: String },
}

/// A parsed and validated job document.
#[derive(Debug, Clone, PartialEq)]
pub enum JobDoc {
    Inline(InlineJob),
    Dag(DagJob),
}

/// Inline shape: a single anonymous snippet.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineJob {
    pub script: String,
    /// Job variables (a mapping, possibly empty).
    pub variables: Value,
}

/// DAG shape: ordered snippet declarations plus job-level variables.
#[derive(Debug, Clone, PartialEq)]
pub struct DagJob {
    pub variables: Value,
    pub snippets: Vec<SnippetDecl>,
}

/// One `name: spec` entry of the `snippets:` sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SnippetDecl {
    pub name: String,
    pub description: String,
    /// Source path relative to the workspace snippet store.
    pub execute: Option<String>,
    /// Incoming links: predecessor name → message gating this snippet.
    pub when: IndexMap<String, String>,
    /// Parameters overlaid onto the executed snippet's variables.
    pub with: IndexMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawDoc {
    script: Option<String>,
    variables: Option<serde_yaml::Value>,
    snippets: Option<Vec<IndexMap<String, Option<RawSnippet>>>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSnippet {
    #[serde(default)]
    description: String,
    execute: Option<String>,
    #[serde(default)]
    when: IndexMap<String, String>,
    #[serde(default)]
    with: IndexMap<String, serde_yaml::Value>,
}

impl JobDoc {
    /// Parse and validate a YAML job document.
    pub fn parse(text: &str) -> Result<Self, DocError> {
        let raw: RawDoc = serde_yaml::from_str(text)?;
        let variables = mapping_or_empty(raw.variables)?;

        match (raw.script, raw.snippets) {
            (Some(script), None) => Ok(JobDoc::Inline(InlineJob { script, variables })),
            (None, Some(entries)) => {
                let snippets = parse_snippets(entries)?;
                Ok(JobDoc::Dag(DagJob { variables, snippets }))
            }
            _ => Err(DocError::AmbiguousShape),
        }
    }

    /// Job-level variables, whichever shape.
    pub fn variables(&self) -> &Value {
        match self {
            JobDoc::Inline(inline) => &inline.variables,
            JobDoc::Dag(dag) => &dag.variables,
        }
    }
}

fn parse_snippets(
    entries: Vec<IndexMap<String, Option<RawSnippet>>>,
) -> Result<Vec<SnippetDecl>, DocError> {
    let mut seen: Vec<String> = Vec::new();
    let mut snippets = Vec::with_capacity(entries.len());

    for (index, mut entry) in entries.into_iter().enumerate() {
        if entry.len() != 1 {
            return Err(DocError::NotSingleton(index));
        }
        let Some((name, spec)) = entry.pop() else {
            return Err(DocError::NotSingleton(index));
        };
        if seen.contains(&name) {
            return Err(DocError::DuplicateName(name));
        }
        let spec = spec.unwrap_or_default();

        // A link must point at an already-declared snippet; anything else
        // leaves the node unstartable and the run would never terminate.
        for predecessor in spec.when.keys() {
            if !seen.contains(predecessor) {
                return Err(DocError::UnknownPredecessor {
                    name: name.clone(),
                    predecessor: predecessor.clone(),
                });
            }
        }

        let mut with = IndexMap::with_capacity(spec.with.len());
        for (key, value) in spec.with {
            with.insert(key, serde_json::to_value(value)?);
        }

        seen.push(name.clone());
        snippets.push(SnippetDecl {
            name,
            description: spec.description,
            execute: spec.execute,
            when: spec.when,
            with,
        });
    }
    Ok(snippets)
}

fn mapping_or_empty(value: Option<serde_yaml::Value>) -> Result<Value, DocError> {
    match value {
        None | Some(serde_yaml::Value::Null) => Ok(Value::Object(serde_json::Map::new())),
        Some(v) => {
            let json = serde_json::to_value(v)?;
            if json.is_object() {
                Ok(json)
            } else {
                Err(DocError::VariablesNotMapping)
            }
        }
    }
}

#[cfg(test)]
#[path = "doc_tests.rs"]
mod tests;
