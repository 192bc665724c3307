// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snippet node states and return codes.

use crate::job::JobState;

/// State of a snippet node inside a run.
///
/// The numeric values are load-bearing: the dispatcher's termination
/// predicate sums them and compares against `2 × |snippets|`, so a node
/// cancelled or errored straight out of CREATED contributes the same 2 as
/// one that went through STARTED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SnippetState {
    Created = 0,
    Started = 1,
    Terminated = 2,
}

impl SnippetState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => SnippetState::Created,
            1 => SnippetState::Started,
            _ => SnippetState::Terminated,
        }
    }
}

crate::simple_display! {
    SnippetState {
        Created => "created",
        Started => "started",
        Terminated => "terminated",
    }
}

/// Return code of a snippet, and of the runner process as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RetCode {
    Pass = 0,
    Error = 3,
}

impl RetCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Process exit code for the runner.
    pub fn exit_code(self) -> i32 {
        self as i32
    }

    /// The terminal job state this code renders as in log lines.
    pub fn state(self) -> JobState {
        match self {
            RetCode::Pass => JobState::Success,
            RetCode::Error => JobState::Failure,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        if value == 0 {
            RetCode::Pass
        } else {
            RetCode::Error
        }
    }
}

#[cfg(test)]
#[path = "snippet_tests.rs"]
mod tests;
