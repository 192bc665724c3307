// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jw-storage: on-disk state for job executions.
//!
//! Two stores, both rooted at configurable directories: the
//! [`ExecutionStore`] owns one directory per job (status document, log
//! file, compiled sources), the [`BackupStore`] owns the flat JSON backups
//! that let recurring jobs survive a restart.

pub mod backup;
pub mod execution;

pub use backup::BackupStore;
pub use execution::{ExecutionStore, StorageError};
