// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jwd: the jobwright automation server daemon.
//!
//! Boot order mirrors the engine layering: configuration, logging, the
//! stores, the scheduler, then the jobs manager (which replays recurring
//! backups). The process then parks until SIGINT/SIGTERM and drains the
//! scheduler on the way out.

mod config;

use config::Config;
use jw_core::SystemClock;
use jw_engine::{EventQueue, JobsManager};
use jw_runbook::Compiler;
use jw_storage::{BackupStore, ExecutionStore};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("jwd: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    let config_path = parse_args()?;
    let config = Config::load(&config_path).map_err(|e| e.to_string())?;
    let _log_guard = init_logging(&config);

    tracing::info!(name = %config.name, "starting up server");

    let store = Arc::new(
        ExecutionStore::new(&config.paths.executions).map_err(|e| e.to_string())?,
    );
    tracing::info!("execution storage [OK]");
    let backups =
        Arc::new(BackupStore::new(&config.paths.backups).map_err(|e| e.to_string())?);
    tracing::info!("backup storage [OK]");

    let queue = EventQueue::start(SystemClock);
    tracing::info!("scheduler [OK]");

    let manager = JobsManager::new(
        queue.clone(),
        store,
        backups,
        Compiler::new(&config.paths.workspaces),
        &config.paths.runner,
    );
    if let Err(e) = manager.reload_from_backups() {
        tracing::error!(error = %e, "backup reload failed");
    }
    tracing::info!("jobs manager [OK]");

    wait_for_shutdown().await;

    tracing::info!("shutting down");
    queue.stop();
    queue.stopped().await;
    Ok(())
}

fn parse_args() -> Result<PathBuf, String> {
    let mut args = std::env::args_os().skip(1);
    match (args.next(), args.next()) {
        (None, _) => Ok(PathBuf::from("config.yml")),
        (Some(path), None) => Ok(PathBuf::from(path)),
        _ => Err("usage: jwd [config.yml]".to_string()),
    }
}

/// Install the tracing subscriber; the returned guard keeps the
/// non-blocking file writer flushing until shutdown.
fn init_logging(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info"));
    match &config.log.file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .map(std::ffi::OsStr::to_os_string)
                .unwrap_or_else(|| "jwd.log".into());
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}
