// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine specs: queue + manager + runner child process.

use crate::prelude::*;
use jw_core::{Clock, JobSource, JobState, Role, SchedAt, SchedMode, SystemClock, UserRef};
use jw_engine::{EventQueue, JobsManager, ScheduleRequest};
use jw_runbook::Compiler;
use jw_storage::{BackupStore, ExecutionStore};
use std::sync::Arc;

struct Engine {
    project: Project,
    store: Arc<ExecutionStore>,
    backups: Arc<BackupStore>,
    queue: Arc<EventQueue>,
    manager: Arc<JobsManager>,
}

fn engine() -> Engine {
    let project = Project::new();
    let store = Arc::new(ExecutionStore::new(project.executions()).unwrap());
    let backups = Arc::new(BackupStore::new(project.backups()).unwrap());
    let queue = EventQueue::start(SystemClock);
    let manager = JobsManager::new(
        queue.clone(),
        store.clone(),
        backups.clone(),
        Compiler::new(project.workspaces()),
        runner_bin(),
    );
    Engine { project, store, backups, queue, manager }
}

fn admin() -> UserRef {
    UserRef::new("admin", Role::Admin)
}

fn inline_now(script: &str) -> ScheduleRequest {
    ScheduleRequest {
        user: admin(),
        source: JobSource::Inline(script.to_string()),
        workspace: "common".to_string(),
        sched_mode: SchedMode::Now,
        sched_at: SchedAt::zero(),
        sched_timestamp: None,
    }
}

impl Engine {
    async fn wait_state(&self, job_id: &str, state: JobState) -> bool {
        let store = self.store.clone();
        let id = job_id.to_string();
        wait_for(SPEC_WAIT_MAX_MS, move || {
            store.read_status(&id).map(|s| s.state == state).unwrap_or(false)
        })
        .await
    }

    fn log(&self, job_id: &str) -> String {
        std::fs::read_to_string(self.store.path(job_id).join("job.log")).unwrap_or_default()
    }
}

#[tokio::test]
async fn inline_now_job_end_to_end() {
    let engine = engine();
    let id = engine.manager.schedule(inline_now("script: log hello\nvariables: {}\n")).unwrap();

    assert!(engine.wait_state(id.as_str(), JobState::Success).await, "job should succeed");

    // the status document on disk carries the wire keys
    let raw = std::fs::read_to_string(engine.store.path(id.as_str()).join("status.json")).unwrap();
    let status: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(status["job-state"], "SUCCESS");
    assert_eq!(status["workspace"], "common");

    let payloads = log_payloads(&engine.log(id.as_str()));
    let started = payload_position(&payloads, "0 job-started");
    let begin = payload_position(&payloads, "0 snippet-begin");
    let ending = payload_position(&payloads, "0 snippet-ending SUCCESS");
    let stopped = payload_position(&payloads, "0 job-stopped SUCCESS");
    assert!(started < begin && begin < ending && ending < stopped);

    engine.queue.stop();
}

#[tokio::test]
async fn failed_job_surfaces_failure_state_and_lines() {
    let engine = engine();
    let id = engine.manager.schedule(inline_now("script: fail broken\n")).unwrap();

    assert!(engine.wait_state(id.as_str(), JobState::Failure).await, "job should fail");

    let log = engine.log(id.as_str());
    assert!(log.contains("0 snippet-error broken"));
    assert!(log.contains("0 job-stopped FAILURE"));

    engine.queue.stop();
}

#[tokio::test]
async fn recurring_daily_fire_leaves_one_advanced_backup() {
    let engine = engine();
    let original = SystemClock.epoch() - 30.0;
    let request = ScheduleRequest {
        user: admin(),
        source: JobSource::Inline("script: log tick\n".to_string()),
        workspace: "common".to_string(),
        sched_mode: SchedMode::Daily,
        sched_at: SchedAt::from([0, 0, 0, 6, 0, 0]),
        sched_timestamp: Some(original),
    };
    let id = engine.manager.schedule(request).unwrap();

    assert!(engine.wait_state(id.as_str(), JobState::Success).await, "fire should complete");

    let backups = engine.backups.clone();
    let advanced = wait_for(SPEC_WAIT_MAX_MS, move || {
        backups.load_all().map(|b| b.len() == 1).unwrap_or(false)
    })
    .await;
    assert!(advanced, "exactly one backup should remain");

    let backups = engine.backups.load_all().unwrap();
    assert_ne!(backups[0].status.id, id);
    assert_eq!(backups[0].status.sched_timestamp, original + 86_400.0);
    assert_eq!(backups[0].status.state, JobState::Waiting);

    engine.queue.stop();
}

#[tokio::test]
async fn deleting_a_running_job_kills_the_child() {
    let engine = engine();
    let id = engine.manager.schedule(inline_now("script: sleep 30\n")).unwrap();

    assert!(engine.wait_state(id.as_str(), JobState::Running).await, "job should start");
    engine.manager.delete(id.as_str(), &admin()).unwrap();
    assert!(engine.wait_state(id.as_str(), JobState::Failure).await, "kill should fail the job");

    engine.queue.stop();
}

#[tokio::test]
async fn log_tailing_by_offset_through_the_store() {
    let engine = engine();
    let id = engine.manager.schedule(inline_now("script: log tailed\n")).unwrap();
    assert!(engine.wait_state(id.as_str(), JobState::Success).await);

    let (text, offset) = engine.store.read_logs(id.as_str(), 0).unwrap();
    assert!(text.contains("0 snippet-log tailed"));
    let (rest, same) = engine.store.read_logs(id.as_str(), offset).unwrap();
    assert!(rest.is_empty());
    assert_eq!(same, offset);

    engine.queue.stop();
}

#[tokio::test]
async fn finished_jobs_appear_in_the_workspace_listing() {
    let engine = engine();
    let id = engine.manager.schedule(inline_now("script: log done\n")).unwrap();
    assert!(engine.wait_state(id.as_str(), JobState::Success).await);

    let listing = engine.store.list_by_workspace("common");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, id);
    // the active list no longer carries the terminal job
    assert!(engine.manager.list("common").is_empty());

    engine.queue.stop();
}

#[tokio::test]
async fn file_sourced_jobs_load_from_the_action_store() {
    let engine = engine();
    let action = engine
        .project
        .workspaces()
        .join("common")
        .join("actions")
        .join("hello.yml");
    std::fs::write(action, "script: log from-action\n").unwrap();

    let request = ScheduleRequest {
        user: admin(),
        source: JobSource::File("hello.yml".to_string()),
        workspace: "common".to_string(),
        sched_mode: SchedMode::Now,
        sched_at: SchedAt::zero(),
        sched_timestamp: None,
    };
    let id = engine.manager.schedule(request).unwrap();
    assert!(engine.wait_state(id.as_str(), JobState::Success).await);

    let status = engine.store.read_status(id.as_str()).unwrap();
    assert_eq!(status.name, "hello.yml");
    assert!(engine.log(id.as_str()).contains("0 snippet-log from-action"));

    engine.queue.stop();
}
