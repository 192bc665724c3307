// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use jw_core::{JobId, JobState, JobStatus, Role, SchedAt, SchedMode, UserRef};

fn backup(id: &str, ts: f64) -> JobBackup {
    JobBackup {
        status: JobStatus {
            id: JobId::from_string(id),
            state: JobState::Waiting,
            name: format!("Job #{id}"),
            duration: 0.0,
            sched_mode: SchedMode::Daily,
            sched_at: SchedAt::from([0, 0, 0, 6, 0, 0]),
            sched_timestamp: ts,
            user: UserRef::new("admin", Role::Admin),
            workspace: "common".to_string(),
        },
        file: None,
        descr: Some("script: log hi".to_string()),
    }
}

#[test]
fn save_load_remove_cycle() {
    let root = tempfile::tempdir().unwrap();
    let store = BackupStore::new(root.path().join("backups")).unwrap();

    store.save(&backup("a", 100.0)).unwrap();
    store.save(&backup("b", 200.0)).unwrap();
    assert!(store.path("a").is_file());

    let mut loaded = store.load_all().unwrap();
    loaded.sort_by(|x, y| x.status.id.as_str().cmp(y.status.id.as_str()));
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].status.id, "a");
    assert_eq!(loaded[1].status.sched_timestamp, 200.0);

    store.remove("a");
    assert!(!store.path("a").exists());
    assert_eq!(store.load_all().unwrap().len(), 1);

    // removing a missing backup is silent
    store.remove("a");
}

#[test]
fn malformed_backups_are_skipped() {
    let root = tempfile::tempdir().unwrap();
    let store = BackupStore::new(root.path().join("backups")).unwrap();

    store.save(&backup("good", 100.0)).unwrap();
    std::fs::write(store.path("broken"), "{ not json").unwrap();

    let loaded = store.load_all().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].status.id, "good");
}
