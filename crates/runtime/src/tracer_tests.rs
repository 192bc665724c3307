// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn open_tracer() -> (tempfile::TempDir, JobTracer) {
    let dir = tempfile::tempdir().unwrap();
    let tracer = JobTracer::open(dir.path()).unwrap();
    (dir, tracer)
}

fn read_lines(dir: &tempfile::TempDir) -> Vec<String> {
    std::fs::read_to_string(dir.path().join(LOG_FILE))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Every line starts with `HH:MM:SS.mmmm ` (a 4-digit fractional field).
fn strip_stamp(line: &str) -> &str {
    let (stamp, rest) = line.split_once(' ').unwrap();
    assert_eq!(stamp.len(), 13, "bad timestamp: {stamp}");
    let (hms, frac) = stamp.split_once('.').unwrap();
    assert_eq!(hms.matches(':').count(), 2);
    assert_eq!(frac.len(), 4);
    assert!(frac.chars().all(|c| c.is_ascii_digit()));
    rest
}

#[test]
fn job_lines_use_ref_zero() {
    let (dir, tracer) = open_tracer();
    tracer.log_job_started();
    tracer.log_job_info("hello");
    tracer.log_job_error("boom");
    tracer.log_job_stopped(JobState::Success, 1.23456);

    let lines = read_lines(&dir);
    assert_eq!(strip_stamp(&lines[0]), "0 job-started");
    assert_eq!(strip_stamp(&lines[1]), "0 job-log hello");
    assert_eq!(strip_stamp(&lines[2]), "0 job-error boom");
    assert_eq!(strip_stamp(&lines[3]), "0 job-stopped SUCCESS 1.235");
}

#[test]
fn snippet_lines_use_the_snippet_ref() {
    let (dir, tracer) = open_tracer();
    tracer.log_snippet_started(2, "fetch the thing");
    tracer.log_snippet_info(2, "working");
    tracer.log_snippet_error(2, "nope");
    tracer.log_snippet_stopped(2, JobState::Failure, 0.5);

    let lines = read_lines(&dir);
    assert_eq!(strip_stamp(&lines[0]), "2 snippet-begin fetch the thing");
    assert_eq!(strip_stamp(&lines[1]), "2 snippet-log working");
    assert_eq!(strip_stamp(&lines[2]), "2 snippet-error nope");
    assert_eq!(strip_stamp(&lines[3]), "2 snippet-ending FAILURE 0.500");
}

#[test]
fn open_appends_to_an_existing_log() {
    let dir = tempfile::tempdir().unwrap();
    {
        let tracer = JobTracer::open(dir.path()).unwrap();
        tracer.log_job_started();
    }
    {
        let tracer = JobTracer::open(dir.path()).unwrap();
        tracer.log_job_info("second writer");
    }
    let lines = read_lines(&dir);
    assert_eq!(lines.len(), 2);
}
