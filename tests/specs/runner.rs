// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner-process specs: drive `jw-runner` over compiled job directories.

use crate::prelude::*;
use std::path::Path;

fn run_runner(job_dir: &Path) -> std::process::Output {
    std::process::Command::new(runner_bin())
        .arg(job_dir)
        .output()
        .expect("jw-runner should spawn")
}

fn job_log(job_dir: &Path) -> String {
    std::fs::read_to_string(job_dir.join("job.log")).unwrap_or_default()
}

#[test]
fn inline_snippet_completes_successfully() {
    let project = Project::new();
    let job_dir = project.compile_job("script: emit done\nvariables: {}\n");

    let output = run_runner(&job_dir);
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stderr.is_empty(), "stderr: {:?}", output.stderr);

    let payloads = log_payloads(&job_log(&job_dir));
    assert!(payloads.iter().any(|p| p.starts_with("0 snippet-begin")));
    assert!(payloads.iter().any(|p| p.starts_with("0 snippet-ending SUCCESS ")));
}

#[test]
fn linear_dag_runs_in_order() {
    let project = Project::new();
    project.write_snippet("first.yml", "script: log from-first\n");
    project.write_snippet("second.yml", "script: log from-second\n");
    let job_dir = project.compile_job(
        r#"
snippets:
  - first:
      execute: first.yml
  - second:
      execute: second.yml
      when: { first: done }
"#,
    );

    let output = run_runner(&job_dir);
    assert_eq!(output.status.code(), Some(0));

    let payloads = log_payloads(&job_log(&job_dir));
    let begin_1 = payload_position(&payloads, "1 snippet-begin");
    let end_1 = payload_position(&payloads, "1 snippet-ending SUCCESS");
    let begin_2 = payload_position(&payloads, "2 snippet-begin");
    let end_2 = payload_position(&payloads, "2 snippet-ending SUCCESS");
    assert!(begin_1 < end_1 && end_1 < begin_2 && begin_2 < end_2);
}

#[test]
fn non_matching_message_cancels_the_successor() {
    let project = Project::new();
    project.write_snippet("a.yml", "script: log from-a\n");
    project.write_snippet("b.yml", "script: log from-b\n");
    let job_dir = project.compile_job(
        r#"
snippets:
  - a:
      execute: a.yml
  - b:
      execute: b.yml
      when: { a: custom }
"#,
    );

    let output = run_runner(&job_dir);
    // the cancelled branch does not fail the job
    assert_eq!(output.status.code(), Some(0));

    let log = job_log(&job_dir);
    assert!(!log.contains("2 snippet-begin"), "b must not start: {log}");
}

#[test]
fn failure_cancels_downstream_and_exits_nonzero() {
    let project = Project::new();
    project.write_snippet("a.yml", "script: fail boom\n");
    project.write_snippet("b.yml", "script: log from-b\n");
    let job_dir = project.compile_job(
        r#"
snippets:
  - a:
      execute: a.yml
  - b:
      execute: b.yml
      when: { a: done }
"#,
    );

    let output = run_runner(&job_dir);
    assert_eq!(output.status.code(), Some(3));

    let payloads = log_payloads(&job_log(&job_dir));
    assert!(payloads.iter().any(|p| p == "1 snippet-error boom"));
    assert!(payloads.iter().any(|p| p.starts_with("1 snippet-ending FAILURE ")));
    assert!(!payloads.iter().any(|p| p.starts_with("2 snippet-begin")));
}

#[test]
fn with_parameters_substitute_typed_values() {
    let project = Project::new();
    project.write_snippet("use.yml", "script: log p is ${{variables.p}}\nvariables:\n  p: 0\n");
    let job_dir = project.compile_job(
        r#"
snippets:
  - use:
      execute: use.yml
      with: { p: "${{variables.x.y}}" }
variables:
  x: { y: 42 }
"#,
    );

    // the compiled manifest carries the typed value, not a string
    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(job_dir.join("job.json")).unwrap()).unwrap();
    assert_eq!(manifest["snippets"][0]["variables"]["p"], serde_json::json!(42));

    let output = run_runner(&job_dir);
    assert_eq!(output.status.code(), Some(0));
    assert!(job_log(&job_dir).contains("1 snippet-log p is 42"));
}

#[test]
fn globals_and_cache_resolve_at_access_time() {
    let project = Project::new();
    let job_dir = project.compile_job(
        "script: |\n  set token t-7\n  log env=${{globals.env.name}} token=${{cache.token}}\n",
    );

    let output = run_runner(&job_dir);
    assert_eq!(output.status.code(), Some(0));
    assert!(job_log(&job_dir).contains("0 snippet-log env=spec token=t-7"));
}

#[test]
fn missing_snippet_source_fails_at_runtime_not_schedule_time() {
    let project = Project::new();
    let job_dir = project.compile_job("snippets:\n  - ghost:\n      execute: ghost.yml\n");

    let output = run_runner(&job_dir);
    assert_eq!(output.status.code(), Some(3));
    assert!(job_log(&job_dir)
        .contains("1 snippet-error file=ghost.yml not found in workspace=common"));
}

#[test]
fn runner_without_a_manifest_exits_with_an_error() {
    let project = Project::new();
    let empty = project.path().join("empty");
    std::fs::create_dir_all(&empty).unwrap();

    let output = run_runner(&empty);
    assert_eq!(output.status.code(), Some(3));
    assert!(!output.stderr.is_empty());
}
