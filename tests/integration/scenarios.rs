//! End-to-end scenarios driving the orchestrator over real `/bin/bash`
//! children, matching the walkthroughs described in `SPEC_FULL.md` §8.

use std::fs;
use std::path::Path;
use std::time::Duration;

use dagrun::config::load_config;
use dagrun::orchestrator::Orchestrator;
use dagrun::task::TaskState;

fn write_config(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("dagrun.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn linear_chain_runs_in_dependency_order() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("order.log");
    let path = write_config(
        dir.path(),
        &format!(
            r#"
[[task]]
name = "setup"
cmd = "echo setup >> {marker}"

[[task]]
name = "build"
cmd = "echo build >> {marker}"
depends_on = ["setup"]

[[task]]
name = "test"
cmd = "echo test >> {marker}"
depends_on = ["build"]
"#,
            marker = marker.display()
        ),
    );

    let loaded = load_config(&path).unwrap();
    let orch = Orchestrator::new(loaded).unwrap();
    orch.run();

    for task in orch.snapshot() {
        assert_eq!(task.state, TaskState::Ready, "{} should be ready", task.name);
    }

    let written = fs::read_to_string(&marker).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines, vec!["setup", "build", "test"]);
}

#[test]
fn independent_branches_both_complete() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[task]]
name = "db"
cmd = "true"

[[task]]
name = "cache"
cmd = "true"

[[task]]
name = "api"
cmd = "true"
depends_on = ["db", "cache"]
"#,
    );

    let loaded = load_config(&path).unwrap();
    let orch = Orchestrator::new(loaded).unwrap();
    orch.run();

    for task in orch.snapshot() {
        assert_eq!(task.state, TaskState::Ready);
    }
}

#[test]
fn service_with_passing_probe_becomes_ready_and_unblocks_dependent() {
    let dir = tempfile::tempdir().unwrap();
    let ready_flag = dir.path().join("server_up");
    let path = write_config(
        dir.path(),
        &format!(
            r#"
[[task]]
name = "server"
kind = "service"
cmd = "touch {flag} && sleep 5"
ready_cmd = "test -f {flag}"
ready_timeout = 3

[[task]]
name = "smoke"
cmd = "echo ok"
depends_on = ["server"]
"#,
            flag = ready_flag.display()
        ),
    );

    let loaded = load_config(&path).unwrap();
    let orch = Orchestrator::new(loaded).unwrap();

    std::thread::scope(|scope| {
        let handle = scope.spawn(|| orch.run());
        std::thread::sleep(Duration::from_millis(1500));
        orch.shutdown();
        handle.join().unwrap();
    });

    let snapshot = orch.snapshot();
    let smoke = snapshot.iter().find(|t| t.name == "smoke").unwrap();
    assert_eq!(smoke.state, TaskState::Ready);
}

#[test]
fn service_readiness_timeout_marks_task_failed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[task]]
name = "server"
kind = "service"
cmd = "sleep 5"
ready_cmd = "exit 1"
ready_timeout = 0.5
"#,
    );

    let loaded = load_config(&path).unwrap();
    let orch = Orchestrator::new(loaded).unwrap();
    let log_rx = orch.take_log_receiver().unwrap();

    std::thread::scope(|scope| {
        let handle = scope.spawn(|| orch.run());
        std::thread::sleep(Duration::from_secs(1));
        orch.shutdown();
        handle.join().unwrap();
    });

    let records: Vec<_> = log_rx.try_iter().collect();
    assert!(records.iter().any(|r| r == "[server] READY TIMEOUT"));

    let snapshot = orch.snapshot();
    let server = snapshot.iter().find(|t| t.name == "server").unwrap();
    assert_eq!(server.state, TaskState::Failed);
}

#[test]
fn oneshot_failure_blocks_its_dependent_forever() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("should-not-exist");
    let path = write_config(
        dir.path(),
        &format!(
            r#"
[[task]]
name = "migrate"
cmd = "exit 1"

[[task]]
name = "seed"
cmd = "touch {marker}"
depends_on = ["migrate"]
"#,
            marker = marker.display()
        ),
    );

    let loaded = load_config(&path).unwrap();
    let orch = std::sync::Arc::new(Orchestrator::new(loaded).unwrap());
    let runner = std::sync::Arc::clone(&orch);
    let handle = std::thread::spawn(move || runner.run());

    std::thread::sleep(Duration::from_millis(500));

    let snapshot = orch.snapshot();
    let migrate = snapshot.iter().find(|t| t.name == "migrate").unwrap();
    let seed = snapshot.iter().find(|t| t.name == "seed").unwrap();
    assert_eq!(migrate.state, TaskState::Failed);
    assert_eq!(seed.state, TaskState::Pending);
    assert!(!marker.exists());

    orch.shutdown();
    handle.join().unwrap();
}

#[test]
fn daemon_without_ready_cmd_becomes_ready_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[task]]
name = "watcher"
kind = "daemon"
cmd = "sleep 5"
"#,
    );

    let loaded = load_config(&path).unwrap();
    let orch = Orchestrator::new(loaded).unwrap();

    std::thread::scope(|scope| {
        let handle = scope.spawn(|| orch.run());
        std::thread::sleep(Duration::from_millis(300));

        let snapshot = orch.snapshot();
        let watcher = snapshot.iter().find(|t| t.name == "watcher").unwrap();
        assert_eq!(watcher.state, TaskState::Ready);

        orch.shutdown();
        handle.join().unwrap();
    });
}

#[test]
fn dependency_cycle_is_rejected_before_anything_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[task]]
name = "a"
cmd = "true"
depends_on = ["b"]

[[task]]
name = "b"
cmd = "true"
depends_on = ["a"]
"#,
    );

    let loaded = load_config(&path).unwrap();
    let err = Orchestrator::new(loaded).unwrap_err();
    assert!(matches!(err, dagrun::error::ConfigError::Cycle(_)));
}

#[test]
fn shutdown_terminates_a_long_running_daemon_promptly() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[task]]
name = "forever"
kind = "daemon"
cmd = "sleep 300"
"#,
    );

    let loaded = load_config(&path).unwrap();
    let orch = std::sync::Arc::new(Orchestrator::new(loaded).unwrap());
    let runner = std::sync::Arc::clone(&orch);
    let handle = std::thread::spawn(move || runner.run());

    std::thread::sleep(Duration::from_millis(300));
    let start = std::time::Instant::now();
    orch.shutdown();
    handle.join().unwrap();

    assert!(start.elapsed() < Duration::from_secs(2));
}
