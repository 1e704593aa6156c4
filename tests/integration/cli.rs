//! End-to-end tests for the `dagrun` binary's command-line surface.

use std::fs;
use std::path::Path;
use std::time::Duration;

use assert_cmd::Command;

fn write_config(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("dagrun.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn runs_a_config_to_completion_and_prints_a_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[task]]
name = "setup"
cmd = "echo hello"

[[task]]
name = "build"
cmd = "echo world"
depends_on = ["setup"]
"#,
    );

    let assert = Command::cargo_bin("dagrun")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .timeout(Duration::from_secs(10))
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("setup"));
    assert!(stdout.contains("build"));
    assert!(stdout.contains("TASK"));
}

#[test]
fn missing_config_file_exits_nonzero_with_a_readable_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.toml");

    let assert = Command::cargo_bin("dagrun")
        .unwrap()
        .arg("--config")
        .arg(&missing)
        .timeout(Duration::from_secs(10))
        .assert()
        .failure();

    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("error:"));
}

#[test]
fn dependency_cycle_exits_nonzero() {
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

    Command::cargo_bin("dagrun")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .timeout(Duration::from_secs(10))
        .assert()
        .failure();
}

#[test]
fn accepts_a_numeric_log_level_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[task]]
name = "noop"
cmd = "true"
"#,
    );

    Command::cargo_bin("dagrun")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("--log-level")
        .arg("2")
        .timeout(Duration::from_secs(10))
        .assert()
        .success();
}

#[test]
fn defaults_to_dagrun_toml_in_the_current_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        r#"
[[task]]
name = "only"
cmd = "true"
"#,
    );

    Command::cargo_bin("dagrun")
        .unwrap()
        .current_dir(dir.path())
        .timeout(Duration::from_secs(10))
        .assert()
        .success();
}
