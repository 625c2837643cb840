use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn cli_help_runs() {
    let mut cmd = Command::cargo_bin("rs-bag2image").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn extract_help_lists_options() {
    let mut cmd = Command::cargo_bin("rs-bag2image").unwrap();
    cmd.args(["extract", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--quality"))
        .stdout(predicate::str::contains("--scaling"))
        .stdout(predicate::str::contains("--display"));
}

#[test]
fn missing_bag_is_a_startup_error() {
    let dir = tempfile::tempdir().unwrap();
    let bag = dir.path().join("absent.bag");
    let mut cmd = Command::cargo_bin("rs-bag2image").unwrap();
    cmd.args(["extract", "--bag"])
        .arg(&bag)
        .assert()
        .failure()
        .stderr(predicate::str::contains("can't find input bag file"));
    assert!(!dir.path().join("absent").exists());
}

#[test]
fn wrong_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("capture.mp4");
    std::fs::write(&input, b"not a bag").unwrap();
    let mut cmd = Command::cargo_bin("rs-bag2image").unwrap();
    cmd.args(["extract", "-b"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("can't find input bag file"));
}

#[test]
fn formats_lists_streams() {
    let mut cmd = Command::cargo_bin("rs-bag2image").unwrap();
    cmd.arg("formats")
        .assert()
        .success()
        .stdout(predicate::str::contains("YUYV"))
        .stdout(predicate::str::contains("UYVY"))
        .stdout(predicate::str::contains("GRAY16"));
}

#[test]
fn validate_empty_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("rs-bag2image").unwrap();
    cmd.arg("validate")
        .arg(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("FAILED"));
}
