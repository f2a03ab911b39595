use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn version_over_the_pipe() {
    let home = tempdir().unwrap();
    Command::cargo_bin("mailseald")
        .unwrap()
        .arg("--pipe")
        .arg("--home")
        .arg(home.path())
        .write_stdin("{\"id\":1,\"method\":\"Version\"}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"version\":1"));
}

#[test]
fn key_info_for_unknown_address() {
    let home = tempdir().unwrap();
    Command::cargo_bin("mailseald")
        .unwrap()
        .arg("--pipe")
        .arg("--home")
        .arg(home.path())
        .write_stdin(
            "{\"id\":2,\"method\":\"GetKeyInfo\",\"params\":{\"address\":\"who@example.com\"}}\n",
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("\"has_key\":false"));
}

#[test]
fn key_info_with_malformed_key_id_is_an_error() {
    let home = tempdir().unwrap();
    Command::cargo_bin("mailseald")
        .unwrap()
        .arg("--pipe")
        .arg("--home")
        .arg(home.path())
        .write_stdin("{\"id\":3,\"method\":\"GetKeyInfo\",\"params\":{\"key_id\":\"not-hex\"}}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"error\"").and(predicate::str::contains("16 hex")));
}

#[test]
fn refuses_to_run_without_pipe() {
    let home = tempdir().unwrap();
    Command::cargo_bin("mailseald")
        .unwrap()
        .arg("--home")
        .arg(home.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--pipe"));
}

#[test]
fn generate_then_key_info_reports_secret_key() {
    let home = tempdir().unwrap();
    let requests = concat!(
        "{\"id\":1,\"method\":\"GenerateKeys\",\"params\":{\"real_name\":\"Test\",\"email\":\"t@example.com\"}}\n",
        "{\"id\":2,\"method\":\"GetKeyInfo\",\"params\":{\"address\":\"t@example.com\"}}\n",
    );
    Command::cargo_bin("mailseald")
        .unwrap()
        .arg("--pipe")
        .arg("--home")
        .arg(home.path())
        .write_stdin(requests)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"has_secret_key\":true")
                .and(predicate::str::contains("Test <t@example.com>")),
        );
}

#[test]
fn stdout_carries_only_protocol_lines() {
    let home = tempdir().unwrap();
    let output = Command::cargo_bin("mailseald")
        .unwrap()
        .arg("--pipe")
        .arg("--debug")
        .arg("--home")
        .arg(home.path())
        .write_stdin("{\"id\":1,\"method\":\"Version\"}\n")
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    for line in stdout.lines() {
        serde_json::from_str::<serde_json::Value>(line).expect("non-JSON line on stdout");
    }
    assert!(home.path().join("log").exists());
}
