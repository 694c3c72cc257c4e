use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("glint")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("stream"))
        .stdout(predicate::str::contains("replay"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_stream_help_shows_options() {
    cargo_bin_cmd!("glint")
        .args(["stream", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--prompt"))
        .stdout(predicate::str::contains("--endpoint"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn test_replay_rejects_zero_chunk_size() {
    cargo_bin_cmd!("glint")
        .args(["replay", "-", "--chunk-size", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunk-size"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("glint")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}
