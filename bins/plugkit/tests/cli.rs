//! End-to-end checks of the CLI surface that need neither an Android
//! SDK nor a device.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn build_without_manifest_reports_config_error() {
    let temp = tempfile::TempDir::new().unwrap();

    Command::cargo_bin("plugkit")
        .unwrap()
        .current_dir(temp.path())
        .args(["build", "--no-color"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Project manifest not found"));
}

#[test]
fn updater_json_aggregates_modules() {
    let temp = tempfile::TempDir::new().unwrap();
    let module = temp.path().join("HideTyping");
    std::fs::create_dir_all(&module).unwrap();
    std::fs::write(
        module.join("plugkit.toml"),
        "[plugin]\nname = \"HideTyping\"\nversion = \"1.2.0\"\n",
    )
    .unwrap();

    Command::cargo_bin("plugkit")
        .unwrap()
        .current_dir(temp.path())
        .args(["updater-json", "--no-color"])
        .assert()
        .success();

    let feed = std::fs::read_to_string(temp.path().join("build/updater.json")).unwrap();
    assert!(feed.contains("HideTyping"));
    assert!(feed.contains("1.2.0"));
}

#[test]
fn clean_without_outputs_succeeds() {
    let temp = tempfile::TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("plugkit.toml"),
        "[plugin]\nname = \"P\"\nversion = \"1.0.0\"\n",
    )
    .unwrap();

    Command::cargo_bin("plugkit")
        .unwrap()
        .current_dir(temp.path())
        .args(["clean", "--no-color"])
        .assert()
        .success();
}
