//! Command-line tests for the `markup-cleanup` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

use markup_cleanup::{Document, Settings};

fn bin_cmd() -> Command {
    Command::cargo_bin("markup-cleanup").expect("markup-cleanup built")
}

fn fixture(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(rel)
}

/// Copy the fixture workspace so the settings file can be rewritten.
fn workspace() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(tmp.path().join("rules")).expect("rules dir");
    for rel in [
        "settings.yaml",
        "segments.yaml",
        "rules/spelling.yaml",
        "rules/tags.yaml",
        "rules/legacy.yaml",
    ] {
        fs::copy(fixture(rel), tmp.path().join(rel)).expect("copy fixture");
    }
    tmp
}

#[test]
fn convert_writes_output_and_changes() {
    let tmp = workspace();
    let root = tmp.path();
    let output = root.join("out.yaml");
    let changes = root.join("reports").join("changes.yaml");

    bin_cmd()
        .arg("convert")
        .arg(root.join("segments.yaml"))
        .arg("--settings")
        .arg(root.join("settings.yaml"))
        .arg("--output")
        .arg(&output)
        .arg("--changes")
        .arg(&changes)
        .assert()
        .success()
        .stderr(predicate::str::contains("Changed: 4"));

    let converted = Document::load(&output).expect("output document");
    assert_eq!(converted.segments.len(), 6);
    assert_eq!(converted.segments[0].source, "Select a <i>Colour</i>");

    let report = fs::read_to_string(&changes).expect("change report");
    assert!(report.contains("generated_at:"));

    // The new placeholder is merged into the settings file
    let settings = Settings::load(&root.join("settings.yaml")).expect("settings");
    assert_eq!(settings.placeholders.len(), 2);
}

#[test]
fn convert_no_save_settings_leaves_settings_untouched() {
    let tmp = workspace();
    let root = tmp.path();
    let before = fs::read_to_string(root.join("settings.yaml")).expect("settings");

    bin_cmd()
        .arg("convert")
        .arg(root.join("segments.yaml"))
        .arg("--settings")
        .arg(root.join("settings.yaml"))
        .arg("--output")
        .arg(root.join("out.yaml"))
        .arg("--no-save-settings")
        .assert()
        .success();

    let after = fs::read_to_string(root.join("settings.yaml")).expect("settings");
    assert_eq!(before, after);
}

#[test]
fn convert_prints_to_stdout_with_extra_rules() {
    let tmp = workspace();
    let root = tmp.path();

    bin_cmd()
        .arg("convert")
        .arg(root.join("segments.yaml"))
        .arg("--settings")
        .arg(root.join("settings.yaml"))
        .arg("--rules")
        .arg(root.join("rules/legacy.yaml"))
        .arg("--no-save-settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("segments:"))
        .stdout(predicate::str::contains("Favorite COLOR"))
        // Runs created by a tag-pair rule are not revisited by later rules
        .stdout(predicate::str::contains("Select a <i>Colour</i>"));
}

#[test]
fn convert_rejects_invalid_locale() {
    let tmp = workspace();
    let root = tmp.path();

    bin_cmd()
        .arg("convert")
        .arg(root.join("segments.yaml"))
        .arg("--settings")
        .arg(root.join("settings.yaml"))
        .arg("--locale")
        .arg("not a locale")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid locale tag"));
}

#[test]
fn convert_missing_input_fails() {
    let tmp = workspace();

    bin_cmd()
        .arg("convert")
        .arg(tmp.path().join("missing.yaml"))
        .arg("--settings")
        .arg(tmp.path().join("settings.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to access"));
}

#[test]
fn check_rules_accepts_valid_files() {
    bin_cmd()
        .arg("check-rules")
        .arg(fixture("rules/spelling.yaml"))
        .arg(fixture("rules/tags.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"))
        .stdout(predicate::str::contains("Checked 2 file(s)"));
}

#[test]
fn check_rules_reports_invalid_file() {
    bin_cmd()
        .arg("check-rules")
        .arg(fixture("rules/spelling.yaml"))
        .arg(fixture("rules/invalid.yaml"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("failed"))
        .stdout(predicate::str::contains("item 1: Regular expression error"))
        .stdout(predicate::str::contains("item 2: search text is empty"))
        .stderr(predicate::str::contains("1 rule file(s) failed validation"));
}
