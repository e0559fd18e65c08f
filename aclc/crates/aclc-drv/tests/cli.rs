//! CLI surface tests for the `aclc` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn aclc() -> Command {
    Command::cargo_bin("aclc").unwrap()
}

#[test]
fn test_clean_module_exits_zero() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ok.accele");
    fs::write(&path, "fun main() -> Int = 0\n").unwrap();

    aclc().arg(&path).assert().success();
}

#[test]
fn test_syntax_error_exits_one_with_code() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.accele");
    fs::write(&path, "fun ] nope\n").unwrap();

    aclc()
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error[ACL"))
        .stderr(predicate::str::contains("bad:1:"));
}

#[test]
fn test_semantic_error_exits_one() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sem.accele");
    fs::write(&path, "fun main() {\n    missing()\n}\n").unwrap();

    aclc()
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unresolved-symbol"));
}

#[test]
fn test_missing_file_reports_driver_error() {
    aclc()
        .arg("definitely-not-here.accele")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read module"));
}

#[test]
fn test_no_warn_flag_silences_warning() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("locked.accele");
    fs::write(&path, "var x = 1\n@srclock\n").unwrap();

    // The misplaced @srclock warns by default...
    aclc()
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("nonfronted-source-lock"));

    // ...and is silenced by id with --no-warn.
    aclc()
        .arg(&path)
        .arg("--no-warn")
        .arg("nonfronted-source-lock")
        .assert()
        .success()
        .stderr(predicate::str::contains("nonfronted-source-lock").not());
}

#[test]
fn test_import_dir_flag() {
    let dir = TempDir::new().unwrap();
    let libs = dir.path().join("libs");
    fs::create_dir_all(&libs).unwrap();
    fs::write(libs.join("dep.accele"), "fun provided() -> Int = 1\n").unwrap();

    let path = dir.path().join("main.accele");
    fs::write(&path, "import dep\n\nfun main() -> Int = provided()\n").unwrap();

    aclc().arg(&path).arg("-I").arg(&libs).assert().success();
}

#[test]
fn test_multiple_inputs() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.accele");
    let b = dir.path().join("b.accele");
    fs::write(&a, "fun fa() -> Int = 1\n").unwrap();
    fs::write(&b, "fun fb() -> Int = 2\n").unwrap();

    aclc().arg(&a).arg(&b).assert().success();
}
