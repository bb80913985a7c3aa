use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

use loopclose::ScanModel;

#[test]
fn synthetic_square_loop() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    let mut cmd = Command::cargo_bin("synthetic")?;
    cmd.arg(dir.path().join("model.xml"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Scan set with 6 scans"));

    Ok(())
}

#[test]
fn loopclose_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("model.xml");
    let output = dir.path().join("corrected.xml");

    let mut cmd = Command::cargo_bin("synthetic")?;
    cmd.arg(&input);
    cmd.assert().success();

    let mut cmd = Command::cargo_bin("loopclose")?;
    cmd.arg(&input).arg(&output);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("loading file"))
        .stdout(predicate::str::contains(
            "Loop between 1 (scan001) and 5 (scan005)",
        ));

    let before = ScanModel::from_file(&input)?;
    let after = ScanModel::from_file(&output)?;
    assert_eq!(after.num_scans(), 6);
    for (a, b) in after.scans.iter().zip(&before.scans) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.file, b.file);
    }
    // the loop-closure correction moved scans inside the loop
    assert_ne!(after.scans[5].pose, before.scans[5].pose);

    Ok(())
}

#[test]
fn loopclose_overrides_data_path() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("model.xml");
    let output = dir.path().join("corrected.xml");

    let mut cmd = Command::cargo_bin("synthetic")?;
    cmd.arg(&input);
    cmd.assert().success();

    let mut cmd = Command::cargo_bin("loopclose")?;
    cmd.arg(&input)
        .arg(&output)
        .arg("--data-path")
        .arg("corrected_data");
    cmd.assert().success();

    let after = ScanModel::from_file(&output)?;
    assert_eq!(after.data_path(), "corrected_data");

    Ok(())
}

#[test]
fn loopclose_no_args_prints_usage() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("loopclose")?;
    cmd.assert()
        .failure()
        .code(255)
        .stdout(predicate::str::contains("Usage"));

    Ok(())
}

#[test]
fn loopclose_wrong_model_count() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    let mut cmd = Command::cargo_bin("loopclose")?;
    cmd.arg(dir.path().join("a.xml"))
        .arg(dir.path().join("b.xml"))
        .arg(dir.path().join("c.xml"));
    cmd.assert().failure().code(254);

    Ok(())
}

#[test]
fn loopclose_missing_input_aborts() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    let mut cmd = Command::cargo_bin("loopclose")?;
    cmd.arg(dir.path().join("missing.xml"))
        .arg(dir.path().join("out.xml"));
    cmd.assert().failure();
    assert!(!dir.path().join("out.xml").exists());

    Ok(())
}

#[test]
fn check_prints_summary() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("model.xml");

    let mut cmd = Command::cargo_bin("synthetic")?;
    cmd.arg(&input);
    cmd.assert().success();

    let mut cmd = Command::cargo_bin("check")?;
    cmd.arg(&input);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("6 scans"))
        .stdout(predicate::str::contains("origin extent"));

    Ok(())
}
