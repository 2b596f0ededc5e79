//! Integration tests for the emsbill binary.
//!
//! These tests verify end-to-end behavior including:
//! - Record add/update against real table files
//! - Monthly submission file generation
//! - Reconciliation of a ministry response file
//! - Recall flag propagation

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory seeded with the standard tables
fn setup_data_dir() -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path();

    fs::write(
        dir.join("billing_codes.csv"),
        "A001,2018-01-01,33.70\nB102,2018-03-12,102.35\n",
    )
    .unwrap();
    fs::write(dir.join("appointments.csv"), "3,7,2023-05-10,0\n").unwrap();
    fs::write(dir.join("patients.csv"), "7,John,Smith,1234567890,M\n").unwrap();

    temp_dir
}

/// Helper to get the path to the CLI binary
fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("emsbill"));
    cmd.arg("--data-dir").arg(data_dir);
    cmd
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("emsbill"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Clinic billing and ministry reconciliation",
        ));
}

#[test]
fn test_add_record_persists_to_table() {
    let temp_dir = setup_data_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["add", "--appointment", "3", "--patient", "7", "--code", "a001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added billing record 1"));

    let table = fs::read_to_string(dir.join("appointment_bills.csv")).unwrap();
    assert_eq!(table, "1,3,7,A001\n");
}

#[test]
fn test_add_record_rejects_unknown_code() {
    let temp_dir = setup_data_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["add", "--appointment", "3", "--patient", "7", "--code", "Z999"])
        .assert()
        .failure();

    assert!(!dir.join("appointment_bills.csv").exists());
}

#[test]
fn test_update_record_keeps_record_id() {
    let temp_dir = setup_data_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["add", "--appointment", "3", "--patient", "7", "--code", "A001"])
        .assert()
        .success();

    cli(dir)
        .args([
            "update", "--record", "1", "--appointment", "5", "--patient", "9", "--code", "B102",
        ])
        .assert()
        .success();

    let table = fs::read_to_string(dir.join("appointment_bills.csv")).unwrap();
    assert_eq!(table, "1,5,9,B102\n");
}

#[test]
fn test_update_unknown_record_fails() {
    let temp_dir = setup_data_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args([
            "update", "--record", "42", "--appointment", "5", "--patient", "9", "--code", "B102",
        ])
        .assert()
        .failure();
}

#[test]
fn test_remove_record() {
    let temp_dir = setup_data_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["add", "--appointment", "3", "--patient", "7", "--code", "A001"])
        .assert()
        .success();
    cli(dir)
        .args(["remove", "--record", "1"])
        .assert()
        .success();

    let table = fs::read_to_string(dir.join("appointment_bills.csv")).unwrap();
    assert!(table.is_empty());
}

#[test]
fn test_generate_writes_fixed_width_submission() {
    let temp_dir = setup_data_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["add", "--appointment", "3", "--patient", "7", "--code", "A001"])
        .assert()
        .success();

    cli(dir)
        .args(["generate", "2023", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("202305MonthlyBillingFile"));

    let submission = fs::read_to_string(dir.join("202305MonthlyBillingFile")).unwrap();
    assert_eq!(submission, "202305101234567890MA00100000337000\n");
}

#[test]
fn test_reconcile_prints_summary_lines() {
    let temp_dir = setup_data_dir();
    let dir = temp_dir.path();

    let response = dir.join("202305govFile.txt");
    fs::write(
        &response,
        "1,1234567890,M,A001,500000,PAID\n2,1234567890,M,B102,200000,FHCV\n",
    )
    .unwrap();

    cli(dir)
        .arg("reconcile")
        .arg(&response)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total Billed : 70.00"))
        .stdout(predicate::str::contains("Total Received : 50.00"))
        .stdout(predicate::str::contains("Received Percentage : 71.43"))
        .stdout(predicate::str::contains("Number of Follow Ups : 1"))
        .stdout(predicate::str::contains("2 - Smith,John - B102"));
}

#[test]
fn test_reconcile_json_output() {
    let temp_dir = setup_data_dir();
    let dir = temp_dir.path();

    let response = dir.join("202305govFile.txt");
    fs::write(&response, "1,1234567890,M,A001,500000,PAID\n").unwrap();

    cli(dir)
        .arg("reconcile")
        .arg(&response)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_encounters\": 1"));
}

#[test]
fn test_summary_resolves_conventional_filename() {
    let temp_dir = setup_data_dir();
    let dir = temp_dir.path();

    fs::write(
        dir.join("202305govFile.txt"),
        "1,1234567890,M,A001,500000,PAID\n",
    )
    .unwrap();

    cli(dir)
        .args(["summary", "202305"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total Billed : 50.00"));
}

#[test]
fn test_flag_appointment_updates_table() {
    let temp_dir = setup_data_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["flag", "--appointment", "3"])
        .assert()
        .success();

    let table = fs::read_to_string(dir.join("appointments.csv")).unwrap();
    assert_eq!(table, "3,7,2023-05-10,1\n");
}

#[test]
fn test_flag_unknown_appointment_fails() {
    let temp_dir = setup_data_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["flag", "--appointment", "99"])
        .assert()
        .failure();
}

#[test]
fn test_check_code() {
    let temp_dir = setup_data_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["check-code", "PAID"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is a valid response code"));

    cli(dir)
        .args(["check-code", "paid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is not a valid response code"));
}
