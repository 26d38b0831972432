use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("banking-ledger"));
    cmd.arg("tests/fixtures/operations.csv");

    // alice: 1000 + 500 - 300, entries: opening, deposit, transfer
    // bob: 500 + 300 - 100.5, entries: opening, transfer, withdraw
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("name,id,balance,entries"))
        .stdout(predicate::str::is_match(r"(?m)^alice,[0-9a-f-]{36},1200,3\r?$")?)
        .stdout(predicate::str::is_match(r"(?m)^bob,[0-9a-f-]{36},699.5,3\r?$")?);

    Ok(())
}

#[test]
fn test_cli_rejects_invalid_lock_budget() {
    let mut cmd = Command::new(cargo_bin!("banking-ledger"));
    cmd.arg("tests/fixtures/operations.csv")
        .arg("--lock-attempts")
        .arg("0");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Lock attempts must be at least 1"));
}
