use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn harness() -> Command {
    let mut cmd = Command::new(cargo_bin!());
    cmd.env_remove("CONFIG_PATH")
        .env_remove("MINT_BASE_URL")
        .env_remove("MINT_ENVIRONMENT")
        .env("MINT_API_KEY", "test-key")
        .env("LOG_LEVEL", "error");
    cmd
}

#[test]
fn test_missing_required_argument_prints_usage() -> Result<(), Box<dyn std::error::Error>> {
    harness()
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));

    Ok(())
}

#[test]
fn test_unknown_command_exits_with_one() -> Result<(), Box<dyn std::error::Error>> {
    harness()
        .arg("launch-rocket")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));

    Ok(())
}

#[test]
fn test_help_exits_cleanly() -> Result<(), Box<dyn std::error::Error>> {
    harness()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("express-route"))
        .stdout(predicate::str::contains("business-payout"));

    Ok(())
}

#[test]
fn test_plain_http_base_url_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    harness()
        .env("MINT_BASE_URL", "http://127.0.0.1:9")
        .arg("balance")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("HTTPS"));

    Ok(())
}

#[test]
fn test_invalid_amount_fails_before_network() -> Result<(), Box<dyn std::error::Error>> {
    // 金额校验先于任何网络请求
    harness()
        .env("MINT_BASE_URL", "https://127.0.0.1:9")
        .args(["business-transfer", "rcp-1", "abc"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("validation failed"));

    Ok(())
}
