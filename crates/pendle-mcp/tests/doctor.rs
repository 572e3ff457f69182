use assert_cmd::Command;
use eyre::Context as _;
use predicates::prelude::*;
use serde_json::Value;

#[test]
fn doctor_json_runs_and_redacts_secrets() -> eyre::Result<()> {
    let exe = assert_cmd::cargo::cargo_bin!("pendle-mcp");

    let cfg_dir = tempfile::tempdir()?;
    let data_dir = tempfile::tempdir()?;
    std::fs::write(
        cfg_dir.path().join("config.toml"),
        "[pendle]\ndefault_chain_id = \"42161\"\n\n[tx]\ngas_limit = 900000\n",
    )?;

    let assert = Command::new(exe)
        .env("PENDLE_MCP_CONFIG_DIR", cfg_dir.path())
        .env("PENDLE_MCP_DATA_DIR", data_dir.path())
        .env("PENDLE_MCP_ACCESS_TOKEN", "tok-do-not-print")
        .args(["doctor", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tok-do-not-print").not())
        .stdout(predicate::str::contains("\"access_token_set\": true"));
    let out = assert.get_output();

    let v: Value = serde_json::from_slice(&out.stdout).context("parse doctor json")?;
    assert!(v.get("version").and_then(Value::as_str).is_some(), "version");
    assert_eq!(v.pointer("/config/exists"), Some(&Value::Bool(true)), "config file seen");
    assert_eq!(
        v.pointer("/config/effective/pendle/default_chain_id").and_then(Value::as_str),
        Some("42161"),
        "file value applied"
    );
    assert_eq!(
        v.pointer("/config/effective/tx/gas_limit").and_then(Value::as_u64),
        Some(900_000),
        "gas limit from file"
    );
    assert_eq!(
        v.pointer("/config/effective/hub/access_token_set"),
        Some(&Value::Bool(true)),
        "token reported as set"
    );
    Ok(())
}

#[test]
fn tools_lists_every_operation() -> eyre::Result<()> {
    let exe = assert_cmd::cargo::cargo_bin!("pendle-mcp");
    let assert = Command::new(exe)
        .arg("tools")
        .assert()
        .success()
        .stdout(
            predicate::str::starts_with("{").and(predicate::str::contains("\"inputSchema\"")),
        );
    let out = assert.get_output();

    let v: Value = serde_json::from_slice(&out.stdout).context("parse tool list")?;
    let names: Vec<&str> = v
        .get("tools")
        .and_then(Value::as_array)
        .map(|ts| ts.iter().filter_map(|t| t.get("name")?.as_str()).collect())
        .unwrap_or_default();
    for expected in [
        "choose_wallet",
        "approve_token",
        "swap_pt",
        "transfer_liquidity",
        "get_markets",
    ] {
        assert!(names.contains(&expected), "{expected} missing from {names:?}");
    }
    Ok(())
}
