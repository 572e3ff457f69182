use crate::{
    config::{process_env, PendleMcpConfig},
    paths::PendlePaths,
    rpc::mcp_server::list_tools_result,
};
use eyre::Context as _;
use serde_json::{json, Value};
use std::path::PathBuf;

struct ConfigReport {
    path: PathBuf,
    exists: bool,
    parse_ok: bool,
    valid: bool,
    error: Option<String>,
}

struct DoctorReport {
    version: &'static str,
    paths: PendlePaths,
    config: ConfigReport,
    effective: Value,
    tool_count: usize,
}

/// Resolved settings with every secret reduced to whether it is set.
fn effective_settings(cfg: &PendleMcpConfig) -> Value {
    let chains: Vec<Value> = cfg
        .rpc
        .evm_rpc_urls
        .iter()
        .map(|(chain, urls)| json!({ "chain_id": chain, "endpoints": urls.len() }))
        .collect();
    json!({
      "hub": {
        "base_url": cfg.hub.base_url,
        "oauth_client_id_set": !cfg.hub.oauth_client_id.trim().is_empty(),
        "oauth_client_secret_set": cfg.hub.oauth_client_secret.is_some(),
        "deployment_id": cfg.hub.deployment_id,
        "access_token_set": cfg.hub.access_token.is_some(),
        "timeout_seconds": cfg.hub.timeout_seconds,
      },
      "server": {
        "host": cfg.server.host,
        "port": cfg.server.port,
        "public_base_url": cfg.server.public_base_url(),
        "database_url_set": cfg.server.database_url.is_some(),
      },
      "pendle": {
        "api_base_url": cfg.pendle.api_base_url,
        "router_address": cfg.pendle.router_address,
        "default_chain_id": cfg.pendle.default_chain_id,
        "timeout_seconds": cfg.pendle.timeout_seconds,
      },
      "tx": { "gas_limit": cfg.tx.gas_limit },
      "rpc": { "retry_rounds": cfg.rpc.retry_rounds, "chains": chains },
      "log_to_file": cfg.log_to_file,
    })
}

fn collect(paths: PendlePaths) -> DoctorReport {
    let path = paths.config_file();
    let exists = path.exists();
    let (parse_ok, mut error, mut cfg) = match PendleMcpConfig::from_file_or_default(&paths) {
        Ok(cfg) => (true, None, cfg),
        Err(e) => (false, Some(format!("{e:#}")), PendleMcpConfig::default()),
    };

    let valid = match cfg.apply_env(&process_env()).and_then(|()| cfg.validate()) {
        Ok(()) => parse_ok,
        Err(e) => {
            error.get_or_insert_with(|| format!("{e:#}"));
            false
        }
    };

    let tool_count = list_tools_result()
        .get("tools")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);

    DoctorReport {
        version: env!("CARGO_PKG_VERSION"),
        effective: effective_settings(&cfg),
        paths,
        config: ConfigReport {
            path,
            exists,
            parse_ok,
            valid,
            error,
        },
        tool_count,
    }
}

fn print_json(out: &mut impl std::io::Write, r: &DoctorReport) -> eyre::Result<()> {
    let s = serde_json::to_string_pretty(&json!({
      "ok": r.config.valid,
      "version": r.version,
      "paths": {
        "config_dir": r.paths.config_dir,
        "data_dir": r.paths.data_dir,
        "log_file": r.paths.log_file,
      },
      "config": {
        "path": r.config.path,
        "exists": r.config.exists,
        "parse_ok": r.config.parse_ok,
        "valid": r.config.valid,
        "error": r.config.error,
        "effective": r.effective,
      },
      "tools": r.tool_count,
    }))
    .context("serialize doctor json")?;
    writeln!(out, "{s}").context("write doctor json")?;
    Ok(())
}

fn print_human(out: &mut impl std::io::Write, r: &DoctorReport) -> eyre::Result<()> {
    writeln!(out, "pendle-mcp doctor (v{})", r.version).context("write header")?;
    writeln!(out).context("write newline")?;

    writeln!(out, "Paths:").context("write paths header")?;
    writeln!(out, "  config_dir: {}", r.paths.config_dir.display()).context("write paths")?;
    writeln!(out, "  data_dir:   {}", r.paths.data_dir.display()).context("write paths")?;
    writeln!(out, "  log_file:   {}", r.paths.log_file.display()).context("write paths")?;
    writeln!(out).context("write newline")?;

    writeln!(out, "Config:").context("write config header")?;
    writeln!(out, "  config.toml: {}", r.config.path.display()).context("write config")?;
    let status = if !r.config.parse_ok {
        "parse failed"
    } else if !r.config.valid {
        "invalid"
    } else if r.config.exists {
        "ok"
    } else {
        "missing (defaults + environment)"
    };
    writeln!(out, "  status: {status}").context("write config")?;
    if let Some(e) = &r.config.error {
        let first = e.lines().next().unwrap_or("config error");
        writeln!(out, "  error: {first}").context("write config")?;
    }
    writeln!(out).context("write newline")?;

    writeln!(out, "Effective settings (secrets redacted):").context("write settings header")?;
    let pretty = serde_json::to_string_pretty(&r.effective).context("serialize settings")?;
    for line in pretty.lines() {
        writeln!(out, "  {line}").context("write settings")?;
    }
    writeln!(out).context("write newline")?;

    writeln!(out, "Tools: {}", r.tool_count).context("write tools")?;
    Ok(())
}

/// Offline self-diagnostic: never contacts the hub, the trading API or any RPC endpoint.
pub fn run(paths: PendlePaths, as_json: bool) -> eyre::Result<()> {
    let report = collect(paths);
    let mut out = std::io::stdout().lock();
    if as_json {
        print_json(&mut out, &report)
    } else {
        print_human(&mut out, &report)
    }
}
