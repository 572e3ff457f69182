#![recursion_limit = "256"]
#![expect(
    clippy::multiple_crate_versions,
    reason = "transitive dependency duplication"
)]

use clap::{Parser, Subcommand};
use eyre::Context as _;
use std::io::{IsTerminal as _, Write as _};
use tracing_subscriber::prelude::*;

mod amount;
mod assembler;
mod auth;
mod chains;
mod cli_output;
mod config;
mod custody;
mod doctor;
mod envelope;
mod errors;
mod paths;
mod pendle;
mod retry;
mod rpc;
mod session;

#[cfg(test)]
mod test_support;

#[derive(Parser, Debug)]
#[command(name = "pendle-mcp", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve MCP over streamable HTTP (`POST /mcp`, `GET /health`).
    Serve {
        /// Override `server.port`.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Serve MCP over stdio (newline-delimited JSON-RPC).
    ///
    /// The caller is identified by `PENDLE_MCP_ACCESS_TOKEN` and `DEPLOYMENT_ID`.
    Stdio,

    /// Print a self-diagnostic report (safe to paste; contains no secrets).
    Doctor {
        /// Emit JSON to stdout (machine-readable).
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the MCP tool list as JSON.
    Tools,

    /// Print resolved paths (useful for debugging).
    Paths,
}

fn banner_enabled() -> bool {
    match std::env::var("PENDLE_MCP_BANNER") {
        Ok(v) => {
            let v = v.trim().to_ascii_lowercase();
            !(v.is_empty() || v == "0" || v == "false" || v == "no" || v == "off")
        }
        Err(_) => std::io::stderr().is_terminal(),
    }
}

fn init_logging(
    paths: &paths::PendlePaths,
    to_file: bool,
) -> eyre::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_filter(env_filter.clone());

    if !to_file {
        tracing_subscriber::registry().with(stderr_layer).init();
        return Ok(None);
    }

    paths.ensure_data_dir()?;
    let file_name = paths
        .log_file
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("pendle-mcp.log.jsonl");
    let file_appender = tracing_appender::rolling::never(&paths.data_dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(file_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(Some(guard))
}

fn print_json_line(v: &serde_json::Value, what: &str) -> eyre::Result<()> {
    let s = serde_json::to_string(v).with_context(|| format!("serialize {what}"))?;
    writeln!(std::io::stdout().lock(), "{s}").with_context(|| format!("write {what}"))
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    // A missing .env is the normal case.
    let _env_file = dotenvy::dotenv();
    let cli = Cli::parse();

    let paths = paths::PendlePaths::discover()?;

    match cli.cmd {
        Command::Serve { port } => {
            let mut cfg = config::PendleMcpConfig::load(&paths).context("load config")?;
            if let Some(port) = port {
                cfg.server.port = port;
            }
            let _log_guard = init_logging(&paths, cfg.log_to_file)?;
            if banner_enabled() {
                cli_output::print_banner(
                    env!("CARGO_PKG_VERSION"),
                    "http",
                    &format!("{}/mcp", cfg.server.public_base_url()),
                );
            }
            rpc::http::serve(&cfg).await.context("http server failed")
        }
        Command::Stdio => {
            let cfg = config::PendleMcpConfig::load(&paths).context("load config")?;
            let _log_guard = init_logging(&paths, cfg.log_to_file)?;
            if banner_enabled() {
                cli_output::print_banner(env!("CARGO_PKG_VERSION"), "stdio", "stdin/stdout");
            }
            rpc::mcp_server::run_stdio(&cfg)
                .await
                .context("stdio server failed")
        }
        Command::Doctor { json } => doctor::run(paths, json).context("doctor failed"),
        Command::Tools => print_json_line(&rpc::mcp_server::list_tools_result(), "tool list"),
        Command::Paths => print_json_line(
            &serde_json::json!({
              "config_dir": paths.config_dir,
              "data_dir": paths.data_dir,
              "log_file": paths.log_file,
              "config_file": paths.config_file(),
            }),
            "paths",
        ),
    }
}
