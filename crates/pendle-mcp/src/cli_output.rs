//! Centralised helpers for user-facing CLI output written to stderr.

use std::io::Write as _;

fn stderr_writeln(s: &str) {
    let mut stderr = std::io::stderr().lock();
    if stderr.write_all(s.as_bytes()).is_err() {
        return;
    }
    if stderr.write_all(b"\n").is_err() {
        return;
    }
    let _flush = stderr.flush();
}

/// Startup banner for human operators. Stdout stays reserved for MCP frames.
pub fn print_banner(version: &str, transport: &str, endpoint: &str) {
    stderr_writeln(&format!(
        "pendle-mcp\n==========\nVersion   : v{version}\nTransport : {transport}\nEndpoint  : {endpoint}\n\nTip: run `pendle-mcp doctor` to inspect the resolved configuration."
    ));
}
