use crate::{
    auth::{self, CallAuth},
    config::PendleMcpConfig,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::{info, warn};

mod jsonrpc;
mod state;
mod tools;
mod transport;

pub use jsonrpc::{err, ok, JsonRpcResponse};
pub use state::SharedState;
pub use tools::{list_tools_result, Dispatcher, ToolSettings};

pub const MAX_JSONRPC_LINE_BYTES: usize = 1_000_000;
pub const PROTOCOL_VERSION: &str = "2025-06-18";

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

fn initialize_result() -> Value {
    json!({
      "protocolVersion": PROTOCOL_VERSION,
      "serverInfo": { "name": "pendle-mcp", "version": env!("CARGO_PKG_VERSION") },
      "capabilities": { "tools": {} }
    })
}

/// Handle one inbound JSON-RPC message. Notifications and unparseable messages yield `None`.
pub async fn handle_message(
    shared: &SharedState,
    msg: Value,
    auth: &CallAuth,
) -> Option<JsonRpcResponse> {
    // Ignore notifications (no "id").
    if msg.get("id").is_none() {
        return None;
    }

    let req: JsonRpcRequest = match serde_json::from_value(msg) {
        Ok(parsed_req) => parsed_req,
        Err(e) => {
            warn!(error = %e, "failed to parse jsonrpc request");
            return None;
        }
    };

    if req.jsonrpc != "2.0" {
        return Some(err(req.id, jsonrpc::INVALID_REQUEST, "invalid jsonrpc version"));
    }

    let resp = match req.method.as_str() {
        "initialize" => ok(req.id, initialize_result()),
        "ping" => ok(req.id, json!({})),
        "tools/list" => ok(req.id, list_tools_result()),
        "tools/call" => {
            let Some(name) = req.params.get("name").and_then(Value::as_str) else {
                return Some(err(req.id, jsonrpc::INVALID_PARAMS, "missing tool name"));
            };
            let args = req
                .params
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| json!({}));
            let envelope = shared.dispatcher.call(name, &args, auth).await;
            ok(req.id, envelope.into_call_tool_result())
        }
        _ => err(req.id, jsonrpc::METHOD_NOT_FOUND, "method not found"),
    };
    Some(resp)
}

/// Newline-delimited JSON-RPC over stdin/stdout.
///
/// The caller identity is fixed for the process: token and deployment from config, plus a
/// fresh session id.
pub async fn run_stdio(cfg: &PendleMcpConfig) -> eyre::Result<()> {
    let shared = SharedState::from_config(cfg)?;
    let session_id = uuid::Uuid::new_v4().to_string();
    let auth = auth::resolve_static(&shared.hub, &shared.public_base_url, &session_id);
    info!(
        session_id = %session_id,
        authenticated = auth.session_id().is_some(),
        "stdio session started"
    );

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = stdin.next_line().await? {
        if line.len() > MAX_JSONRPC_LINE_BYTES {
            warn!(bytes = line.len(), "jsonrpc line too large; closing");
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let v: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "invalid json on stdin");
                continue;
            }
        };
        if let Some(resp) = handle_message(&shared, v, &auth).await {
            transport::write_frame(&mut stdout, &resp).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::HubConfig,
        test_support::{auth_ctx, shared_state, FakeApi, FakeCustody, WALLET},
    };

    fn shared() -> eyre::Result<SharedState> {
        shared_state(
            FakeCustody::with_wallets(&[("rec-1", WALLET)]),
            FakeApi::default(),
            HubConfig::default(),
        )
    }

    #[tokio::test]
    async fn notifications_get_no_response() -> eyre::Result<()> {
        let s = shared()?;
        let resp = handle_message(
            &s,
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
            &CallAuth::Missing,
        )
        .await;
        assert!(resp.is_none(), "notification answered: {resp:?}");
        Ok(())
    }

    #[tokio::test]
    async fn initialize_and_list() -> eyre::Result<()> {
        let s = shared()?;
        let init = handle_message(
            &s,
            json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }),
            &CallAuth::Missing,
        )
        .await
        .and_then(|r| r.result)
        .unwrap_or_default();
        assert_eq!(
            init.pointer("/serverInfo/name").and_then(Value::as_str),
            Some("pendle-mcp")
        );

        let list = handle_message(
            &s,
            json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
            &CallAuth::Missing,
        )
        .await
        .and_then(|r| r.result)
        .unwrap_or_default();
        let names: Vec<&str> = list
            .get("tools")
            .and_then(Value::as_array)
            .map(|ts| ts.iter().filter_map(|t| t.get("name")?.as_str()).collect())
            .unwrap_or_default();
        assert!(names.contains(&"swap_pt"), "names: {names:?}");
        Ok(())
    }

    #[tokio::test]
    async fn tool_failures_are_results_not_jsonrpc_errors() -> eyre::Result<()> {
        let s = shared()?;
        let resp = handle_message(
            &s,
            json!({
                "jsonrpc": "2.0", "id": "c1", "method": "tools/call",
                "params": { "name": "get_markets", "arguments": {} }
            }),
            &CallAuth::Missing,
        )
        .await;
        let Some(resp) = resp else {
            eyre::bail!("tools/call must be answered");
        };
        assert!(resp.error.is_none(), "no jsonrpc error: {resp:?}");
        let result = resp.result.unwrap_or_default();
        assert_eq!(result.get("isError"), Some(&Value::Bool(true)));
        assert_eq!(
            result.pointer("/content/0/text").and_then(Value::as_str),
            Some("Error: No token or context found")
        );
        Ok(())
    }

    #[tokio::test]
    async fn choose_wallet_over_jsonrpc() -> eyre::Result<()> {
        let s = shared()?;
        let auth = CallAuth::Ready(auth_ctx("sess-9"));
        let resp = handle_message(
            &s,
            json!({
                "jsonrpc": "2.0", "id": 3, "method": "tools/call",
                "params": { "name": "choose_wallet", "arguments": { "address": WALLET } }
            }),
            &auth,
        )
        .await
        .and_then(|r| r.result)
        .unwrap_or_default();
        assert_eq!(
            resp.pointer("/structuredContent/data/walletRecordId").and_then(Value::as_str),
            Some("rec-1")
        );
        Ok(())
    }

    #[tokio::test]
    async fn unknown_method_and_bad_version() -> eyre::Result<()> {
        let s = shared()?;
        let unknown = handle_message(
            &s,
            json!({ "jsonrpc": "2.0", "id": 4, "method": "resources/list" }),
            &CallAuth::Missing,
        )
        .await
        .and_then(|r| r.error)
        .map(|e| e.code);
        assert_eq!(unknown, Some(jsonrpc::METHOD_NOT_FOUND));

        let bad = handle_message(
            &s,
            json!({ "jsonrpc": "1.0", "id": 5, "method": "ping" }),
            &CallAuth::Missing,
        )
        .await
        .and_then(|r| r.error)
        .map(|e| e.code);
        assert_eq!(bad, Some(jsonrpc::INVALID_REQUEST));
        Ok(())
    }
}
