use crate::errors::PendleMcpError;
use async_trait::async_trait;
use eyre::Context as _;
use serde_json::Value;
use std::time::Duration;

/// Remote yield-trading API: quotes and unsigned transactions for Pendle operations.
#[async_trait]
pub trait TradingApi: Send + Sync {
    /// GET `path` (relative to the API base, leading `/`) with `query` parameters.
    async fn get(&self, path: &str, query: &[(String, String)]) -> eyre::Result<Value>;
}

#[derive(Debug, Clone)]
pub struct PendleApi {
    http: reqwest::Client,
    base_url: String,
}

impl PendleApi {
    pub fn new(base_url: &str, timeout: Duration) -> eyre::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build pendle api http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }
}

/// Message for a non-2xx API response: the body's `error`, else `message`, else the status.
pub fn remote_error_message(status: u16, body: &Value) -> String {
    ["error", "message"]
        .iter()
        .find_map(|k| {
            body.get(*k)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
        })
        .map_or_else(|| format!("pendle api http {status}"), str::to_owned)
}

#[async_trait]
impl TradingApi for PendleApi {
    async fn get(&self, path: &str, query: &[(String, String)]) -> eyre::Result<Value> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(path, params = query.len(), "pendle api request");
        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("fetch {path}"))?;
        let status = resp.status();
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            let message = remote_error_message(status.as_u16(), &body);
            return Err(PendleMcpError::RemoteApi(message).into());
        }
        resp.json()
            .await
            .with_context(|| format!("decode {path} json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_field_wins() {
        let body = json!({ "error": "market not expired", "message": "Bad Request" });
        assert_eq!(remote_error_message(400, &body), "market not expired");
    }

    #[test]
    fn message_is_fallback_then_status() {
        assert_eq!(
            remote_error_message(422, &json!({ "message": "invalid slippage" })),
            "invalid slippage"
        );
        assert_eq!(remote_error_message(502, &Value::Null), "pendle api http 502");
        assert_eq!(remote_error_message(500, &json!({ "error": "" })), "pendle api http 500");
    }
}
