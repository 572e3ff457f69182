use super::{SignRequest, WalletCustody, WalletRecord};
use crate::{
    auth::{AuthContext, AuthorizationDetails},
    errors::PendleMcpError,
};
use alloy::primitives::Bytes;
use async_trait::async_trait;
use eyre::Context as _;
use secrecy::ExposeSecret as _;
use serde_json::Value;
use std::time::Duration;

const RECORDS_PATH: &str = "hub/wallet/records";
const SIGN_PATH: &str = "hub/wallet/evm/sign-transaction";

/// Wallet custody backed by the hub's HTTP API.
#[derive(Debug, Clone)]
pub struct HubCustody {
    http: reqwest::Client,
    base_url: String,
}

impl HubCustody {
    pub fn new(base_url: &str, timeout: Duration) -> eyre::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build hub http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn authed(&self, rb: reqwest::RequestBuilder, auth: &AuthContext) -> reqwest::RequestBuilder {
        rb.bearer_auth(auth.access_token.expose_secret())
            .header("X-Deployment-Id", auth.deployment_id.as_str())
    }

    async fn read_json(resp: reqwest::Response, what: &str) -> eyre::Result<Value> {
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            return Ok(body);
        }
        if matches!(status.as_u16(), 401 | 403) {
            if let Some(details) = authorization_details(&body) {
                return Err(PendleMcpError::AuthorizationRequired(details).into());
            }
        }
        let detail = body
            .get("error")
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("no error body");
        eyre::bail!("wallet hub {what} http {status}: {detail}")
    }
}

/// Extract an authorization gap from a hub error body, if it carries an authorization URL.
pub(super) fn authorization_details(body: &Value) -> Option<AuthorizationDetails> {
    let d: AuthorizationDetails = serde_json::from_value(body.clone()).ok()?;
    d.authorization_url.as_ref()?;
    Some(d)
}

pub(super) fn parse_records(body: Value) -> eyre::Result<Vec<WalletRecord>> {
    let list = match body {
        Value::Array(_) => body,
        Value::Object(mut m) => m
            .remove("walletRecords")
            .or_else(|| m.remove("data"))
            .unwrap_or(Value::Array(Vec::new())),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            eyre::bail!("unexpected wallet records payload")
        }
    };
    serde_json::from_value(list).context("decode wallet records")
}

pub(super) fn parse_signed(body: &Value) -> eyre::Result<Bytes> {
    let hex_str = body
        .get("signedTransaction")
        .or_else(|| body.pointer("/data/signedTransaction"))
        .and_then(Value::as_str)
        .ok_or_else(|| eyre::eyre!("sign response missing signedTransaction"))?;
    let raw = hex::decode(hex_str.trim_start_matches("0x"))
        .context("decode signed transaction hex")?;
    Ok(Bytes::from(raw))
}

#[async_trait]
impl WalletCustody for HubCustody {
    async fn wallet_records(&self, auth: &AuthContext) -> eyre::Result<Vec<WalletRecord>> {
        let resp = self
            .authed(self.http.get(self.url(RECORDS_PATH)), auth)
            .send()
            .await
            .context("fetch wallet records")?;
        parse_records(Self::read_json(resp, "wallet records").await?)
    }

    async fn sign_transaction(&self, auth: &AuthContext, req: &SignRequest) -> eyre::Result<Bytes> {
        let resp = self
            .authed(self.http.post(self.url(SIGN_PATH)), auth)
            .json(req)
            .send()
            .await
            .context("request transaction signature")?;
        parse_signed(&Self::read_json(resp, "sign transaction").await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn authorization_body_requires_url() {
        let body = json!({
            "error": "missing service",
            "authorizationUrl": "https://hub.example/connect",
            "missingService": "wallet",
            "availableServices": ["pendle"]
        });
        let d = authorization_details(&body);
        assert_eq!(d.as_ref().and_then(|d| d.missing_service.as_deref()), Some("wallet"));
        assert_eq!(d.map(|d| d.available_services), Some(vec!["pendle".to_owned()]));
        assert!(authorization_details(&json!({ "error": "forbidden" })).is_none());
    }

    #[test]
    fn records_accept_wrapped_or_bare_lists() -> eyre::Result<()> {
        let bare = parse_records(json!([{ "id": "a", "accounts": { "addresses": [] } }]))?;
        let wrapped = parse_records(json!({ "walletRecords": [{ "id": "b" }] }))?;
        let data = parse_records(json!({ "data": [] }))?;
        assert_eq!(bare.first().map(|r| r.id.as_str()), Some("a"));
        assert_eq!(wrapped.first().map(|r| r.id.as_str()), Some("b"));
        assert!(data.is_empty());
        assert!(parse_records(json!("nope")).is_err());
        Ok(())
    }

    #[test]
    fn signed_payload_is_hex_decoded() -> eyre::Result<()> {
        let b = parse_signed(&json!({ "signedTransaction": "0x02f8" }))?;
        assert_eq!(b.as_ref(), &[0x02, 0xf8]);
        let nested = parse_signed(&json!({ "data": { "signedTransaction": "beef" } }))?;
        assert_eq!(nested.as_ref(), &[0xbe, 0xef]);
        assert!(parse_signed(&json!({})).is_err());
        Ok(())
    }
}
