//! Per-call identity: who is calling, under which session and deployment.
//!
//! Token issuance and session storage live in the external hub; this module only turns what a
//! transport saw (headers, process config) into a [`CallAuth`] the dispatcher can check.

use crate::{config::HubConfig, errors::PendleMcpError};
use secrecy::{ExposeSecret as _, SecretString};
use eyre::Context as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Route on this server that receives the hub's OAuth redirect.
pub const CALLBACK_PATH: &str = "/callback";

/// Structured payload of an authorization gap reported by the hub or detected locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDetails {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub authorization_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub available_services: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub missing_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deployment_id: Option<String>,
}

#[derive(Debug)]
pub struct AuthContext {
    pub access_token: SecretString,
    pub session_id: String,
    pub deployment_id: String,
}

#[derive(Debug)]
pub enum CallAuth {
    Ready(AuthContext),
    Missing,
    Required(AuthorizationDetails),
}

impl CallAuth {
    pub fn require(&self) -> Result<&AuthContext, PendleMcpError> {
        match self {
            Self::Ready(ctx) => Ok(ctx),
            Self::Missing => Err(PendleMcpError::NoAuthContext),
            Self::Required(details) => Err(PendleMcpError::AuthorizationRequired(details.clone())),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Ready(ctx) => Some(ctx.session_id.as_str()),
            Self::Missing | Self::Required(_) => None,
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|v| !v.is_empty())
}

/// Hub authorization entry point for this server's OAuth client, if one is configured.
pub fn authorization_url(hub: &HubConfig, public_base_url: &str) -> Option<String> {
    let client_id = non_empty(Some(hub.oauth_client_id.as_str()))?;
    let base = hub.base_url.trim_end_matches('/');
    let mut url = reqwest::Url::parse(&format!("{base}/oauth/authorize")).ok()?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", &redirect_uri(public_base_url));
    Some(url.into())
}

pub fn redirect_uri(public_base_url: &str) -> String {
    format!("{}{CALLBACK_PATH}", public_base_url.trim_end_matches('/'))
}

/// Token issued by the hub for an authorization code.
#[derive(Debug, Deserialize)]
pub struct TokenGrant {
    pub access_token: SecretString,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

fn token_error_detail(body: &serde_json::Value) -> &str {
    ["error_description", "error", "message"]
        .iter()
        .find_map(|k| body.get(*k).and_then(serde_json::Value::as_str))
        .unwrap_or("no error body")
}

/// Exchange an authorization code at the hub's token endpoint.
pub async fn exchange_code(
    hub: &HubConfig,
    public_base_url: &str,
    code: &str,
) -> eyre::Result<TokenGrant> {
    let client_id = non_empty(Some(hub.oauth_client_id.as_str()))
        .ok_or_else(|| eyre::eyre!("oauth client id is not configured"))?;
    let mut form = vec![
        ("grant_type", "authorization_code".to_owned()),
        ("code", code.to_owned()),
        ("redirect_uri", redirect_uri(public_base_url)),
        ("client_id", client_id.to_owned()),
    ];
    if let Some(secret) = &hub.oauth_client_secret {
        form.push(("client_secret", secret.expose_secret().to_owned()));
    }

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(hub.timeout_seconds))
        .build()
        .context("build oauth http client")?;
    let url = format!("{}/oauth/token", hub.base_url.trim_end_matches('/'));
    let resp = http
        .post(url)
        .form(&form)
        .send()
        .await
        .context("request oauth token")?;
    let status = resp.status();
    if !status.is_success() {
        let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
        eyre::bail!("oauth token exchange http {status}: {}", token_error_detail(&body));
    }
    resp.json().await.context("decode oauth token response")
}

/// Build the call identity from transport-level values.
///
/// `bearer` is the raw `Authorization` header value; the `Bearer ` prefix is optional.
pub fn resolve(
    hub: &HubConfig,
    public_base_url: &str,
    bearer: Option<&str>,
    session_id: Option<&str>,
    deployment_id: Option<&str>,
) -> CallAuth {
    let token = non_empty(bearer).map(|raw| {
        raw.strip_prefix("Bearer ")
            .or_else(|| raw.strip_prefix("bearer "))
            .unwrap_or(raw)
            .trim()
    });
    let deployment = non_empty(deployment_id).or_else(|| non_empty(hub.deployment_id.as_deref()));

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return authorization_url(hub, public_base_url).map_or(CallAuth::Missing, |url| {
            CallAuth::Required(AuthorizationDetails {
                authorization_url: Some(url),
                deployment_id: deployment.map(str::to_owned),
                ..AuthorizationDetails::default()
            })
        });
    };

    match (non_empty(session_id), deployment) {
        (Some(session), Some(deployment)) => CallAuth::Ready(AuthContext {
            access_token: SecretString::from(token.to_owned()),
            session_id: session.to_owned(),
            deployment_id: deployment.to_owned(),
        }),
        _ => CallAuth::Missing,
    }
}

/// Identity for stdio mode: token and deployment from config, session fixed for the process.
pub fn resolve_static(hub: &HubConfig, public_base_url: &str, session_id: &str) -> CallAuth {
    let token = hub
        .access_token
        .as_ref()
        .map(|t| t.expose_secret().to_owned());
    resolve(
        hub,
        public_base_url,
        token.as_deref(),
        Some(session_id),
        None,
    )
}
