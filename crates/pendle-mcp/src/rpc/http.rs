//! Streamable-HTTP MCP endpoint: one JSON-RPC message per `POST /mcp`, plus the OAuth
//! redirect target.

use crate::{
    auth,
    config::PendleMcpConfig,
    rpc::mcp_server::{self, err, SharedState, MAX_JSONRPC_LINE_BYTES},
};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use eyre::Context as _;
use secrecy::ExposeSecret as _;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::{info, warn};

pub const SESSION_HEADER: &str = "mcp-session-id";
pub const DEPLOYMENT_HEADER: &str = "x-deployment-id";

const PARSE_ERROR: i64 = -32700;

/// Any origin, credentials allowed. The origin is mirrored since `*` cannot carry credentials.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static(SESSION_HEADER),
            HeaderName::from_static(DEPLOYMENT_HEADER),
        ]))
        .expose_headers([HeaderName::from_static(SESSION_HEADER)])
        .allow_credentials(true)
}

pub fn router(shared: Arc<SharedState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/mcp", post(mcp_handler))
        .route(auth::CALLBACK_PATH, get(callback_handler))
        .layer(cors_layer())
        .layer(DefaultBodyLimit::max(MAX_JSONRPC_LINE_BYTES))
        .with_state(shared)
}

pub async fn serve(cfg: &PendleMcpConfig) -> eyre::Result<()> {
    let shared = Arc::new(SharedState::from_config(cfg)?);
    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .context("server listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(
        addr = %listener.local_addr()?,
        public_base_url = %shared.public_base_url,
        "mcp http server listening"
    );
    axum::serve(listener, router(shared))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    info!("shutdown signal received");
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

fn callback_error(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
}

/// OAuth redirect target: trades the authorization code for a hub access token.
async fn callback_handler(
    State(shared): State<Arc<SharedState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(error) = params.error {
        let detail = params.error_description.unwrap_or_default();
        warn!(error = %error, "oauth authorization denied");
        return callback_error(
            StatusCode::BAD_REQUEST,
            format!("Authorization failed: {error} {detail}").trim_end().to_owned(),
        );
    }
    let Some(code) = params.code.filter(|c| !c.trim().is_empty()) else {
        return callback_error(
            StatusCode::BAD_REQUEST,
            "missing authorization code".to_owned(),
        );
    };
    if shared.hub.oauth_client_id.trim().is_empty() {
        return callback_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "OAuth client is not configured".to_owned(),
        );
    }

    match auth::exchange_code(&shared.hub, &shared.public_base_url, code.trim()).await {
        Ok(grant) => {
            info!(expires_in = ?grant.expires_in, "oauth callback completed");
            Json(json!({
                "status": "authorized",
                "accessToken": grant.access_token.expose_secret(),
                "tokenType": grant.token_type.unwrap_or_else(|| "Bearer".to_owned()),
                "expiresIn": grant.expires_in,
                "state": params.state,
                "message": "Send this token as `Authorization: Bearer <token>` on MCP requests.",
            }))
            .into_response()
        }
        Err(e) => {
            warn!(error = %format!("{e:#}"), "oauth token exchange failed");
            callback_error(StatusCode::BAD_GATEWAY, format!("{e:#}"))
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn mcp_handler(
    State(shared): State<Arc<SharedState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let msg: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "invalid json body");
            return (
                StatusCode::BAD_REQUEST,
                Json(err(Value::Null, PARSE_ERROR, "parse error")),
            )
                .into_response();
        }
    };

    // Sessions are minted on `initialize`; later requests echo the header back.
    let is_initialize = msg.get("method").and_then(Value::as_str) == Some("initialize");
    let issued = (is_initialize && header(&headers, SESSION_HEADER).is_none())
        .then(|| uuid::Uuid::new_v4().to_string());
    let session_id = issued
        .as_deref()
        .or_else(|| header(&headers, SESSION_HEADER));

    let call_auth = auth::resolve(
        &shared.hub,
        &shared.public_base_url,
        header(&headers, "authorization"),
        session_id,
        header(&headers, DEPLOYMENT_HEADER),
    );

    let Some(resp) = mcp_server::handle_message(&shared, msg, &call_auth).await else {
        return StatusCode::ACCEPTED.into_response();
    };
    let mut out = Json(resp).into_response();
    if let Some(hv) = issued.and_then(|s| HeaderValue::from_str(&s).ok()) {
        out.headers_mut().insert(SESSION_HEADER, hv);
    }
    out
}
