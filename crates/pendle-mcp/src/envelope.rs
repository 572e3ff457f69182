//! Uniform result shape for every tool call.
//!
//! Each invocation produces exactly one [`Envelope`]; the MCP layer only ever sees
//! [`Envelope::into_call_tool_result`], never a raw error.

use crate::{
    auth::AuthorizationDetails,
    errors::{PendleMcpError, ToolError},
};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Largest integer a JSON consumer can hold in an IEEE-754 double without rounding.
const MAX_SAFE_INTEGER: u64 = (1_u64 << 53) - 1;

const DEFAULT_AUTH_MESSAGE: &str =
    "Authentication required. Please ensure the MCP server is properly configured with authentication.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Envelope {
    Success {
        message: String,
        data: Value,
    },
    Error {
        message: String,
        code: &'static str,
    },
    AuthError {
        message: String,
        #[serde(flatten)]
        details: AuthorizationDetails,
    },
}

impl Envelope {
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self::Success {
            message: message.into(),
            data: json_safe(data),
        }
    }

    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            code,
        }
    }

    pub fn auth_error(message: Option<String>, details: AuthorizationDetails) -> Self {
        Self::AuthError {
            message: message.unwrap_or_else(|| DEFAULT_AUTH_MESSAGE.to_owned()),
            details,
        }
    }

    /// Classify a pipeline failure for operation `op` (the tool name).
    pub fn from_report(op: &str, report: &eyre::Report) -> Self {
        let Some(known) = report.downcast_ref::<PendleMcpError>() else {
            return Self::error(
                "internal_error",
                format!("{} failed: {report:#}", capitalize(&op.replace('_', " "))),
            );
        };
        Self::from_error(op, known)
    }

    pub fn from_error(op: &str, e: &PendleMcpError) -> Self {
        match e {
            PendleMcpError::AuthorizationRequired(details) => {
                let message = details.authorization_url.as_deref().map_or_else(
                    || format!("Authentication required for {op}."),
                    |url| format!("Authentication required for {op}. Please visit: {url}"),
                );
                Self::auth_error(Some(message), details.clone())
            }
            PendleMcpError::NoAuthContext
            | PendleMcpError::NoWalletFound
            | PendleMcpError::NoAccountFound { .. }
            | PendleMcpError::NoWalletRecords
            | PendleMcpError::WalletRecordNotFound
            | PendleMcpError::RemoteApi(_)
            | PendleMcpError::InvalidArgument { .. } => {
                let te = ToolError::from(e.clone());
                Self::error(te.code, te.message)
            }
        }
    }

    pub const fn is_error(&self) -> bool {
        !matches!(self, Self::Success { .. })
    }

    #[cfg(test)]
    pub fn message(&self) -> &str {
        match self {
            Self::Success { message, .. }
            | Self::Error { message, .. }
            | Self::AuthError { message, .. } => message,
        }
    }

    /// Human-readable text block shown to the agent.
    pub fn text(&self) -> String {
        match self {
            Self::Success { message, data } => {
                if data.is_null() {
                    return message.clone();
                }
                let pretty =
                    serde_json::to_string_pretty(data).unwrap_or_else(|_e| data.to_string());
                format!("{message}\n\nData: {pretty}")
            }
            Self::Error { message, code } => {
                if *code == "invalid_argument" {
                    message.clone()
                } else {
                    format!("Error: {message}")
                }
            }
            Self::AuthError { message, details } => auth_text(message, details),
        }
    }

    /// MCP `tools/call` result: a text block plus the same envelope as structured content.
    pub fn into_call_tool_result(self) -> Value {
        let text = self.text();
        let is_error = self.is_error();
        let structured = match &self {
            Self::Success { .. } | Self::AuthError { .. } => {
                serde_json::to_value(&self).unwrap_or(Value::Null)
            }
            Self::Error { message, code } => {
                json!({ "status": "error", "message": message, "code": code })
            }
        };
        json!({
            "content": [{ "type": "text", "text": text }],
            "isError": is_error,
            "structuredContent": structured,
        })
    }
}

fn auth_text(message: &str, details: &AuthorizationDetails) -> String {
    if *details == AuthorizationDetails::default() {
        return message.to_owned();
    }
    let mut lines = vec![format!("{message}\n\nAuthentication Details:")];
    if let Some(url) = &details.authorization_url {
        lines.push(format!("- Authorization URL: {url}"));
    }
    if let Some(svc) = &details.missing_service {
        lines.push(format!("- Missing Service: {svc}"));
    }
    if !details.available_services.is_empty() {
        lines.push(format!(
            "- Available Services: {}",
            details.available_services.join(", ")
        ));
    }
    if let Some(dep) = &details.deployment_id {
        lines.push(format!("- Deployment ID: {dep}"));
    }
    lines.push(
        "\nTip: Visit the authorization URL above to authenticate with the required service."
            .to_owned(),
    );
    lines.join("\n")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Stringify integers a double cannot represent exactly; leave everything else untouched.
pub fn json_safe(v: Value) -> Value {
    match v {
        Value::Number(n) => {
            let unsafe_u = n.as_u64().is_some_and(|u| u > MAX_SAFE_INTEGER);
            let unsafe_i = n
                .as_i64()
                .is_some_and(|i| i.unsigned_abs() > MAX_SAFE_INTEGER);
            if unsafe_u || unsafe_i {
                Value::String(n.to_string())
            } else {
                Value::Number(n)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(json_safe).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, json_safe(v)))
                .collect::<Map<String, Value>>(),
        ),
        other @ (Value::Null | Value::Bool(_) | Value::String(_)) => other,
    }
}
