use crate::auth::AuthorizationDetails;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A structured error suitable for returning to an MCP client alongside the text envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolError {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Value::is_null", default)]
    pub data: Value,
}

impl ToolError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: Value::Null,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PendleMcpError {
    #[error("No token or context found")]
    NoAuthContext,

    #[error("No wallet found, you need to choose a wallet first with choose_wallet")]
    NoWalletFound,

    #[error(
        "No account found for {address} on {chain}, \
         you need to choose a wallet first with choose_wallet"
    )]
    NoAccountFound { address: String, chain: String },

    #[error("No wallet record found")]
    NoWalletRecords,

    #[error("Wallet record not found")]
    WalletRecordNotFound,

    /// Upstream trading API error; the message is forwarded verbatim.
    #[error("{0}")]
    RemoteApi(String),

    #[error("authorization required")]
    AuthorizationRequired(AuthorizationDetails),

    #[error("Validation Error: {field} - {reason}")]
    InvalidArgument { field: String, reason: String },
}

impl PendleMcpError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoAuthContext => "no_auth_context",
            Self::NoWalletFound => "no_wallet_found",
            Self::NoAccountFound { .. } => "no_account_found",
            Self::NoWalletRecords => "no_wallet_records",
            Self::WalletRecordNotFound => "wallet_record_not_found",
            Self::RemoteApi(_) => "remote_api_error",
            Self::AuthorizationRequired(_) => "authorization_required",
            Self::InvalidArgument { .. } => "invalid_argument",
        }
    }
}

impl From<PendleMcpError> for ToolError {
    fn from(e: PendleMcpError) -> Self {
        let code = e.code();
        let message = e.to_string();
        match e {
            PendleMcpError::AuthorizationRequired(details) => Self {
                code,
                message: "authorization required".to_owned(),
                data: serde_json::to_value(details).unwrap_or(Value::Null),
            },
            PendleMcpError::NoAccountFound { address, chain } => Self {
                code,
                message,
                data: serde_json::json!({ "address": address, "chain": chain }),
            },
            _ => Self::new(code, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_api_message_is_verbatim() {
        let e = PendleMcpError::RemoteApi("market not expired".to_owned());
        assert_eq!(e.to_string(), "market not expired");
        assert_eq!(e.code(), "remote_api_error");
    }

    #[test]
    fn no_wallet_message_points_at_choose_wallet() {
        let te = ToolError::from(PendleMcpError::NoWalletFound);
        assert_eq!(te.code, "no_wallet_found");
        assert!(
            te.message.contains("choose_wallet"),
            "message should name the selection tool: {}",
            te.message
        );
    }

    #[test]
    fn no_account_message_reads_as_one_sentence() {
        let e = PendleMcpError::NoAccountFound {
            address: "0xabc".to_owned(),
            chain: "eip155:1".to_owned(),
        };
        assert_eq!(
            e.to_string(),
            "No account found for 0xabc on eip155:1, you need to choose a wallet first with choose_wallet"
        );
    }

    #[test]
    fn authorization_details_travel_in_data() {
        let te = ToolError::from(PendleMcpError::AuthorizationRequired(AuthorizationDetails {
            authorization_url: Some("https://hub.example/auth".to_owned()),
            ..AuthorizationDetails::default()
        }));
        assert_eq!(
            te.data.get("authorizationUrl").and_then(Value::as_str),
            Some("https://hub.example/auth")
        );
    }
}
