//! Operation dispatcher: one entry point per tool, each producing exactly one [`Envelope`].

mod approve;
mod market_data;
mod quoted;
mod schema;
mod wallet;

pub use schema::list_tools_result;

use crate::{
    assembler::TxAssembler,
    auth::{AuthContext, CallAuth},
    chains::evm::ChainRpc,
    custody::{caip_chain, SignerAccount, WalletCustody},
    envelope::Envelope,
    errors::PendleMcpError,
    pendle::{QuotedOp, ReadOp, TradingApi},
    session::SessionWalletRegistry,
};
use alloy::primitives::Address;
use serde_json::Value;
use std::{sync::Arc, time::Instant};
use tracing::{info, warn};

/// Call-time settings shared by every tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSettings {
    pub default_chain_id: u64,
    /// Spender for `approve_token`.
    pub router: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tool {
    GetUserAddresses,
    ChooseWallet,
    ApproveToken,
    Quoted(QuotedOp),
    Read(ReadOp),
}

impl Tool {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "get_user_addresses" | "getUserAddresses" => Some(Self::GetUserAddresses),
            "choose_wallet" | "chooseWallet" => Some(Self::ChooseWallet),
            "approve_token" | "approveToken" => Some(Self::ApproveToken),
            other => QuotedOp::from_tool(other)
                .map(Self::Quoted)
                .or_else(|| ReadOp::from_tool(other).map(Self::Read)),
        }
    }

    /// Canonical snake_case name, used in logs and failure prefixes.
    const fn name(self) -> &'static str {
        match self {
            Self::GetUserAddresses => "get_user_addresses",
            Self::ChooseWallet => "choose_wallet",
            Self::ApproveToken => "approve_token",
            Self::Quoted(op) => op.spec().tool,
            Self::Read(op) => op.tool(),
        }
    }
}

pub struct Dispatcher {
    registry: Arc<SessionWalletRegistry>,
    custody: Arc<dyn WalletCustody>,
    api: Arc<dyn TradingApi>,
    chain: Arc<dyn ChainRpc>,
    assembler: TxAssembler,
    settings: ToolSettings,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("bound_sessions", &self.registry.bound_sessions())
            .field("assembler", &self.assembler)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        registry: Arc<SessionWalletRegistry>,
        custody: Arc<dyn WalletCustody>,
        api: Arc<dyn TradingApi>,
        chain: Arc<dyn ChainRpc>,
        assembler: TxAssembler,
        settings: ToolSettings,
    ) -> Self {
        Self {
            registry,
            custody,
            api,
            chain,
            assembler,
            settings,
        }
    }

    #[cfg(test)]
    pub fn knows(name: &str) -> bool {
        Tool::parse(name).is_some()
    }

    /// Run one tool call to completion. Never fails: every outcome is an envelope.
    pub async fn call(&self, tool_name: &str, args: &Value, auth: &CallAuth) -> Envelope {
        let Some(tool) = Tool::parse(tool_name) else {
            warn!(tool = tool_name, "unknown tool");
            return Envelope::error("unknown_tool", format!("unknown tool: {tool_name}"));
        };
        let name = tool.name();
        let started = Instant::now();
        info!(tool = name, session_id = auth.session_id(), "tool called");

        let res = match tool {
            Tool::GetUserAddresses => wallet::get_user_addresses(self, auth).await,
            Tool::ChooseWallet => wallet::choose_wallet(self, args, auth).await,
            Tool::ApproveToken => approve::approve_token(self, args, auth).await,
            Tool::Quoted(op) => quoted::run(self, op, args, auth).await,
            Tool::Read(op) => market_data::run(self, op, args, auth).await,
        };
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match res {
            Ok(env) => {
                info!(tool = name, duration_ms, "tool completed");
                env
            }
            Err(report) => {
                let env = Envelope::from_report(name, &report);
                match &env {
                    Envelope::AuthError { details, .. } => warn!(
                        tool = name,
                        duration_ms,
                        url = details.authorization_url.as_deref().unwrap_or(""),
                        "authorization required"
                    ),
                    Envelope::Success { .. } | Envelope::Error { .. } => warn!(
                        tool = name,
                        duration_ms,
                        error = %format!("{report:#}"),
                        "tool failed"
                    ),
                }
                env
            }
        }
    }

    /// Steps 2 and 3 of every signing pipeline: bound wallet, then a custody account for it.
    async fn signer(&self, auth: &AuthContext, chain_id: u64) -> eyre::Result<SignerAccount> {
        let address = self
            .registry
            .resolve(&auth.session_id)
            .ok_or(PendleMcpError::NoWalletFound)?;
        let chain = caip_chain(chain_id);
        let account = self.custody.resolve_account(auth, &address, &chain).await?;
        account.ok_or_else(|| PendleMcpError::NoAccountFound { address, chain }.into())
    }
}
