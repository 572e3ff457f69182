use super::tools::{Dispatcher, ToolSettings};
use crate::{
    assembler::TxAssembler,
    chains::evm::EvmRpc,
    config::{HubConfig, PendleMcpConfig},
    custody::HubCustody,
    pendle::PendleApi,
    session::SessionWalletRegistry,
};
use eyre::Context as _;
use std::sync::Arc;
use tracing::info;

/// Process-wide state shared by every connection and request.
#[derive(Debug)]
pub struct SharedState {
    pub dispatcher: Dispatcher,
    pub hub: HubConfig,
    pub public_base_url: String,
}

impl SharedState {
    pub fn new(dispatcher: Dispatcher, hub: HubConfig, public_base_url: String) -> Self {
        Self {
            dispatcher,
            hub,
            public_base_url,
        }
    }

    /// Wire the real hub, trading API and chain RPC clients from config.
    pub fn from_config(cfg: &PendleMcpConfig) -> eyre::Result<Self> {
        let custody =
            HubCustody::new(&cfg.hub.base_url, cfg.hub_timeout()).context("build hub client")?;
        let api = PendleApi::new(&cfg.pendle.api_base_url, cfg.pendle_timeout())
            .context("build pendle api client")?;
        let chain = EvmRpc::new(cfg.evm_rpc_urls()?, cfg.retry_policy());
        info!(
            chains = ?chain.chains().collect::<Vec<_>>(),
            gas_limit = cfg.tx.gas_limit,
            "chain rpc configured"
        );

        let dispatcher = Dispatcher::new(
            Arc::new(SessionWalletRegistry::new()),
            Arc::new(custody),
            Arc::new(api),
            Arc::new(chain),
            TxAssembler::new(cfg.tx.gas_limit),
            ToolSettings {
                default_chain_id: cfg.default_chain_id()?,
                router: cfg.router_address()?,
            },
        );
        Ok(Self::new(
            dispatcher,
            cfg.hub.clone(),
            cfg.server.public_base_url(),
        ))
    }
}
