//! In-memory stand-ins for the custody hub, trading API and chain RPC.

use crate::{
    assembler::TxAssembler,
    auth::{AuthContext, AuthorizationDetails},
    chains::evm::{parse_address, ChainRpc, FeeQuote},
    config::HubConfig,
    custody::{ChainAddress, SignRequest, WalletAccount, WalletCustody, WalletRecord},
    errors::PendleMcpError,
    pendle::TradingApi,
    rpc::mcp_server::{Dispatcher, SharedState, ToolSettings},
    session::SessionWalletRegistry,
};
use alloy::primitives::{keccak256, Address, Bytes, B256};
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

pub const ROUTER: &str = "0x888888888889758F76e7103c6CbF23ABbF58F946";
pub const WALLET: &str = "0xAbC0000000000000000000000000000000000001";
pub const OTHER_WALLET: &str = "0xdef0000000000000000000000000000000000002";
pub const MARKET: &str = "0x34280882267ffa6383b363e278b027be083bbe3b";
pub const TOKEN_IN: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub const TOKEN_OUT: &str = "0xb253eff1104802b97ac7e3ac9fdd73aece295a2c";

pub fn auth_ctx(session_id: &str) -> AuthContext {
    AuthContext {
        access_token: SecretString::from("test-token".to_owned()),
        session_id: session_id.to_owned(),
        deployment_id: "dep-test".to_owned(),
    }
}

#[derive(Debug, Default)]
pub struct FakeCustody {
    pub records: Vec<WalletRecord>,
    pub fail_sign: Option<String>,
    pub auth_gap: Option<AuthorizationDetails>,
    pub signed: Mutex<Vec<SignRequest>>,
}

impl FakeCustody {
    /// One record per `(record id, address)`, usable on every EVM chain.
    pub fn with_wallets(wallets: &[(&str, &str)]) -> Self {
        let records = wallets
            .iter()
            .map(|(id, addr)| WalletRecord {
                id: (*id).to_owned(),
                accounts: vec![WalletAccount {
                    addresses: vec![ChainAddress {
                        address: (*addr).to_owned(),
                        chains: vec!["evm".to_owned()],
                    }],
                }],
            })
            .collect();
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn sign_requests(&self) -> Vec<SignRequest> {
        self.signed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl WalletCustody for FakeCustody {
    async fn wallet_records(&self, _auth: &AuthContext) -> eyre::Result<Vec<WalletRecord>> {
        if let Some(details) = &self.auth_gap {
            return Err(PendleMcpError::AuthorizationRequired(details.clone()).into());
        }
        Ok(self.records.clone())
    }

    async fn sign_transaction(
        &self,
        _auth: &AuthContext,
        req: &SignRequest,
    ) -> eyre::Result<Bytes> {
        self.signed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(req.clone());
        if let Some(msg) = &self.fail_sign {
            eyre::bail!("{msg}");
        }
        let mut raw = hex::decode(req.serialized.trim_start_matches("0x"))?;
        raw.push(0x01);
        Ok(Bytes::from(raw))
    }
}

type Call = (String, Vec<(String, String)>);

#[derive(Debug, Default)]
pub struct FakeApi {
    responses: HashMap<String, Result<Value, String>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    #[must_use]
    pub fn respond(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_owned(), Ok(body));
        self
    }

    /// Simulate a non-2xx response whose body carries `error: msg`.
    #[must_use]
    pub fn fail(mut self, path: &str, msg: &str) -> Self {
        self.responses.insert(path.to_owned(), Err(msg.to_owned()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TradingApi for FakeApi {
    async fn get(&self, path: &str, query: &[(String, String)]) -> eyre::Result<Value> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((path.to_owned(), query.to_vec()));
        match self.responses.get(path) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(msg)) => Err(PendleMcpError::RemoteApi(msg.clone()).into()),
            None => eyre::bail!("unexpected path {path}"),
        }
    }
}

#[derive(Debug)]
pub struct FakeChain {
    pub base_fee: Option<u128>,
    pub gas_price: u128,
    pub nonce: u64,
    pub decimals: u8,
    pub sent: Mutex<Vec<Bytes>>,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self {
            base_fee: Some(10_000_000_000),
            gas_price: 20_000_000_000,
            nonce: 7,
            decimals: 6,
            sent: Mutex::default(),
        }
    }
}

impl FakeChain {
    pub fn sent(&self) -> Vec<Bytes> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ChainRpc for FakeChain {
    async fn fee_quote(&self, _chain_id: u64) -> eyre::Result<FeeQuote> {
        Ok(FeeQuote {
            base_fee: self.base_fee,
            gas_price: self.gas_price,
        })
    }

    async fn pending_nonce(&self, _chain_id: u64, _address: Address) -> eyre::Result<u64> {
        Ok(self.nonce)
    }

    async fn erc20_decimals(&self, _chain_id: u64, _token: Address) -> eyre::Result<u8> {
        Ok(self.decimals)
    }

    async fn send_raw_transaction(&self, _chain_id: u64, raw: &Bytes) -> eyre::Result<B256> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(raw.clone());
        Ok(keccak256(raw))
    }
}

/// Server state over fakes, as the transports see it.
pub fn shared_state(
    custody: FakeCustody,
    api: FakeApi,
    hub: HubConfig,
) -> eyre::Result<SharedState> {
    let custody: Arc<dyn WalletCustody> = Arc::new(custody);
    let api: Arc<dyn TradingApi> = Arc::new(api);
    let chain: Arc<dyn ChainRpc> = Arc::new(FakeChain::default());
    let dispatcher = Dispatcher::new(
        Arc::new(SessionWalletRegistry::new()),
        custody,
        api,
        chain,
        TxAssembler::new(800_000),
        ToolSettings {
            default_chain_id: 1,
            router: parse_address(ROUTER)?,
        },
    );
    Ok(SharedState::new(
        dispatcher,
        hub,
        "http://localhost:3000".to_owned(),
    ))
}
