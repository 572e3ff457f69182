use crate::{chains::evm::parse_address, paths::PendlePaths, retry::RetryPolicy};
use alloy::primitives::Address;
use eyre::{Context as _, ContextCompat as _};
use secrecy::SecretString;
use serde::Deserialize;
use std::{collections::BTreeMap, time::Duration};

pub const DEFAULT_HUB_BASE_URL: &str = "https://api.osirislabs.xyz/v1";
pub const DEFAULT_PENDLE_API_BASE_URL: &str = "https://api-v2.pendle.finance/core";
pub const DEFAULT_ROUTER_ADDRESS: &str = "0x888888888889758F76e7103c6CbF23ABbF58F946";
pub const DEFAULT_GAS_LIMIT: u64 = 800_000;

/// Smallest gas limit that can carry any transaction at all.
const INTRINSIC_GAS: u64 = 21_000;

const EVM_RPC_ENV_PREFIX: &str = "EVM_RPC_URL_";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Base URL of the wallet-custody and auth hub.
    pub base_url: String,
    /// OAuth client registered with the hub. Empty disables authorization URLs.
    pub oauth_client_id: String,
    pub oauth_client_secret: Option<SecretString>,
    /// Used when a request carries no `X-Deployment-Id` header.
    pub deployment_id: Option<String>,
    /// Static bearer token for stdio mode.
    pub access_token: Option<SecretString>,
    pub timeout_seconds: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_HUB_BASE_URL.into(),
            oauth_client_id: String::new(),
            oauth_client_secret: None,
            deployment_id: None,
            access_token: None,
            timeout_seconds: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable origin, used for OAuth redirect URIs.
    pub public_base_url: Option<String>,
    /// Connection string of the external session store. Only reported, never opened here.
    pub database_url: Option<SecretString>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            public_base_url: None,
            database_url: None,
        }
    }
}

impl ServerConfig {
    pub fn public_base_url(&self) -> String {
        self.public_base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map_or_else(
                || format!("http://localhost:{}", self.port),
                |u| u.trim_end_matches('/').to_owned(),
            )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PendleConfig {
    pub api_base_url: String,
    /// Spender for `approve_token` and target of every quoted transaction.
    pub router_address: String,
    /// Decimal chain id used when a tool call omits `chainId`.
    pub default_chain_id: String,
    pub timeout_seconds: u64,
}

impl Default for PendleConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_PENDLE_API_BASE_URL.into(),
            router_address: DEFAULT_ROUTER_ADDRESS.into(),
            default_chain_id: "1".into(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TxConfig {
    /// Fixed gas ceiling applied to every transaction; never estimated.
    pub gas_limit: u64,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// EVM RPC endpoints keyed by decimal chain id. The first URL is the primary (broadcast)
    /// endpoint; the rest are read fallbacks.
    pub evm_rpc_urls: BTreeMap<String, Vec<String>>,
    /// Rounds over the endpoint list for read-only calls.
    pub retry_rounds: usize,
}

/// A single EVM chain definition used by the table-driven [`RpcConfig::default()`].
struct EvmChainDef {
    chain_id: u64,
    urls: &'static [&'static str],
}

/// Chains the trading API serves, with public endpoints.
const EVM_CHAINS: &[EvmChainDef] = &[
    EvmChainDef {
        chain_id: 1,
        urls: &[
            "https://eth.llamarpc.com",
            "https://ethereum-rpc.publicnode.com",
            "https://rpc.ankr.com/eth",
        ],
    },
    EvmChainDef {
        chain_id: 10,
        urls: &[
            "https://optimism.llamarpc.com",
            "https://mainnet.optimism.io",
            "https://optimism-rpc.publicnode.com",
        ],
    },
    EvmChainDef {
        chain_id: 56,
        urls: &[
            "https://bsc.llamarpc.com",
            "https://bsc-dataseed.bnbchain.org",
            "https://bsc-rpc.publicnode.com",
        ],
    },
    EvmChainDef {
        chain_id: 137,
        urls: &[
            "https://polygon.llamarpc.com",
            "https://polygon-rpc.com",
            "https://polygon-bor-rpc.publicnode.com",
        ],
    },
    EvmChainDef {
        chain_id: 8453,
        urls: &[
            "https://base.llamarpc.com",
            "https://mainnet.base.org",
            "https://base-rpc.publicnode.com",
        ],
    },
    EvmChainDef {
        chain_id: 42161,
        urls: &[
            "https://arbitrum.llamarpc.com",
            "https://arb1.arbitrum.io/rpc",
            "https://arbitrum-rpc.publicnode.com",
        ],
    },
];

impl Default for RpcConfig {
    fn default() -> Self {
        let evm_rpc_urls = EVM_CHAINS
            .iter()
            .map(|def| {
                (
                    def.chain_id.to_string(),
                    def.urls.iter().map(|&u| u.to_owned()).collect(),
                )
            })
            .collect();
        Self {
            evm_rpc_urls,
            retry_rounds: RetryPolicy::default().rounds,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PendleMcpConfig {
    pub hub: HubConfig,
    pub server: ServerConfig,
    pub pendle: PendleConfig,
    pub tx: TxConfig,
    pub rpc: RpcConfig,
    /// Mirror logs as JSON lines into the data directory.
    pub log_to_file: bool,
}

impl PendleMcpConfig {
    /// Defaults, then `config.toml` (if present), then the process environment.
    ///
    /// `.env` is loaded into the process environment by `main` before this runs.
    pub fn load(paths: &PendlePaths) -> eyre::Result<Self> {
        let mut cfg = Self::from_file_or_default(paths)?;
        cfg.apply_env(&process_env())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file_or_default(paths: &PendlePaths) -> eyre::Result<Self> {
        let path = paths.config_file();
        if !path.exists() {
            return Ok(Self::default());
        }
        let s = std::fs::read_to_string(&path).context("read config.toml")?;
        toml::from_str(&s).context("parse config.toml")
    }

    /// Overlay non-empty environment values onto the loaded config.
    pub fn apply_env(&mut self, env: &BTreeMap<String, String>) -> eyre::Result<()> {
        let get = |k: &str| env.get(k).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(v) = get("HUB_BASE_URL") {
            v.clone_into(&mut self.hub.base_url);
        }
        if let Some(v) = get("OAUTH_CLIENT_ID") {
            v.clone_into(&mut self.hub.oauth_client_id);
        }
        if let Some(v) = get("OAUTH_CLIENT_SECRET") {
            self.hub.oauth_client_secret = Some(SecretString::from(v.to_owned()));
        }
        if let Some(v) = get("DEPLOYMENT_ID") {
            self.hub.deployment_id = Some(v.to_owned());
        }
        if let Some(v) = get("PENDLE_MCP_ACCESS_TOKEN") {
            self.hub.access_token = Some(SecretString::from(v.to_owned()));
        }
        if let Some(v) = get("HOST") {
            v.clone_into(&mut self.server.host);
        }
        if let Some(v) = get("PORT") {
            self.server.port = v.parse().with_context(|| format!("PORT: invalid port {v:?}"))?;
        }
        if let Some(v) = get("PUBLIC_BASE_URL") {
            self.server.public_base_url = Some(v.to_owned());
        }
        if let Some(v) = get("DATABASE_URL") {
            self.server.database_url = Some(SecretString::from(v.to_owned()));
        }
        if let Some(v) = get("PENDLE_API_BASE_URL") {
            v.clone_into(&mut self.pendle.api_base_url);
        }
        if let Some(v) = get("PENDLE_ROUTER_ADDRESS") {
            v.clone_into(&mut self.pendle.router_address);
        }
        if let Some(v) = get("DEFAULT_CHAIN_ID") {
            v.clone_into(&mut self.pendle.default_chain_id);
        }
        if let Some(v) = get("GAS_LIMIT") {
            self.tx.gas_limit = v
                .parse()
                .with_context(|| format!("GAS_LIMIT: invalid integer {v:?}"))?;
        }

        for (key, value) in env {
            let Some(chain) = key.strip_prefix(EVM_RPC_ENV_PREFIX) else {
                continue;
            };
            let chain_id: u64 = chain
                .parse()
                .with_context(|| format!("{key}: suffix must be a decimal chain id"))?;
            let urls: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_owned)
                .collect();
            if !urls.is_empty() {
                self.rpc.evm_rpc_urls.insert(chain_id.to_string(), urls);
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> eyre::Result<()> {
        ensure_https_or_loopback(&self.hub.base_url, "hub.base_url")?;
        ensure_https_or_loopback(&self.pendle.api_base_url, "pendle.api_base_url")?;
        for (chain, urls) in &self.rpc.evm_rpc_urls {
            for url in urls {
                ensure_https_or_loopback(url, &format!("rpc.evm_rpc_urls.{chain}"))?;
            }
        }
        self.router_address()?;
        self.default_chain_id()?;
        self.evm_rpc_urls()?;
        if self.tx.gas_limit <= INTRINSIC_GAS {
            eyre::bail!(
                "tx.gas_limit must be greater than {INTRINSIC_GAS} (got {})",
                self.tx.gas_limit
            );
        }
        if self.rpc.retry_rounds == 0 {
            eyre::bail!("rpc.retry_rounds must be at least 1");
        }
        Ok(())
    }

    pub fn router_address(&self) -> eyre::Result<Address> {
        parse_address(&self.pendle.router_address).context("pendle.router_address")
    }

    pub fn default_chain_id(&self) -> eyre::Result<u64> {
        let raw = self.pendle.default_chain_id.trim();
        raw.parse()
            .with_context(|| format!("pendle.default_chain_id: not a decimal chain id: {raw:?}"))
    }

    /// RPC endpoints keyed by numeric chain id.
    pub fn evm_rpc_urls(&self) -> eyre::Result<BTreeMap<u64, Vec<String>>> {
        self.rpc
            .evm_rpc_urls
            .iter()
            .map(|(chain, urls)| {
                let id: u64 = chain
                    .trim()
                    .parse()
                    .ok()
                    .with_context(|| format!("rpc.evm_rpc_urls: key {chain:?} is not a chain id"))?;
                Ok((id, urls.clone()))
            })
            .collect()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            rounds: self.rpc.retry_rounds,
            ..RetryPolicy::default()
        }
    }

    pub const fn hub_timeout(&self) -> Duration {
        Duration::from_secs(self.hub.timeout_seconds)
    }

    pub const fn pendle_timeout(&self) -> Duration {
        Duration::from_secs(self.pendle.timeout_seconds)
    }
}

/// The process environment, skipping entries that are not valid UTF-8.
pub fn process_env() -> BTreeMap<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

fn is_loopback_http(url: &str) -> bool {
    fn host_prefix_ok(s: &str, prefix: &str) -> bool {
        if !s.starts_with(prefix) {
            return false;
        }
        matches!(s.as_bytes().get(prefix.len()), None | Some(b':' | b'/'))
    }
    let u = url.trim();
    host_prefix_ok(u, "http://127.0.0.1")
        || host_prefix_ok(u, "http://localhost")
        || host_prefix_ok(u, "http://[::1]")
}

fn ensure_https_or_loopback(url: &str, name: &str) -> eyre::Result<()> {
    let u = url.trim();
    if u.starts_with("https://") || is_loopback_http(u) {
        return Ok(());
    }
    eyre::bail!("{name} must use https (or http://localhost for local testing)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret as _;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn defaults_are_valid() -> eyre::Result<()> {
        let cfg = PendleMcpConfig::default();
        cfg.validate()?;
        assert_eq!(cfg.default_chain_id()?, 1);
        assert_eq!(cfg.tx.gas_limit, 800_000);
        assert_eq!(cfg.server.public_base_url(), "http://localhost:3000");
        let rpc = cfg.evm_rpc_urls()?;
        assert_eq!(
            rpc.keys().copied().collect::<Vec<_>>(),
            vec![1, 10, 56, 137, 8453, 42161],
            "default chain table"
        );
        Ok(())
    }

    #[test]
    fn env_overrides_apply() -> eyre::Result<()> {
        let mut cfg = PendleMcpConfig::default();
        cfg.apply_env(&env(&[
            ("HUB_BASE_URL", "http://127.0.0.1:8080/v1"),
            ("OAUTH_CLIENT_ID", "client-1"),
            ("PENDLE_MCP_ACCESS_TOKEN", " tok "),
            ("PORT", "4100"),
            ("DEFAULT_CHAIN_ID", "42161"),
            ("GAS_LIMIT", "1500000"),
            ("EVM_RPC_URL_42161", "https://a.example, https://b.example,"),
            ("DEPLOYMENT_ID", ""),
        ]))?;
        cfg.validate()?;
        assert_eq!(cfg.hub.base_url, "http://127.0.0.1:8080/v1");
        assert_eq!(cfg.hub.oauth_client_id, "client-1");
        assert_eq!(
            cfg.hub.access_token.as_ref().map(|t| t.expose_secret().to_owned()),
            Some("tok".to_owned())
        );
        assert_eq!(cfg.hub.deployment_id, None, "empty values are ignored");
        assert_eq!(cfg.server.public_base_url(), "http://localhost:4100");
        assert_eq!(cfg.default_chain_id()?, 42161);
        assert_eq!(cfg.tx.gas_limit, 1_500_000);
        assert_eq!(
            cfg.evm_rpc_urls()?.get(&42161).cloned().unwrap_or_default(),
            vec!["https://a.example".to_owned(), "https://b.example".to_owned()]
        );
        Ok(())
    }

    #[test]
    fn bad_rpc_env_suffix_is_rejected() {
        let mut cfg = PendleMcpConfig::default();
        let res = cfg.apply_env(&env(&[("EVM_RPC_URL_arbitrum", "https://a.example")]));
        assert!(res.is_err(), "non-numeric chain suffix must fail");
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut cfg = PendleMcpConfig::default();
        cfg.pendle.api_base_url = "http://api.example".into();
        assert!(cfg.validate().is_err(), "plain http to a remote host");

        let mut cfg = PendleMcpConfig::default();
        cfg.pendle.router_address = "0x1234".into();
        assert!(cfg.validate().is_err(), "short router address");

        let mut cfg = PendleMcpConfig::default();
        cfg.pendle.default_chain_id = "mainnet".into();
        assert!(cfg.validate().is_err(), "non-numeric chain id");

        let mut cfg = PendleMcpConfig::default();
        cfg.tx.gas_limit = 21_000;
        assert!(cfg.validate().is_err(), "gas limit at intrinsic cost");
    }

    #[test]
    fn loopback_http_is_allowed_only_for_exact_hosts() {
        assert!(is_loopback_http("http://localhost:8545"));
        assert!(is_loopback_http("http://[::1]/rpc"));
        assert!(!is_loopback_http("http://localhost.evil.example"));
    }

    #[test]
    fn toml_sections_are_partial() -> eyre::Result<()> {
        let cfg: PendleMcpConfig = toml::from_str(
            r#"
log_to_file = true

[pendle]
default_chain_id = "8453"

[rpc.evm_rpc_urls]
8453 = ["http://localhost:8545"]
"#,
        )?;
        cfg.validate()?;
        assert!(cfg.log_to_file);
        assert_eq!(cfg.pendle.api_base_url, DEFAULT_PENDLE_API_BASE_URL);
        assert_eq!(cfg.default_chain_id()?, 8453);
        let rpc = cfg.evm_rpc_urls()?;
        assert_eq!(rpc.len(), 1, "a configured table replaces the defaults");
        Ok(())
    }
}
