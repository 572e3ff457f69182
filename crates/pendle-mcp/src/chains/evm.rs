use crate::retry::{first_success, RetryPolicy};
use alloy::{
    primitives::{keccak256, Address, Bytes, B256, U256},
    providers::{Provider as _, RootProvider},
    rpc::types::BlockNumberOrTag,
    sol,
    sol_types::SolCall as _,
};
use async_trait::async_trait;
use eyre::Context as _;
use std::{collections::BTreeMap, str::FromStr as _, time::Duration};

const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_RPC_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MIN_PRIORITY_FEE: u128 = 1_500_000_000;

sol! {
    #[sol(rpc)]
    contract IERC20 {
        function decimals() external view returns (uint8);
        function approve(address spender, uint256 value) returns (bool);
    }
}

/// Fee inputs observed on chain: pending block base fee (if any) and the node's gas price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    pub base_fee: Option<u128>,
    pub gas_price: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeFields {
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
    Legacy {
        gas_price: u128,
    },
}

/// Returns `(max_fee, priority)`: priority is `max(1.5 gwei, gas_price / 10)`, max fee is
/// `2 * base_fee + priority`.
pub fn compute_eip1559_fees(base_fee: u128, gas_price: u128) -> (u128, u128) {
    let priority = MIN_PRIORITY_FEE.max(gas_price / 10);
    let max_fee = base_fee
        .saturating_mul(2)
        .saturating_add(priority)
        .max(base_fee.saturating_add(priority));
    (max_fee, priority)
}

/// EIP-1559 when the chain reports a base fee, legacy gas price otherwise.
pub fn select_fees(q: FeeQuote) -> FeeFields {
    match q.base_fee {
        Some(base_fee) => {
            let (max_fee_per_gas, max_priority_fee_per_gas) =
                compute_eip1559_fees(base_fee, q.gas_price);
            FeeFields::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            }
        }
        None => FeeFields::Legacy {
            gas_price: q.gas_price,
        },
    }
}

pub fn parse_address(s: &str) -> eyre::Result<Address> {
    Address::from_str(s.trim()).with_context(|| format!("invalid evm address: {s}"))
}

pub fn approve_calldata(spender: Address, value: U256) -> Bytes {
    Bytes::from(IERC20::approveCall { spender, value }.abi_encode())
}

fn broadcast_err_is_ok(err: &eyre::Report) -> bool {
    let s = format!("{err:#}").to_lowercase();
    ["already known", "known transaction", "already imported"]
        .iter()
        .any(|needle| s.contains(needle))
}

/// Chain access needed to prepare and submit a transaction.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn fee_quote(&self, chain_id: u64) -> eyre::Result<FeeQuote>;
    async fn pending_nonce(&self, chain_id: u64, address: Address) -> eyre::Result<u64>;
    async fn erc20_decimals(&self, chain_id: u64, token: Address) -> eyre::Result<u8>;
    /// Submit once; never retried.
    async fn send_raw_transaction(&self, chain_id: u64, raw: &Bytes) -> eyre::Result<B256>;
}

/// JSON-RPC access to the configured EVM chains. The first URL per chain is the primary.
#[derive(Debug, Clone)]
pub struct EvmRpc {
    urls: BTreeMap<u64, Vec<String>>,
    retry: RetryPolicy,
}

impl EvmRpc {
    pub fn new(urls: BTreeMap<u64, Vec<String>>, retry: RetryPolicy) -> Self {
        let urls = urls
            .into_iter()
            .map(|(id, list)| {
                let mut seen: Vec<String> = Vec::with_capacity(list.len());
                for u in list {
                    let t = u.trim();
                    if !t.is_empty() && !seen.iter().any(|x| x == t) {
                        seen.push(t.to_owned());
                    }
                }
                (id, seen)
            })
            .filter(|(_, list)| !list.is_empty())
            .collect();
        Self { urls, retry }
    }

    pub fn chains(&self) -> impl Iterator<Item = u64> + '_ {
        self.urls.keys().copied()
    }

    fn urls_for(&self, chain_id: u64) -> eyre::Result<&[String]> {
        self.urls
            .get(&chain_id)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                eyre::eyre!(
                    "no rpc url configured for chain {chain_id} (set EVM_RPC_URL_{chain_id})"
                )
            })
    }

    fn provider_for_url(url: &str) -> eyre::Result<RootProvider> {
        let u: reqwest::Url = url
            .parse()
            .with_context(|| format!("invalid rpc url: {url}"))?;
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_RPC_TIMEOUT)
            .connect_timeout(DEFAULT_RPC_CONNECT_TIMEOUT)
            .build()
            .context("build rpc http client")?;
        let http = alloy::transports::http::Http::with_client(client, u);
        let rpc_client = alloy::rpc::client::RpcClient::new(http, false);
        Ok(RootProvider::new(rpc_client))
    }

    async fn read_with_fallback<T, Fut>(
        &self,
        chain_id: u64,
        label: &'static str,
        f: impl Fn(RootProvider) -> Fut + Sync,
    ) -> eyre::Result<T>
    where
        T: Send,
        Fut: std::future::Future<Output = eyre::Result<T>> + Send,
    {
        let urls = self.urls_for(chain_id)?;
        first_success(urls, &self.retry, label, |u| {
            let u = u.clone();
            let f = &f;
            async move { f(Self::provider_for_url(&u)?).await }
        })
        .await
    }
}

#[async_trait]
impl ChainRpc for EvmRpc {
    async fn fee_quote(&self, chain_id: u64) -> eyre::Result<FeeQuote> {
        self.read_with_fallback(chain_id, "fee quote", |p| async move {
            let base_fee = p
                .get_block_by_number(BlockNumberOrTag::Pending)
                .await
                .ok()
                .flatten()
                .and_then(|b| b.header.base_fee_per_gas.map(u128::from));
            let gas_price = p.get_gas_price().await.context("get gas price")?;
            Ok(FeeQuote {
                base_fee,
                gas_price,
            })
        })
        .await
    }

    async fn pending_nonce(&self, chain_id: u64, address: Address) -> eyre::Result<u64> {
        self.read_with_fallback(chain_id, "pending nonce", |p| async move {
            p.get_transaction_count(address)
                .pending()
                .await
                .context("get nonce")
        })
        .await
    }

    async fn erc20_decimals(&self, chain_id: u64, token: Address) -> eyre::Result<u8> {
        self.read_with_fallback(chain_id, "erc20 decimals", |p| async move {
            IERC20::new(token, &p)
                .decimals()
                .call()
                .await
                .context("erc20 decimals")
        })
        .await
    }

    async fn send_raw_transaction(&self, chain_id: u64, raw: &Bytes) -> eyre::Result<B256> {
        let primary = self
            .urls_for(chain_id)?
            .first()
            .ok_or_else(|| eyre::eyre!("no rpc url configured for chain {chain_id}"))?;
        let p = Self::provider_for_url(primary)?;
        match p.send_raw_transaction(raw).await {
            Ok(pending) => Ok(*pending.tx_hash()),
            Err(e) => {
                let report: eyre::Report = e.into();
                if broadcast_err_is_ok(&report) {
                    Ok(keccak256(raw))
                } else {
                    Err(report).context("broadcast raw tx")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eip1559_fee_policy_is_conservative() {
        let (max_fee, priority) = compute_eip1559_fees(10_000_000_000, 20_000_000_000);
        assert_eq!(priority, 2_000_000_000, "priority = gas_price / 10");
        assert_eq!(max_fee, 22_000_000_000, "max_fee = 2 * base + priority");
    }

    #[test]
    fn priority_fee_has_floor() {
        let (_max_fee, priority) = compute_eip1559_fees(1_000_000_000, 5_000_000_000);
        assert_eq!(priority, MIN_PRIORITY_FEE);
    }

    #[test]
    fn fee_selection_follows_base_fee_presence() {
        assert!(matches!(
            select_fees(FeeQuote { base_fee: Some(1), gas_price: 10 }),
            FeeFields::Eip1559 { .. }
        ));
        assert_eq!(
            select_fees(FeeQuote { base_fee: None, gas_price: 7 }),
            FeeFields::Legacy { gas_price: 7 }
        );
    }

    #[test]
    fn approve_calldata_encodes_spender_and_amount() -> eyre::Result<()> {
        let spender = parse_address("0x888888888889758F76e7103c6CbF23ABbF58F946")?;
        let data = approve_calldata(spender, U256::from(5_000_000_u64));
        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(hex::encode(data.get(..4).unwrap_or_default()), "095ea7b3");
        let hex_all = hex::encode(&data);
        assert!(
            hex_all.ends_with("00000000000000000000000000000000000000000000000000000000004c4b40"),
            "amount word: {hex_all}"
        );
        assert!(hex_all.contains("888888888889758f76e7103c6cbf23abbf58f946"));
        Ok(())
    }

    #[test]
    fn already_known_counts_as_broadcast() {
        assert!(broadcast_err_is_ok(&eyre::eyre!("server returned: already known")));
        assert!(!broadcast_err_is_ok(&eyre::eyre!("nonce too low")));
    }

    #[test]
    fn rpc_urls_are_deduped_and_empty_chains_dropped() {
        let rpc = EvmRpc::new(
            BTreeMap::from([
                (1, vec!["https://a".to_owned(), " https://a ".to_owned(), "https://b".to_owned()]),
                (10, vec![String::new()]),
            ]),
            RetryPolicy::immediate(1),
        );
        assert_eq!(rpc.chains().collect::<Vec<_>>(), vec![1]);
        assert_eq!(rpc.urls_for(1).map(<[String]>::len).ok(), Some(2));
        assert!(rpc.urls_for(10).is_err());
    }
}
