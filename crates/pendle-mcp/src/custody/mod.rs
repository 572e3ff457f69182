//! Wallet custody seam: wallet records and delegated signing.
//!
//! Private keys never reach this process. The custody service owns them; we look up which
//! addresses a caller may use and hand it serialized transactions to sign.

use crate::auth::AuthContext;
use alloy::primitives::Bytes;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

mod hub;

pub use hub::HubCustody;

/// Family-wide chain entries that cover every `evm:eip155:*` chain.
const EVM_FAMILY: [&str; 2] = ["evm", "evm:eip155"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainAddress {
    pub address: String,
    #[serde(default)]
    pub chains: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAccount {
    #[serde(default)]
    pub addresses: Vec<ChainAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub id: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub accounts: Vec<WalletAccount>,
}

impl WalletRecord {
    pub fn addresses(&self) -> impl Iterator<Item = &ChainAddress> {
        self.accounts.iter().flat_map(|a| a.addresses.iter())
    }

    pub fn holds(&self, address: &str) -> bool {
        self.addresses()
            .any(|a| a.address.eq_ignore_ascii_case(address))
    }
}

fn one_or_many<'de, D>(d: D) -> Result<Vec<WalletAccount>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(WalletAccount),
        Many(Vec<WalletAccount>),
    }
    Ok(match Option::<OneOrMany>::deserialize(d)? {
        Some(OneOrMany::One(a)) => vec![a],
        Some(OneOrMany::Many(v)) => v,
        None => Vec::new(),
    })
}

/// A custody account able to sign for `address` on `chain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerAccount {
    pub wallet_record_id: String,
    pub address: String,
    pub chain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub wallet_record_id: String,
    pub address: String,
    pub chain: String,
    /// `0x`-prefixed signing payload.
    pub serialized: String,
}

/// CAIP-style chain identifier used by the custody service.
pub fn caip_chain(chain_id: u64) -> String {
    format!("evm:eip155:{chain_id}")
}

pub fn chain_supported(chains: &[String], chain: &str) -> bool {
    chains.is_empty()
        || chains
            .iter()
            .any(|c| c == chain || EVM_FAMILY.contains(&c.as_str()))
}

pub fn find_record<'a>(records: &'a [WalletRecord], address: &str) -> Option<&'a WalletRecord> {
    records.iter().find(|r| r.holds(address))
}

pub fn find_account(records: &[WalletRecord], address: &str, chain: &str) -> Option<SignerAccount> {
    records.iter().find_map(|r| {
        r.addresses()
            .find(|a| a.address.eq_ignore_ascii_case(address) && chain_supported(&a.chains, chain))
            .map(|a| SignerAccount {
                wallet_record_id: r.id.clone(),
                address: a.address.clone(),
                chain: chain.to_owned(),
            })
    })
}

#[async_trait]
pub trait WalletCustody: Send + Sync {
    async fn wallet_records(&self, auth: &AuthContext) -> eyre::Result<Vec<WalletRecord>>;

    /// Sign a serialized transaction; returns the broadcast-ready raw bytes.
    async fn sign_transaction(&self, auth: &AuthContext, req: &SignRequest) -> eyre::Result<Bytes>;

    async fn resolve_account(
        &self,
        auth: &AuthContext,
        address: &str,
        chain: &str,
    ) -> eyre::Result<Option<SignerAccount>> {
        let records = self.wallet_records(auth).await?;
        Ok(find_account(&records, address, chain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, addr: &str, chains: &[&str]) -> WalletRecord {
        WalletRecord {
            id: id.to_owned(),
            accounts: vec![WalletAccount {
                addresses: vec![ChainAddress {
                    address: addr.to_owned(),
                    chains: chains.iter().map(|c| (*c).to_owned()).collect(),
                }],
            }],
        }
    }

    #[test]
    fn accounts_accept_single_object_or_list() -> eyre::Result<()> {
        let one: WalletRecord = serde_json::from_value(json!({
            "id": "w1",
            "accounts": { "addresses": [{ "address": "0xAb", "chains": ["evm:eip155:1"] }] }
        }))?;
        let many: WalletRecord = serde_json::from_value(json!({
            "id": "w2",
            "accounts": [{ "addresses": [{ "address": "0xCd" }] }, { "addresses": [] }]
        }))?;
        assert_eq!(one.accounts.len(), 1);
        assert_eq!(many.accounts.len(), 2);
        assert_eq!(many.addresses().count(), 1);
        Ok(())
    }

    #[test]
    fn record_lookup_ignores_case() {
        let records = vec![record("w1", "0xAbCdEf0000000000000000000000000000000001", &[])];
        let hit = find_record(&records, "0xabcdef0000000000000000000000000000000001");
        assert_eq!(hit.map(|r| r.id.as_str()), Some("w1"));
        assert!(find_record(&records, "0x0000000000000000000000000000000000000002").is_none());
    }

    #[test]
    fn account_requires_matching_chain() {
        let records = vec![
            record("poly", "0xAA", &["evm:eip155:137"]),
            record("fam", "0xBB", &["evm"]),
        ];
        assert!(find_account(&records, "0xaa", &caip_chain(1)).is_none());
        assert_eq!(
            find_account(&records, "0xaa", &caip_chain(137)).map(|a| a.wallet_record_id),
            Some("poly".to_owned())
        );
        assert_eq!(
            find_account(&records, "0xbb", &caip_chain(42_161)).map(|a| a.address),
            Some("0xBB".to_owned())
        );
    }
}
