use super::params::{self, ArgResult};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOp {
    AssetPrices,
    HistoricalPrices,
    Assets,
    Markets,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadQuery {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub message: String,
}

const ASSET_FILTERS: [&str; 3] = ["order_by", "type", "q"];

impl ReadOp {
    pub const ALL: [Self; 4] = [
        Self::AssetPrices,
        Self::HistoricalPrices,
        Self::Assets,
        Self::Markets,
    ];

    pub const fn tool(self) -> &'static str {
        match self {
            Self::AssetPrices => "get_asset_prices",
            Self::HistoricalPrices => "get_historical_prices",
            Self::Assets => "get_assets",
            Self::Markets => "get_markets",
        }
    }

    pub const fn alias(self) -> &'static str {
        match self {
            Self::AssetPrices => "getAssetPrices",
            Self::HistoricalPrices => "getHistoricalPrices",
            Self::Assets => "getAssets",
            Self::Markets => "getMarkets",
        }
    }

    pub fn from_tool(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.tool() == name || op.alias() == name)
    }

    pub fn build(self, args: &Value, chain_id: u64) -> ArgResult<ReadQuery> {
        let mut query = Vec::new();
        let (path, message) = match self {
            Self::AssetPrices => {
                let addresses = params::csv_list(args, "addresses")?;
                if let Some(bad) = addresses.iter().find(|a| !params::is_evm_address(a)) {
                    return Err(crate::errors::PendleMcpError::invalid(
                        "addresses",
                        format!("{bad} is not a valid address"),
                    ));
                }
                if !addresses.is_empty() {
                    query.push(("addresses".to_owned(), addresses.join(",")));
                }
                (
                    format!("/v1/{chain_id}/assets/prices"),
                    format!("Retrieved asset prices for chain {chain_id}"),
                )
            }
            Self::HistoricalPrices => {
                let address = params::address(args, "address")?;
                query.push(("time_frame".to_owned(), params::time_frame(args)?.to_owned()));
                for (arg, param) in [
                    ("timestampStart", "timestamp_start"),
                    ("timestampEnd", "timestamp_end"),
                ] {
                    if let Some(ts) = params::optional_u64(args, arg)? {
                        query.push((param.to_owned(), ts.to_string()));
                    }
                }
                (
                    format!("/v4/{chain_id}/prices/{address}/ohlcv"),
                    format!("Retrieved historical prices for {address} on chain {chain_id}"),
                )
            }
            Self::Assets => {
                for key in ["skip", "limit"] {
                    if let Some(n) = params::optional_u64(args, key)? {
                        query.push((key.to_owned(), n.to_string()));
                    }
                }
                for key in ["is_expired", "zappable"] {
                    if let Some(b) = params::optional_flag(args, key)? {
                        query.push((key.to_owned(), b.to_string()));
                    }
                }
                for key in ASSET_FILTERS {
                    if let Some(s) = params::optional_str(args, key)? {
                        query.push((key.to_owned(), s));
                    }
                }
                if let Some(a) = params::optional_address(args, "address")? {
                    query.push(("address".to_owned(), a));
                }
                (
                    format!("/v3/{chain_id}/assets/all"),
                    format!("Retrieved assets for chain {chain_id}"),
                )
            }
            Self::Markets => (
                format!("/v1/{chain_id}/markets/active"),
                format!("Retrieved active markets for chain {chain_id}"),
            ),
        };
        Ok(ReadQuery {
            path,
            query,
            message,
        })
    }
}
