//! The state-changing Pendle operations, described as data.
//!
//! Every quoted operation runs the same pipeline; what differs is the API path, how tool
//! arguments map onto query parameters and which result fields are reported back.

use super::params::{self, ArgResult};
use serde_json::{Map, Value};
use FieldKind::{Address, Amount, FlagIfTrue, ListIfNonEmpty, Slippage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotedOp {
    Swap,
    SwapPt,
    SwapYt,
    Mint,
    AddLiquidity,
    AddLiquidityDual,
    RemoveLiquidity,
    RemoveLiquidityDual,
    TransferLiquidity,
    Redeem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// `/{version}/sdk/{chainId}/markets/{market}/{suffix}`; `market` comes from the arguments.
    Market(&'static str),
    /// `/{version}/sdk/{chainId}/{suffix}`
    Plain(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Address,
    Amount,
    Slippage,
    /// Sent as `true` only when set; omitted otherwise.
    FlagIfTrue,
    /// Sent comma-joined only when non-empty.
    ListIfNonEmpty,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    pub arg: &'static str,
    pub param: &'static str,
    pub kind: FieldKind,
}

const fn field(arg: &'static str, kind: FieldKind) -> FieldMap {
    FieldMap {
        arg,
        param: arg,
        kind,
    }
}

const fn renamed(arg: &'static str, param: &'static str, kind: FieldKind) -> FieldMap {
    FieldMap { arg, param, kind }
}

#[derive(Debug, Clone, Copy)]
pub struct OpSpec {
    pub tool: &'static str,
    pub alias: &'static str,
    pub version: &'static str,
    pub resource: Resource,
    pub fields: &'static [FieldMap],
    pub result_fields: &'static [&'static str],
    /// Success text prefix: "{action} successfully for {receiver}".
    pub action: &'static str,
}

const SWAP_FIELDS: &[FieldMap] = &[
    field("receiver", Address),
    field("slippage", Slippage),
    field("tokenIn", Address),
    field("tokenOut", Address),
    field("amountIn", Amount),
    field("enableAggregator", FlagIfTrue),
    field("aggregators", ListIfNonEmpty),
];

const MINT_FIELDS: &[FieldMap] = &[
    field("receiver", Address),
    field("slippage", Slippage),
    renamed("mint_token", "yt", Address),
    field("tokenIn", Address),
    field("amountIn", Amount),
];

const ADD_LIQUIDITY_FIELDS: &[FieldMap] = &[
    field("receiver", Address),
    field("slippage", Slippage),
    field("tokenIn", Address),
    field("amountIn", Amount),
    field("zpi", FlagIfTrue),
];

const ADD_LIQUIDITY_DUAL_FIELDS: &[FieldMap] = &[
    field("receiver", Address),
    field("slippage", Slippage),
    field("tokenIn", Address),
    field("amountTokenIn", Amount),
    field("amountPtIn", Amount),
];

const REMOVE_LIQUIDITY_FIELDS: &[FieldMap] = &[
    field("receiver", Address),
    field("slippage", Slippage),
    field("tokenOut", Address),
    field("amountIn", Amount),
];

const TRANSFER_LIQUIDITY_FIELDS: &[FieldMap] = &[
    field("receiver", Address),
    field("slippage", Slippage),
    field("srcMarket", Address),
    field("dstMarket", Address),
    field("lpAmount", Amount),
    field("ptAmount", Amount),
    field("ytAmount", Amount),
    field("zpi", FlagIfTrue),
    field("aggregators", ListIfNonEmpty),
];

const REDEEM_FIELDS: &[FieldMap] = &[
    field("receiver", Address),
    field("slippage", Slippage),
    renamed("redeem_token", "yt", Address),
    field("amountIn", Amount),
    field("tokenOut", Address),
];

const OUT_AND_IMPACT: &[&str] = &["amountOut", "priceImpact"];
const LP_OUT: &[&str] = &["amountLpOut", "amountYtOut", "priceImpact"];
const DUAL_OUT: &[&str] = &["amountTokenOut", "amountPtOut", "priceImpact"];

const fn swap_spec(tool: &'static str, alias: &'static str) -> OpSpec {
    OpSpec {
        tool,
        alias,
        version: "v2",
        resource: Resource::Market("swap"),
        fields: SWAP_FIELDS,
        result_fields: OUT_AND_IMPACT,
        action: "Swap tokens",
    }
}

impl QuotedOp {
    pub const ALL: [Self; 10] = [
        Self::Swap,
        Self::SwapPt,
        Self::SwapYt,
        Self::Mint,
        Self::AddLiquidity,
        Self::AddLiquidityDual,
        Self::RemoveLiquidity,
        Self::RemoveLiquidityDual,
        Self::TransferLiquidity,
        Self::Redeem,
    ];

    pub fn from_tool(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| {
            let s = op.spec();
            s.tool == name || s.alias == name
        })
    }

    pub const fn spec(self) -> OpSpec {
        match self {
            Self::Swap => swap_spec("swap", "swap"),
            Self::SwapPt => swap_spec("swap_pt", "swapPT"),
            Self::SwapYt => swap_spec("swap_yt", "swapYT"),
            Self::Mint => OpSpec {
                tool: "mint",
                alias: "mint",
                version: "v2",
                resource: Resource::Plain("mint"),
                fields: MINT_FIELDS,
                result_fields: OUT_AND_IMPACT,
                action: "Mint tokens",
            },
            Self::AddLiquidity => OpSpec {
                tool: "add_liquidity",
                alias: "addLiquidity",
                version: "v1",
                resource: Resource::Market("add-liquidity"),
                fields: ADD_LIQUIDITY_FIELDS,
                result_fields: LP_OUT,
                action: "Add liquidity",
            },
            Self::AddLiquidityDual => OpSpec {
                tool: "add_liquidity_dual",
                alias: "addLiquidityDual",
                version: "v1",
                resource: Resource::Market("add-liquidity-dual"),
                fields: ADD_LIQUIDITY_DUAL_FIELDS,
                result_fields: OUT_AND_IMPACT,
                action: "Add dual liquidity",
            },
            Self::RemoveLiquidity => OpSpec {
                tool: "remove_liquidity",
                alias: "removeLiquidity",
                version: "v1",
                resource: Resource::Market("remove-liquidity"),
                fields: REMOVE_LIQUIDITY_FIELDS,
                result_fields: OUT_AND_IMPACT,
                action: "Remove liquidity",
            },
            Self::RemoveLiquidityDual => OpSpec {
                tool: "remove_liquidity_dual",
                alias: "removeLiquidityDual",
                version: "v1",
                resource: Resource::Market("remove-liquidity-dual"),
                fields: REMOVE_LIQUIDITY_FIELDS,
                result_fields: DUAL_OUT,
                action: "Remove dual liquidity",
            },
            Self::TransferLiquidity => OpSpec {
                tool: "transfer_liquidity",
                alias: "transferLiquidity",
                version: "v1",
                resource: Resource::Plain("markets/transfer-liquidity"),
                fields: TRANSFER_LIQUIDITY_FIELDS,
                result_fields: LP_OUT,
                action: "Transfer liquidity",
            },
            Self::Redeem => OpSpec {
                tool: "redeem",
                alias: "redeem",
                version: "v2",
                resource: Resource::Plain("redeem"),
                fields: REDEEM_FIELDS,
                result_fields: OUT_AND_IMPACT,
                action: "Redeem tokens",
            },
        }
    }
}

/// A fully-validated request for the trading API.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub receiver: String,
}

impl OpSpec {
    pub fn build(&self, args: &Value, chain_id: u64) -> ArgResult<QuoteRequest> {
        let path = match self.resource {
            Resource::Market(suffix) => {
                let market = params::address(args, "market")?;
                format!("/{}/sdk/{chain_id}/markets/{market}/{suffix}", self.version)
            }
            Resource::Plain(suffix) => format!("/{}/sdk/{chain_id}/{suffix}", self.version),
        };

        let mut query = Vec::with_capacity(self.fields.len());
        for f in self.fields {
            let value = match f.kind {
                FieldKind::Address => Some(params::address(args, f.arg)?),
                FieldKind::Amount => Some(params::base_amount(args, f.arg)?),
                FieldKind::Slippage => Some(params::slippage(args)?.to_string()),
                FieldKind::FlagIfTrue => params::flag(args, f.arg)?.then(|| "true".to_owned()),
                FieldKind::ListIfNonEmpty => {
                    Some(params::csv_list(args, f.arg)?.join(",")).filter(|s| !s.is_empty())
                }
            };
            if let Some(v) = value {
                query.push((f.param.to_owned(), v));
            }
        }

        let receiver = params::address(args, "receiver")?;
        Ok(QuoteRequest {
            path,
            query,
            receiver,
        })
    }

    /// Pick the reported result fields out of a quote's `data` object; absent ones are skipped.
    pub fn result_data(&self, quote: &Value) -> Map<String, Value> {
        let data = quote.get("data");
        self.result_fields
            .iter()
            .filter_map(|k| {
                data.and_then(|d| d.get(*k))
                    .filter(|v| !v.is_null())
                    .map(|v| ((*k).to_owned(), v.clone()))
            })
            .collect()
    }

    pub fn success_message(&self, receiver: &str) -> String {
        format!("{} successfully for {receiver}", self.action)
    }
}
