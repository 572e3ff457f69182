use serde_json::{json, Value};

const CHAIN_ID_DESC: &str = "Chain id as a decimal string: '1' (Ethereum), '10' (Optimism), '56' (BNB Chain), '137' (Polygon), '8453' (Base), '42161' (Arbitrum). Defaults to the server's configured chain.";

fn chain_id() -> Value {
    json!({ "type": ["string", "integer"], "description": CHAIN_ID_DESC })
}

fn receiver(what: &str) -> Value {
    json!({ "type": "string", "description": format!("Wallet address (0x...) that receives {what}. May differ from the signing wallet.") })
}

fn slippage() -> Value {
    json!({ "type": "number", "minimum": 0, "maximum": 1, "description": "Maximum slippage as a fraction, e.g. 0.005 = 0.5%." })
}

fn address(desc: &str) -> Value {
    json!({ "type": "string", "pattern": "^0x[0-9a-fA-F]{40}$", "description": desc })
}

fn base_amount(desc: &str) -> Value {
    json!({ "type": "string", "pattern": "^[0-9]+$", "description": format!("{desc} In the token's smallest unit, e.g. '1000000' for 1 USDC.") })
}

fn wallet_tool_schemas() -> Vec<Value> {
    vec![
        json!({ "name": "get_user_addresses", "description": "List the addresses held in the caller's custodial wallet records, grouped per record, with the chains each address supports.", "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false } }),
        json!({ "name": "choose_wallet", "description": "Bind one of the caller's custodial addresses to this session. Every signing tool uses the bound address; call this first.", "inputSchema": {
          "type": "object",
          "properties": {
            "address": address("An address returned by get_user_addresses (case-insensitive).")
          },
          "required": ["address"],
          "additionalProperties": false
        }}),
        json!({ "name": "approve_token", "description": "Approve the Pendle router to spend an ERC-20 token from the bound wallet. The amount is in whole tokens and is scaled by the token's on-chain decimals.", "inputSchema": {
          "type": "object",
          "properties": {
            "tokenAddress": address("ERC-20 token contract to approve."),
            "amount": { "type": "string", "description": "Human-readable amount, e.g. '5' or '1.25'." },
            "chainId": chain_id()
          },
          "required": ["tokenAddress", "amount"],
          "additionalProperties": false
        }}),
    ]
}

fn swap_schema(name: &str, description: &str) -> Value {
    json!({ "name": name, "description": description, "inputSchema": {
      "type": "object",
      "properties": {
        "receiver": receiver("the output tokens"),
        "market": address("Pendle market the swap routes through."),
        "slippage": slippage(),
        "tokenIn": address("Token to swap from."),
        "tokenOut": address("Token to receive: PT, YT or an underlying asset of the market."),
        "amountIn": base_amount("Exact input amount."),
        "enableAggregator": { "type": "boolean", "default": false, "description": "Route through DEX aggregators for a better rate." },
        "aggregators": { "type": "string", "description": "Comma-separated aggregator names, e.g. 'kyberswap,okx'. Only used with enableAggregator." },
        "chainId": chain_id()
      },
      "required": ["receiver", "market", "slippage", "tokenIn", "tokenOut", "amountIn"],
      "additionalProperties": false
    }})
}

fn trade_tool_schemas() -> Vec<Value> {
    vec![
        swap_schema("swap", "Swap tokens on a Pendle market. Signs with the bound wallet and returns the transaction hash, amountOut and priceImpact."),
        swap_schema("swap_pt", "Swap into Principal Tokens (PT), redeemable 1:1 for the underlying at maturity."),
        swap_schema("swap_yt", "Swap into Yield Tokens (YT), which capture the underlying's yield until maturity."),
        json!({ "name": "mint", "description": "Mint PT and YT by depositing an underlying asset or SY token.", "inputSchema": {
          "type": "object",
          "properties": {
            "receiver": receiver("the minted PT and YT"),
            "mint_token": address("YT address of the market to mint into."),
            "slippage": slippage(),
            "tokenIn": address("Underlying or SY token to deposit."),
            "amountIn": base_amount("Exact input amount."),
            "chainId": chain_id()
          },
          "required": ["receiver", "mint_token", "slippage", "tokenIn", "amountIn"],
          "additionalProperties": false
        }}),
        json!({ "name": "redeem", "description": "Redeem PT and YT back into SY or an underlying token.", "inputSchema": {
          "type": "object",
          "properties": {
            "receiver": receiver("the redeemed tokens"),
            "slippage": slippage(),
            "redeem_token": address("YT address of the position to redeem."),
            "amountIn": base_amount("Amount of PT/YT to redeem."),
            "tokenOut": address("Token to receive."),
            "chainId": chain_id()
          },
          "required": ["receiver", "slippage", "redeem_token", "amountIn", "tokenOut"],
          "additionalProperties": false
        }}),
    ]
}

fn liquidity_tool_schemas() -> Vec<Value> {
    vec![
        json!({ "name": "add_liquidity", "description": "Add single-sided liquidity to a Pendle market. Returns amountLpOut, amountYtOut (ZPI mode) and priceImpact.", "inputSchema": {
          "type": "object",
          "properties": {
            "receiver": receiver("the LP tokens"),
            "slippage": slippage(),
            "market": address("Pendle market to provide liquidity to."),
            "tokenIn": address("Token to deposit."),
            "amountIn": base_amount("Exact input amount."),
            "zpi": { "type": "boolean", "default": false, "description": "Zero Price Impact mode: keep the YT instead of swapping it." },
            "chainId": chain_id()
          },
          "required": ["receiver", "slippage", "market", "tokenIn", "amountIn"],
          "additionalProperties": false
        }}),
        json!({ "name": "add_liquidity_dual", "description": "Add liquidity with both an underlying token and PT at once.", "inputSchema": {
          "type": "object",
          "properties": {
            "receiver": receiver("the LP tokens"),
            "slippage": slippage(),
            "market": address("Pendle market to provide liquidity to."),
            "tokenIn": address("Underlying token side of the pair (not PT)."),
            "amountTokenIn": base_amount("Underlying token amount."),
            "amountPtIn": base_amount("PT amount."),
            "chainId": chain_id()
          },
          "required": ["receiver", "slippage", "market", "tokenIn", "amountTokenIn", "amountPtIn"],
          "additionalProperties": false
        }}),
        json!({ "name": "remove_liquidity", "description": "Burn LP tokens for a single output token.", "inputSchema": {
          "type": "object",
          "properties": {
            "receiver": receiver("the withdrawn tokens"),
            "slippage": slippage(),
            "market": address("Pendle market to withdraw from."),
            "tokenOut": address("Token to receive."),
            "amountIn": base_amount("LP amount to burn."),
            "chainId": chain_id()
          },
          "required": ["receiver", "slippage", "market", "tokenOut", "amountIn"],
          "additionalProperties": false
        }}),
        json!({ "name": "remove_liquidity_dual", "description": "Burn LP tokens for both a token and PT. Returns amountTokenOut, amountPtOut and priceImpact.", "inputSchema": {
          "type": "object",
          "properties": {
            "receiver": receiver("the withdrawn token and PT"),
            "slippage": slippage(),
            "market": address("Pendle market to withdraw from."),
            "tokenOut": address("Token to receive alongside PT."),
            "amountIn": base_amount("LP amount to burn."),
            "chainId": chain_id()
          },
          "required": ["receiver", "slippage", "market", "tokenOut", "amountIn"],
          "additionalProperties": false
        }}),
        json!({ "name": "transfer_liquidity", "description": "Move an LP/PT/YT position from one Pendle market to another in one transaction.", "inputSchema": {
          "type": "object",
          "properties": {
            "receiver": receiver("the position in the destination market"),
            "slippage": slippage(),
            "srcMarket": address("Market the position leaves."),
            "dstMarket": address("Market the position enters."),
            "lpAmount": base_amount("LP amount to move; '0' for none."),
            "ptAmount": base_amount("PT amount to move; '0' for none."),
            "ytAmount": base_amount("YT amount to move; '0' for none."),
            "zpi": { "type": "boolean", "default": false, "description": "Zero Price Impact mode." },
            "aggregators": { "type": "string", "description": "Comma-separated aggregator names for the routing leg." },
            "chainId": chain_id()
          },
          "required": ["receiver", "slippage", "srcMarket", "dstMarket", "lpAmount", "ptAmount", "ytAmount"],
          "additionalProperties": false
        }}),
    ]
}

fn market_data_tool_schemas() -> Vec<Value> {
    vec![
        json!({ "name": "get_asset_prices", "description": "Current USD prices for Pendle assets (PT, YT, SY, LP and underlyings) on a chain. Read-only.", "inputSchema": {
          "type": "object",
          "properties": {
            "chainId": chain_id(),
            "addresses": { "type": "string", "description": "Optional comma-separated token addresses. Omit for every asset on the chain." }
          },
          "additionalProperties": false
        }}),
        json!({ "name": "get_historical_prices", "description": "OHLCV price history for one Pendle asset. Read-only.", "inputSchema": {
          "type": "object",
          "properties": {
            "chainId": chain_id(),
            "address": address("Asset to chart."),
            "timeFrame": { "type": "string", "enum": ["hour", "day", "week"], "default": "day" },
            "timestampStart": { "type": ["string", "integer"], "description": "Unix seconds, inclusive." },
            "timestampEnd": { "type": ["string", "integer"], "description": "Unix seconds, inclusive." }
          },
          "required": ["address"],
          "additionalProperties": false
        }}),
        json!({ "name": "get_assets", "description": "List Pendle assets with optional filters. Read-only.", "inputSchema": {
          "type": "object",
          "properties": {
            "chainId": chain_id(),
            "order_by": { "type": "string", "description": "Sort key, e.g. 'name:1'." },
            "skip": { "type": "integer", "minimum": 0 },
            "limit": { "type": "integer", "minimum": 1 },
            "is_expired": { "type": "boolean" },
            "zappable": { "type": "boolean" },
            "type": { "type": "string", "description": "PT, YT, SY, PENDLE_LP or UNDERLYING." },
            "address": address("Exact asset address."),
            "q": { "type": "string", "description": "Free-text search on name or symbol." }
          },
          "additionalProperties": false
        }}),
        json!({ "name": "get_markets", "description": "List active Pendle markets on a chain. Read-only.", "inputSchema": {
          "type": "object",
          "properties": { "chainId": chain_id() },
          "additionalProperties": false
        }}),
    ]
}

pub fn list_tools_result() -> Value {
    let mut tools = wallet_tool_schemas();
    tools.extend(trade_tool_schemas());
    tools.extend(liquidity_tool_schemas());
    tools.extend(market_data_tool_schemas());
    json!({ "tools": tools })
}
