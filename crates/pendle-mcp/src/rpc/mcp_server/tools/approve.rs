use super::Dispatcher;
use crate::{
    amount::parse_amount_ui_to_base_u256,
    assembler::UnsignedTx,
    auth::CallAuth,
    chains::evm::{approve_calldata, parse_address},
    envelope::Envelope,
    errors::PendleMcpError,
    pendle::params,
};
use alloy::primitives::U256;
use eyre::Context as _;
use serde_json::{json, Value};

/// ERC-20 `approve(router, amount * 10^decimals)` signed by the session wallet.
pub(super) async fn approve_token(
    d: &Dispatcher,
    args: &Value,
    auth: &CallAuth,
) -> eyre::Result<Envelope> {
    let ctx = auth.require()?;
    let chain_id = params::chain_id(args, d.settings.default_chain_id)?;
    let token = params::address(args, "tokenAddress")?;
    let amount = params::ui_amount(args, "amount")?;
    let token_addr = parse_address(&token)?;

    let signer = d.signer(ctx, chain_id).await?;
    let decimals = d
        .chain
        .erc20_decimals(chain_id, token_addr)
        .await
        .context("read token decimals")?;
    let scaled = parse_amount_ui_to_base_u256(&amount, decimals)
        .map_err(|e| PendleMcpError::invalid("amount", e.to_string()))?;

    let spender = d.settings.router;
    let tx = UnsignedTx {
        to: token_addr,
        data: approve_calldata(spender, scaled),
        value: U256::ZERO,
    };
    let hash = d
        .assembler
        .submit(d.chain.as_ref(), d.custody.as_ref(), ctx, &signer, chain_id, tx)
        .await?;

    Ok(Envelope::success(
        format!("Approved {amount} of {token} for {spender}"),
        json!({
            "hash": format!("{hash:#x}"),
            "spender": spender.to_checksum(None),
            "amount": scaled.to_string(),
        }),
    ))
}
