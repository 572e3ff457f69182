//! Wallet management: list the caller's custodial addresses and bind one to the session.

use super::Dispatcher;
use crate::{
    auth::CallAuth, custody::find_record, envelope::Envelope, errors::PendleMcpError,
    pendle::params,
};
use serde_json::{json, Value};
use tracing::info;

pub(super) async fn get_user_addresses(d: &Dispatcher, auth: &CallAuth) -> eyre::Result<Envelope> {
    let ctx = auth.require()?;
    let records = d.custody.wallet_records(ctx).await?;
    if records.is_empty() {
        return Err(PendleMcpError::NoWalletRecords.into());
    }
    let addresses: Vec<Value> = records
        .iter()
        .map(|r| {
            r.addresses()
                .map(|a| json!({ "chains": a.chains, "address": a.address }))
                .collect()
        })
        .collect();
    Ok(Envelope::success(
        "Successfully got user addresses",
        json!({ "addresses": addresses }),
    ))
}

pub(super) async fn choose_wallet(
    d: &Dispatcher,
    args: &Value,
    auth: &CallAuth,
) -> eyre::Result<Envelope> {
    let ctx = auth.require()?;
    let address = params::address(args, "address")?;
    let records = d.custody.wallet_records(ctx).await?;
    if records.is_empty() {
        return Err(PendleMcpError::NoWalletRecords.into());
    }
    let record = find_record(&records, &address).ok_or(PendleMcpError::WalletRecordNotFound)?;

    let previous = d.registry.bind(&ctx.session_id, &address);
    info!(
        session_id = %ctx.session_id,
        wallet_record_id = %record.id,
        rebound = previous.is_some(),
        "wallet bound to session"
    );
    Ok(Envelope::success(
        "Successfully chose wallet",
        json!({ "walletRecordId": record.id }),
    ))
}
