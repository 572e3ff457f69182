//! The shared pipeline behind every quoted, state-changing operation.

use super::Dispatcher;
use crate::{
    assembler::UnsignedTx, auth::CallAuth, envelope::Envelope, pendle::params,
    pendle::QuotedOp,
};
use eyre::Context as _;
use serde_json::{Map, Value};

pub(super) async fn run(
    d: &Dispatcher,
    op: QuotedOp,
    args: &Value,
    auth: &CallAuth,
) -> eyre::Result<Envelope> {
    let spec = op.spec();
    let ctx = auth.require()?;
    // Arguments are validated before anything leaves the process.
    let chain_id = params::chain_id(args, d.settings.default_chain_id)?;
    let req = spec.build(args, chain_id)?;

    let signer = d.signer(ctx, chain_id).await?;
    let quote = d.api.get(&req.path, &req.query).await?;
    let tx = UnsignedTx::from_quote(&quote).context("read quote transaction")?;
    let hash = d
        .assembler
        .submit(d.chain.as_ref(), d.custody.as_ref(), ctx, &signer, chain_id, tx)
        .await?;

    let mut data = Map::new();
    data.insert("hash".to_owned(), Value::String(format!("{hash:#x}")));
    data.extend(spec.result_data(&quote));
    Ok(Envelope::success(
        spec.success_message(&req.receiver),
        Value::Object(data),
    ))
}
