use super::Dispatcher;
use crate::{auth::CallAuth, envelope::Envelope, pendle::params, pendle::ReadOp};
use serde_json::Value;

/// Read-only lookups: no wallet, no signing; the API body is the envelope data.
pub(super) async fn run(
    d: &Dispatcher,
    op: ReadOp,
    args: &Value,
    auth: &CallAuth,
) -> eyre::Result<Envelope> {
    auth.require()?;
    let chain_id = params::chain_id(args, d.settings.default_chain_id)?;
    let q = op.build(args, chain_id)?;
    let body = d.api.get(&q.path, &q.query).await?;
    Ok(Envelope::success(q.message, body))
}
