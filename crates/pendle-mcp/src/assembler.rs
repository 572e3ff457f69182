//! Turn a trading-API transaction intent into a signed, broadcast transaction.

use crate::{
    auth::AuthContext,
    chains::evm::{parse_address, select_fees, ChainRpc, FeeFields},
    custody::{SignRequest, SignerAccount, WalletCustody},
};
use alloy::{
    consensus::{SignableTransaction as _, TxEip1559, TxLegacy},
    primitives::{Address, Bytes, TxKind, B256, U256},
};
use eyre::Context as _;
use serde_json::Value;

/// `{ to, data, value? }` from a quote's `tx` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl UnsignedTx {
    pub fn from_quote(quote: &Value) -> eyre::Result<Self> {
        let tx = quote
            .get("tx")
            .ok_or_else(|| eyre::eyre!("quote response has no tx"))?;
        let to = tx
            .get("to")
            .and_then(Value::as_str)
            .ok_or_else(|| eyre::eyre!("quote tx has no `to`"))
            .and_then(parse_address)?;
        let data_hex = tx.get("data").and_then(Value::as_str).unwrap_or("0x");
        let data = hex::decode(data_hex.trim_start_matches("0x"))
            .map(Bytes::from)
            .context("decode quote tx data")?;
        let value = parse_value(tx.get("value"))?;
        Ok(Self { to, data, value })
    }
}

fn parse_value(v: Option<&Value>) -> eyre::Result<U256> {
    match v {
        None | Some(Value::Null) => Ok(U256::ZERO),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| eyre::eyre!("tx value must be a non-negative integer")),
        Some(Value::String(s)) => {
            let s = s.trim();
            let parsed = match s.strip_prefix("0x") {
                Some(h) if h.is_empty() => Ok(U256::ZERO),
                Some(h) => U256::from_str_radix(h, 16),
                None if s.is_empty() => Ok(U256::ZERO),
                None => U256::from_str_radix(s, 10),
            };
            parsed.with_context(|| format!("invalid tx value: {s}"))
        }
        Some(other) => eyre::bail!("invalid tx value: {other}"),
    }
}

/// A transaction with every chain-level field filled in, ready to serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTx {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_limit: u64,
    pub fees: FeeFields,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl PreparedTx {
    /// EIP-2718 signing payload: `type || rlp(fields)` for 1559, plain RLP for legacy.
    pub fn signing_payload(&self) -> Bytes {
        let to = TxKind::Call(self.to);
        let encoded = match self.fees {
            FeeFields::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => TxEip1559 {
                chain_id: self.chain_id,
                nonce: self.nonce,
                gas_limit: self.gas_limit,
                max_fee_per_gas,
                max_priority_fee_per_gas,
                to,
                value: self.value,
                input: self.data.clone(),
                ..TxEip1559::default()
            }
            .encoded_for_signing(),
            FeeFields::Legacy { gas_price } => TxLegacy {
                chain_id: Some(self.chain_id),
                nonce: self.nonce,
                gas_price,
                gas_limit: self.gas_limit,
                to,
                value: self.value,
                input: self.data.clone(),
            }
            .encoded_for_signing(),
        };
        Bytes::from(encoded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxAssembler {
    gas_limit: u64,
}

impl TxAssembler {
    pub const fn new(gas_limit: u64) -> Self {
        Self { gas_limit }
    }

    pub async fn prepare(
        &self,
        chain: &dyn ChainRpc,
        chain_id: u64,
        from: Address,
        tx: UnsignedTx,
    ) -> eyre::Result<PreparedTx> {
        let nonce = chain.pending_nonce(chain_id, from).await?;
        let fees = select_fees(chain.fee_quote(chain_id).await?);
        Ok(PreparedTx {
            chain_id,
            nonce,
            gas_limit: self.gas_limit,
            fees,
            to: tx.to,
            data: tx.data,
            value: tx.value,
        })
    }

    /// Prepare, serialize, sign through custody, then broadcast once. Any failure aborts.
    pub async fn submit(
        &self,
        chain: &dyn ChainRpc,
        custody: &dyn WalletCustody,
        auth: &AuthContext,
        signer: &SignerAccount,
        chain_id: u64,
        tx: UnsignedTx,
    ) -> eyre::Result<B256> {
        let from = parse_address(&signer.address)?;
        let prepared = self
            .prepare(chain, chain_id, from, tx)
            .await
            .context("prepare transaction")?;
        let payload = prepared.signing_payload();
        let req = SignRequest {
            wallet_record_id: signer.wallet_record_id.clone(),
            address: signer.address.clone(),
            chain: signer.chain.clone(),
            serialized: format!("0x{}", hex::encode(&payload)),
        };
        let signed = custody
            .sign_transaction(auth, &req)
            .await
            .context("sign transaction")?;
        let hash = chain
            .send_raw_transaction(chain_id, &signed)
            .await
            .context("submit transaction")?;
        tracing::info!(
            chain_id,
            nonce = prepared.nonce,
            tx_hash = %format!("{hash:#x}"),
            "transaction submitted"
        );
        Ok(hash)
    }
}
