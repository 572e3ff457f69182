use alloy::primitives::U256;
use eyre::Context as _;

/// Validate a base-unit integer amount (e.g. wei) given as a decimal string.
///
/// The digits are kept as a string so 18-decimal amounts never pass through a float.
pub fn parse_amount_base(s: &str) -> eyre::Result<String> {
    let s = s.trim();
    if s.is_empty() {
        eyre::bail!("empty amount");
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        eyre::bail!("amount must be a non-negative integer in base units");
    }
    U256::from_str_radix(s, 10).context("amount exceeds uint256")?;
    Ok(s.to_owned())
}

/// Scale a human decimal amount ("1.5") by `10^decimals` exactly.
pub fn parse_amount_ui_to_base_u256(s: &str, decimals: u8) -> eyre::Result<U256> {
    let s = s.trim();
    if s.is_empty() {
        eyre::bail!("empty amount");
    }

    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));

    if whole.starts_with('-') {
        eyre::bail!("amount must be non-negative");
    }
    if whole.is_empty() && frac.is_empty() {
        eyre::bail!("amount has no digits");
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        eyre::bail!("amount must be a decimal number");
    }

    let decimals_len = usize::from(decimals);
    if frac.len() > decimals_len {
        eyre::bail!("too many decimal places for token (decimals={decimals})");
    }

    let whole_v = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).context("parse whole")?
    };
    let frac_s = format!("{frac:0<decimals_len$}");
    let frac_v = if frac_s.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&frac_s, 10).context("parse fractional")?
    };

    let scale = U256::from(10_u8)
        .checked_pow(U256::from(decimals))
        .ok_or_else(|| eyre::eyre!("decimals too large"))?;

    whole_v
        .checked_mul(scale)
        .and_then(|x| x.checked_add(frac_v))
        .ok_or_else(|| eyre::eyre!("amount overflow"))
}
