//! Tool argument parsing. Every failure is a [`PendleMcpError::InvalidArgument`] naming the field.

use crate::{amount, errors::PendleMcpError};
use serde_json::Value;

pub type ArgResult<T> = Result<T, PendleMcpError>;

pub const TIME_FRAMES: [&str; 3] = ["hour", "day", "week"];

fn raw_str<'a>(args: &'a Value, field: &str) -> Option<&'a str> {
    args.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn present(args: &Value, field: &str) -> bool {
    args.get(field).is_some_and(|v| !v.is_null())
}

pub fn is_evm_address(s: &str) -> bool {
    s.strip_prefix("0x").is_some_and(|h| h.len() == 40 && h.bytes().all(|b| b.is_ascii_hexdigit()))
}

pub fn required_str<'a>(args: &'a Value, field: &str) -> ArgResult<&'a str> {
    raw_str(args, field).ok_or_else(|| PendleMcpError::invalid(field, "is required"))
}

pub fn optional_str(args: &Value, field: &str) -> ArgResult<Option<String>> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_owned()).filter(|s| !s.is_empty())),
        Some(_) => Err(PendleMcpError::invalid(field, "must be a string")),
    }
}

pub fn address(args: &Value, field: &str) -> ArgResult<String> {
    let s = required_str(args, field)?;
    if !is_evm_address(s) {
        return Err(PendleMcpError::invalid(field, "must be a 0x-prefixed 20-byte hex address"));
    }
    Ok(s.to_owned())
}

pub fn optional_address(args: &Value, field: &str) -> ArgResult<Option<String>> {
    if !present(args, field) {
        return Ok(None);
    }
    address(args, field).map(Some)
}

/// Base-unit amount as a digit string. JSON integers are accepted and kept exact.
pub fn base_amount(args: &Value, field: &str) -> ArgResult<String> {
    let s = match args.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.is_u64() => n.to_string(),
        None | Some(Value::Null) => return Err(PendleMcpError::invalid(field, "is required")),
        Some(_) => {
            return Err(PendleMcpError::invalid(
                field,
                "must be a decimal string in the token's smallest unit",
            ))
        }
    };
    amount::parse_amount_base(&s).map_err(|e| PendleMcpError::invalid(field, e.to_string()))
}

/// Human decimal amount ("1.5"); scaled later against on-chain decimals.
pub fn ui_amount(args: &Value, field: &str) -> ArgResult<String> {
    let s = match args.get(field) {
        Some(Value::String(s)) => s.trim().to_owned(),
        Some(Value::Number(n)) if n.is_u64() => n.to_string(),
        None | Some(Value::Null) => return Err(PendleMcpError::invalid(field, "is required")),
        Some(_) => return Err(PendleMcpError::invalid(field, "must be a decimal string")),
    };
    if s.is_empty() {
        return Err(PendleMcpError::invalid(field, "is required"));
    }
    Ok(s)
}

pub fn slippage(args: &Value) -> ArgResult<f64> {
    const FIELD: &str = "slippage";
    let v = match args.get(FIELD) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        None | Some(Value::Null) => return Err(PendleMcpError::invalid(FIELD, "is required")),
        Some(_) => None,
    }
    .ok_or_else(|| PendleMcpError::invalid(FIELD, "must be a number"))?;
    if !v.is_finite() || !(0.0_f64..=1.0_f64).contains(&v) {
        return Err(PendleMcpError::invalid(FIELD, "must be between 0 and 1"));
    }
    Ok(v)
}

pub fn flag(args: &Value, field: &str) -> ArgResult<bool> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.trim() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            _ => Err(PendleMcpError::invalid(field, "must be a boolean")),
        },
        Some(_) => Err(PendleMcpError::invalid(field, "must be a boolean")),
    }
}

pub fn optional_flag(args: &Value, field: &str) -> ArgResult<Option<bool>> {
    if present(args, field) {
        flag(args, field).map(Some)
    } else {
        Ok(None)
    }
}

/// Comma-separated list; a JSON array of strings is also accepted.
pub fn csv_list(args: &Value, field: &str) -> ArgResult<Vec<String>> {
    let parts: Vec<String> = match args.get(field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => s.split(',').map(|p| p.trim().to_owned()).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.trim().to_owned())
                    .ok_or_else(|| PendleMcpError::invalid(field, "must contain only strings"))
            })
            .collect::<ArgResult<_>>()?,
        Some(_) => return Err(PendleMcpError::invalid(field, "must be a comma-separated string")),
    };
    Ok(parts.into_iter().filter(|p| !p.is_empty()).collect())
}

pub fn optional_u64(args: &Value, field: &str) -> ArgResult<Option<u64>> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| PendleMcpError::invalid(field, "must be a non-negative integer")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_e| PendleMcpError::invalid(field, "must be a non-negative integer")),
        Some(_) => Err(PendleMcpError::invalid(field, "must be a non-negative integer")),
    }
}

/// `chainId` as a JSON string or integer; `default` when absent.
pub fn chain_id(args: &Value, default: u64) -> ArgResult<u64> {
    Ok(optional_u64(args, "chainId")?.unwrap_or(default))
}

pub fn time_frame(args: &Value) -> ArgResult<&'static str> {
    const FIELD: &str = "timeFrame";
    let Some(s) = optional_str(args, FIELD)? else {
        return Ok("day");
    };
    TIME_FRAMES
        .iter()
        .copied()
        .find(|tf| *tf == s)
        .ok_or_else(|| PendleMcpError::invalid(FIELD, "must be one of hour, day, week"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ADDR: &str = "0x888888888889758F76e7103c6CbF23ABbF58F946";

    fn field_of(e: &PendleMcpError) -> &str {
        match e {
            PendleMcpError::InvalidArgument { field, .. } => field,
            _ => "",
        }
    }

    #[test]
    fn chain_id_accepts_string_number_and_default() {
        assert_eq!(chain_id(&json!({ "chainId": "42161" }), 1).ok(), Some(42_161));
        assert_eq!(chain_id(&json!({ "chainId": 137 }), 1).ok(), Some(137));
        assert_eq!(chain_id(&json!({}), 1).ok(), Some(1));
        assert_eq!(chain_id(&json!({ "chainId": "" }), 10).ok(), Some(10));
        let e = chain_id(&json!({ "chainId": "mainnet" }), 1).err();
        assert_eq!(e.as_ref().map(field_of), Some("chainId"));
    }

    #[test]
    fn addresses_are_validated() {
        assert_eq!(address(&json!({ "market": ADDR }), "market").ok().as_deref(), Some(ADDR));
        let e = address(&json!({ "market": "0x1234" }), "market").err();
        assert_eq!(
            e.map(|e| e.to_string()),
            Some("Validation Error: market - must be a 0x-prefixed 20-byte hex address".to_owned())
        );
        assert!(address(&json!({}), "receiver").is_err());
        let upper = format!("0X{}", ADDR.trim_start_matches("0x"));
        let e = address(&json!({ "market": upper }), "market").err();
        assert_eq!(e.as_ref().map(field_of), Some("market"), "only a lower-case 0x prefix");
        assert_eq!(optional_address(&json!({ "address": null }), "address").ok(), Some(None));
    }

    #[test]
    fn base_amounts_stay_exact() {
        let big = "123456789012345678901234567890";
        assert_eq!(base_amount(&json!({ "amountIn": big }), "amountIn").ok().as_deref(), Some(big));
        assert_eq!(
            base_amount(&json!({ "amountIn": 1_000_000 }), "amountIn").ok().as_deref(),
            Some("1000000")
        );
        assert!(base_amount(&json!({ "amountIn": 1.5 }), "amountIn").is_err());
        assert!(base_amount(&json!({ "amountIn": "1.5" }), "amountIn").is_err());
    }

    #[test]
    fn slippage_bounds() {
        assert_eq!(slippage(&json!({ "slippage": 0.005 })).ok(), Some(0.005));
        assert_eq!(slippage(&json!({ "slippage": "0.01" })).ok(), Some(0.01));
        assert!(slippage(&json!({ "slippage": 1.5 })).is_err());
        assert!(slippage(&json!({ "slippage": -0.1 })).is_err());
        assert!(slippage(&json!({})).is_err());
    }

    #[test]
    fn lists_and_flags() {
        assert_eq!(
            csv_list(&json!({ "aggregators": "kyber, paraswap,," }), "aggregators").ok(),
            Some(vec!["kyber".to_owned(), "paraswap".to_owned()])
        );
        assert_eq!(
            csv_list(&json!({ "aggregators": ["okx"] }), "aggregators").ok(),
            Some(vec!["okx".to_owned()])
        );
        assert_eq!(flag(&json!({ "zpi": true }), "zpi").ok(), Some(true));
        assert_eq!(flag(&json!({}), "zpi").ok(), Some(false));
        assert_eq!(
            optional_flag(&json!({ "is_expired": false }), "is_expired").ok(),
            Some(Some(false))
        );
        assert!(flag(&json!({ "zpi": 3 }), "zpi").is_err());
    }

    #[test]
    fn time_frame_defaults_to_day() {
        assert_eq!(time_frame(&json!({})).ok(), Some("day"));
        assert_eq!(time_frame(&json!({ "timeFrame": "week" })).ok(), Some("week"));
        assert!(time_frame(&json!({ "timeFrame": "minute" })).is_err());
    }
}
