//! Token amounts are `U256` integers scaled by `10^decimals`.
//!
//! Nothing in here goes through floating point: decimal strings are parsed
//! digit by digit and display helpers divide by the unit.

use ethers_core::{types::U256, utils::format_units};
use thiserror::Error;

/// Decimals used by the token unless configured otherwise.
pub const DEFAULT_DECIMALS: u32 = 18;

/// Largest power of ten that still fits in 256 bits.
const MAX_DECIMALS: u32 = 77;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount \"{input}\": {reason}")]
    Invalid { input: String, reason: String },
    #[error("amount \"{input}\" does not fit in 256 bits with {decimals} decimals")]
    Overflow { input: String, decimals: u32 },
    #[error("unsupported decimals {0} (at most {MAX_DECIMALS})")]
    Decimals(u32),
}

/// Returns `10^decimals`, the value of one whole token.
pub fn unit(decimals: u32) -> Result<U256, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::Decimals(decimals));
    }
    Ok(U256::exp10(decimals as usize))
}

/// Scales a whole number of tokens: `scaled(12_313, 18)` is `12313 * 10^18`.
pub fn scaled(whole: u64, decimals: u32) -> Result<U256, AmountError> {
    U256::from(whole)
        .checked_mul(unit(decimals)?)
        .ok_or_else(|| AmountError::Overflow {
            input: whole.to_string(),
            decimals,
        })
}

/// Parses a non-negative decimal string such as `"10000"` or `"0.25"` into a
/// scaled integer.
pub fn parse_scaled(input: &str, decimals: u32) -> Result<U256, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::Decimals(decimals));
    }

    let trimmed = input.trim();
    let invalid = |reason: &str| AmountError::Invalid {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("empty"));
    }
    if !trimmed.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(invalid("only digits and a decimal point are allowed"));
    }
    if trimmed.matches('.').count() > 1 {
        return Err(invalid("more than one decimal point"));
    }
    if trimmed == "." {
        return Err(invalid("no digits"));
    }
    if let Some((_, fraction)) = trimmed.split_once('.') {
        if fraction.len() > decimals as usize {
            return Err(invalid(&format!("more than {decimals} fractional digits")));
        }
    }

    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let digits = format!("{whole}{fraction:0<width$}", width = decimals as usize);
    // Every character is a digit by now, so the only failure left is overflow.
    U256::from_dec_str(&digits).map_err(|_| AmountError::Overflow {
        input: input.to_string(),
        decimals,
    })
}

/// Integer part of a scaled amount, i.e. the amount in whole tokens rounded
/// down.
pub fn whole_units(amount: U256, decimals: u32) -> Result<U256, AmountError> {
    Ok(amount / unit(decimals)?)
}

/// Renders a scaled amount as a decimal string without trailing zeros, e.g.
/// `12313` or `0.5`.
pub fn display_units(amount: U256, decimals: u32) -> Result<String, AmountError> {
    if decimals == 0 {
        return Ok(amount.to_string());
    }
    let formatted = format_units(amount, decimals).map_err(|_| AmountError::Decimals(decimals))?;
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    Ok(if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scales_whole_tokens() {
        let ten_million = scaled(10_000_000, DEFAULT_DECIMALS).unwrap();
        assert_eq!(
            ten_million,
            U256::from_dec_str("10000000000000000000000000").unwrap()
        );
        assert_eq!(scaled(7, 0).unwrap(), U256::from(7u64));
    }

    #[test]
    fn parses_decimal_strings_without_precision_loss() {
        assert_eq!(
            parse_scaled("12313", 18).unwrap(),
            scaled(12_313, 18).unwrap()
        );
        assert_eq!(
            parse_scaled("0.000000000000000001", 18).unwrap(),
            U256::one()
        );
        assert_eq!(
            parse_scaled("1.5", 2).unwrap(),
            U256::from(150u64)
        );
    }

    #[test]
    fn rejects_malformed_amounts() {
        for input in ["", "-1", "1e18", "1.2.3", ".", "ten"] {
            assert!(
                matches!(parse_scaled(input, 18), Err(AmountError::Invalid { .. })),
                "expected {input:?} to be rejected"
            );
        }
        assert!(matches!(
            parse_scaled("0.123", 2),
            Err(AmountError::Invalid { .. })
        ));
        assert_eq!(parse_scaled("1", 78), Err(AmountError::Decimals(78)));
    }

    #[test]
    fn rejects_amounts_past_256_bits() {
        let huge = "9".repeat(70);
        assert!(matches!(
            parse_scaled(&huge, 18),
            Err(AmountError::Overflow { .. })
        ));
        assert!(matches!(
            scaled(u64::MAX, 77),
            Err(AmountError::Overflow { .. })
        ));
    }

    #[test]
    fn renders_whole_and_fractional_units() {
        let amount = scaled(12_313, 18).unwrap();
        assert_eq!(whole_units(amount, 18).unwrap(), U256::from(12_313u64));
        assert_eq!(display_units(amount, 18).unwrap(), "12313");
        assert_eq!(
            display_units(parse_scaled("0.5", 18).unwrap(), 18).unwrap(),
            "0.5"
        );
        assert_eq!(display_units(U256::zero(), 18).unwrap(), "0");
    }
}
