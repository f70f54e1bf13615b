//! # Base-Unit Arithmetic
//!
//! Conversion between human-entered decimal amounts and on-chain base units.
//! Everything here is exact integer arithmetic on 256 bits; a token amount
//! never touches a float on its way through the engine.

use alloy_primitives::U256;

use crate::error::UnitError;

/// Largest decimal count whose scale factor fits in 256 bits.
pub const MAX_DECIMALS: u8 = 77;

/// `10^decimals` as a 256-bit integer.
///
/// # Errors
/// Returns [`UnitError::UnsupportedDecimals`] above [`MAX_DECIMALS`].
pub fn scale_factor(decimals: u8) -> Result<U256, UnitError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitError::UnsupportedDecimals(decimals));
    }
    U256::from(10u8)
        .checked_pow(U256::from(decimals))
        .ok_or(UnitError::UnsupportedDecimals(decimals))
}

fn digits_to_u256(digits: &str) -> Result<U256, UnitError> {
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| UnitError::Overflow)
}

/// Parses a human-entered decimal amount into base units.
///
/// Accepts `"5"`, `"5."`, `".5"` and `"0.25"` shapes. Rejects anything with
/// signs, separators, a second point, more fractional digits than the token
/// carries, or a value that overflows 256 bits.
///
/// # Errors
/// Returns the specific [`UnitError`] for each rejection.
pub fn parse_units(text: &str, decimals: u8) -> Result<U256, UnitError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(UnitError::Empty);
    }
    let (whole, frac) = match trimmed.split_once('.') {
        Some((whole, frac)) => {
            if frac.contains('.') {
                return Err(UnitError::MultiplePoints);
            }
            (whole, frac)
        }
        None => (trimmed, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(UnitError::Empty);
    }
    if let Some(bad) = whole.chars().chain(frac.chars()).find(|c| !c.is_ascii_digit()) {
        return Err(UnitError::InvalidCharacter(bad));
    }
    if frac.len() > decimals as usize {
        return Err(UnitError::TooManyFractionalDigits { decimals });
    }
    let frac_digits = u8::try_from(frac.len()).map_err(|_| UnitError::Overflow)?;

    let scaled_whole = digits_to_u256(whole)?
        .checked_mul(scale_factor(decimals)?)
        .ok_or(UnitError::Overflow)?;
    // Right-pad the fraction to the token's full precision.
    let scaled_frac = digits_to_u256(frac)?
        .checked_mul(scale_factor(decimals - frac_digits)?)
        .ok_or(UnitError::Overflow)?;
    scaled_whole.checked_add(scaled_frac).ok_or(UnitError::Overflow)
}

/// Renders a base-unit amount as a canonical decimal string.
///
/// No trailing fractional zeros, no decimal point when the fraction is zero,
/// `"0"` for zero. Decimal counts beyond [`MAX_DECIMALS`] fall back to the
/// raw base-unit rendering; descriptors validate decimals long before
/// display, so that path is never hit in practice.
#[must_use]
pub fn format_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let Ok(scale) = scale_factor(decimals) else {
        return value.to_string();
    };
    let whole = value / scale;
    let frac = value % scale;
    if frac.is_zero() {
        return whole.to_string();
    }
    let mut frac_str = format!("{frac:0>width$}", width = decimals as usize);
    while frac_str.ends_with('0') {
        frac_str.pop();
    }
    format!("{whole}.{frac_str}")
}

/// Whether a human-entered amount parses to a strictly positive value.
///
/// This is the pre-dispatch validation predicate: a submit control stays
/// disabled and a stake request is refused unless this holds.
#[must_use]
pub fn is_positive_amount(text: &str, decimals: u8) -> bool {
    parse_units(text, decimals).is_ok_and(|value| value > U256::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(value: u64, decimals: u8) -> U256 {
        U256::from(value) * scale_factor(decimals).unwrap()
    }

    #[test]
    fn parses_whole_amounts() {
        assert_eq!(parse_units("5", 9).unwrap(), units(5, 9));
        assert_eq!(parse_units("5.", 9).unwrap(), units(5, 9));
        assert_eq!(parse_units(" 42 ", 0).unwrap(), U256::from(42));
    }

    #[test]
    fn parses_fractional_amounts() {
        assert_eq!(parse_units("0.25", 2).unwrap(), U256::from(25));
        assert_eq!(parse_units(".5", 1).unwrap(), U256::from(5));
        assert_eq!(
            parse_units("1.5", 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u64)
        );
    }

    #[test]
    fn rejects_malformed_amounts() {
        assert_eq!(parse_units("", 9), Err(UnitError::Empty));
        assert_eq!(parse_units(".", 9), Err(UnitError::Empty));
        assert_eq!(parse_units("1.2.3", 9), Err(UnitError::MultiplePoints));
        assert_eq!(
            parse_units("-5", 9),
            Err(UnitError::InvalidCharacter('-'))
        );
        assert_eq!(
            parse_units("1,5", 9),
            Err(UnitError::InvalidCharacter(','))
        );
        assert_eq!(
            parse_units("0.123", 2),
            Err(UnitError::TooManyFractionalDigits { decimals: 2 })
        );
    }

    #[test]
    fn rejects_overflow() {
        let huge = format!("1{}", "0".repeat(78));
        assert_eq!(parse_units(&huge, 0), Err(UnitError::Overflow));
        assert_eq!(parse_units("2", 78), Err(UnitError::UnsupportedDecimals(78)));
    }

    #[test]
    fn formats_canonically() {
        assert_eq!(format_units(units(5, 9), 9), "5");
        assert_eq!(format_units(U256::from(5_250_000_000u64), 9), "5.25");
        assert_eq!(format_units(U256::from(1), 9), "0.000000001");
        assert_eq!(format_units(U256::ZERO, 9), "0");
        assert_eq!(format_units(U256::from(42), 0), "42");
    }

    #[test]
    fn format_round_trips_through_parse() {
        for raw in [0u64, 1, 999_999_999, 5_250_000_000, 123_456_789_012] {
            let value = U256::from(raw);
            let rendered = format_units(value, 9);
            assert_eq!(parse_units(&rendered, 9).unwrap(), value, "{rendered}");
        }
    }

    #[test]
    fn positive_amount_predicate() {
        assert!(is_positive_amount("5", 9));
        assert!(is_positive_amount("0.000000001", 9));
        assert!(!is_positive_amount("0", 9));
        assert!(!is_positive_amount("0.0", 9));
        assert!(!is_positive_amount("", 9));
        assert!(!is_positive_amount("abc", 9));
    }
}
