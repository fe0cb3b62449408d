//! Exact conversion between base units and decimal strings.
//!
//! Both directions are lossless: formatting never rounds, parsing rejects
//! input with more fractional digits than the unit has.

use crate::domain::QuizError;
use primitive_types::U256;

/// Render `value` base units as a decimal with `decimals` fractional digits.
///
/// Trailing fractional zeros are dropped but at least one fractional digit is
/// kept, so `10^18` with 18 decimals renders as `1.0`.
pub fn format_units(value: U256, decimals: u32) -> String {
    let digits = value.to_string();
    if decimals == 0 {
        return digits;
    }

    let decimals = decimals as usize;
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };

    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');
    let frac_part = if frac_part.is_empty() { "0" } else { frac_part };
    format!("{int_part}.{frac_part}")
}

/// Parse a decimal string into base units.
pub fn parse_units(input: &str, decimals: u32) -> Result<U256, QuizError> {
    let invalid = || QuizError::InvalidAmount(input.to_string());
    let s = input.trim();

    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(invalid());
    }
    if frac_part.len() > decimals as usize {
        return Err(invalid());
    }

    let mut digits = String::with_capacity(int_part.len() + decimals as usize);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    digits.extend(std::iter::repeat('0').take(decimals as usize - frac_part.len()));

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_dec_str(digits).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ETHER: u32 = 18;

    #[test]
    fn test_format_whole_and_fraction() {
        assert_eq!(format_units(U256::exp10(18), ETHER), "1.0");
        assert_eq!(format_units(U256::from(25u64) * U256::exp10(16), ETHER), "0.25");
        assert_eq!(format_units(U256::zero(), ETHER), "0.0");
        assert_eq!(format_units(U256::one(), ETHER), "0.000000000000000001");
    }

    #[test]
    fn test_format_large_value_keeps_every_digit() {
        let value = U256::from_dec_str("123456789012345678901234567890").unwrap();
        assert_eq!(format_units(value, ETHER), "123456789012.34567890123456789");
    }

    #[test]
    fn test_format_zero_decimals() {
        assert_eq!(format_units(U256::from(42u64), 0), "42");
    }

    #[test]
    fn test_parse_ether() {
        assert_eq!(parse_units("1.5", ETHER).unwrap(), U256::from(15u64) * U256::exp10(17));
        assert_eq!(parse_units(".5", ETHER).unwrap(), U256::from(5u64) * U256::exp10(17));
        assert_eq!(parse_units("2", ETHER).unwrap(), U256::from(2u64) * U256::exp10(18));
        assert_eq!(parse_units("0.0", ETHER).unwrap(), U256::zero());
    }

    #[test]
    fn test_parse_rejects_lossy_or_malformed() {
        assert!(parse_units("0.0000000000000000001", ETHER).is_err());
        assert!(parse_units("1.2.3", ETHER).is_err());
        assert!(parse_units("-1", ETHER).is_err());
        assert!(parse_units("", ETHER).is_err());
        assert!(parse_units("1e18", ETHER).is_err());
    }

    proptest! {
        #[test]
        fn prop_format_is_lossless(raw in any::<u128>()) {
            let value = U256::from(raw);
            prop_assert_eq!(parse_units(&format_units(value, ETHER), ETHER).unwrap(), value);
        }
    }
}
