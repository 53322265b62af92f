/// Money helpers.
///
/// Every amount in the ledger is stored as an `i64` count of minor units
/// (1 unit = 100 minor units). Decimals only appear at the JSON boundary.
use std::{borrow::Borrow, str::FromStr};

use bigdecimal::{BigDecimal, RoundingMode};
use num_traits::{ToPrimitive, Zero};

pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Convert a decimal amount coming from JSON into minor units.
///
/// The value is rounded half-up to two places using decimal arithmetic, so
/// `0.1 + 0.2`-style float noise never leaks into the ledger.
pub fn to_minor_units(amount: f64) -> Result<i64, String> {
    if !amount.is_finite() {
        return Err("Amount must be a finite number".to_string());
    }

    let decimal = BigDecimal::from_str(&amount.to_string())
        .map_err(|_| "Invalid amount format".to_string())?;

    decimal_to_minor_units(&decimal)
}

pub fn decimal_to_minor_units(amount: &BigDecimal) -> Result<i64, String> {
    if amount < &BigDecimal::zero() {
        return Err("Amount cannot be negative".to_string());
    }

    let scaled = amount.with_scale_round(2, RoundingMode::HalfUp) * BigDecimal::from(MINOR_UNITS_PER_MAJOR);

    scaled
        .to_i64()
        .ok_or_else(|| "Amount is too large".to_string())
}

/// Convert minor units back to a decimal for responses
pub fn from_minor_units(minor: i64) -> f64 {
    minor as f64 / MINOR_UNITS_PER_MAJOR as f64
}

pub fn format_amount<A: Borrow<i64>>(minor: A) -> String {
    let minor = *minor.borrow();
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!(
        "{}{}.{:02}",
        sign,
        abs / MINOR_UNITS_PER_MAJOR as u64,
        abs % MINOR_UNITS_PER_MAJOR as u64
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(100.0), Ok(10000));
        assert_eq!(to_minor_units(0.50), Ok(50));
        assert_eq!(to_minor_units(123.45), Ok(12345));
        assert_eq!(to_minor_units(0.1 + 0.2), Ok(30));
        assert_eq!(to_minor_units(19.999), Ok(2000));
    }

    #[test]
    fn test_to_minor_units_rejects_bad_input() {
        assert!(to_minor_units(-1.0).is_err());
        assert!(to_minor_units(f64::NAN).is_err());
        assert!(to_minor_units(f64::INFINITY).is_err());
    }

    #[test]
    fn test_from_minor_units() {
        assert_eq!(from_minor_units(10000), 100.0);
        assert_eq!(from_minor_units(50), 0.50);
        assert_eq!(from_minor_units(12345), 123.45);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(10000), "100.00");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(&-12345), "-123.45");
    }
}
