//! Fixed-point money helpers
//!
//! All wallet amounts are KGS with two decimal places. Rounding is
//! banker's (midpoint-to-even) so repeated settlements do not drift.

use rust_decimal::{Decimal, RoundingStrategy};

pub const CURRENCY: &str = "KGS";

/// Round to 2 decimal places, midpoint-to-even.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Convert a metered kWh figure into a `Decimal` for cost arithmetic.
///
/// Negative meter deltas are clamped to zero before any cost computation.
pub fn decimal_from_kwh(kwh: f64) -> Decimal {
    let clamped = if kwh.is_finite() && kwh > 0.0 { kwh } else { 0.0 };
    Decimal::from_f64_retain(clamped).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rounds_to_two_decimals_bankers() {
        let d = |s: &str| Decimal::from_str(s).unwrap();
        assert_eq!(round_money(d("1.005")), d("1.00"));
        assert_eq!(round_money(d("1.015")), d("1.02"));
        assert_eq!(round_money(d("141.754")), d("141.75"));
        assert_eq!(round_money(d("141.755")), d("141.76"));
    }

    #[test]
    fn clamps_negative_kwh() {
        assert_eq!(decimal_from_kwh(-3.2), Decimal::ZERO);
        assert_eq!(decimal_from_kwh(f64::NAN), Decimal::ZERO);
    }

    #[test]
    fn converts_kwh() {
        let d = decimal_from_kwh(10.5);
        assert_eq!(round_money(d), Decimal::from_str("10.50").unwrap());
    }
}
