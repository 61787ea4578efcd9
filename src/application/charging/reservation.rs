//! Reservation policy
//!
//! Decides how much of the client's balance to debit at session start,
//! given the optional energy and amount limits. Pure: the engine feeds
//! in the balance and the resolved tariff snapshot.

use rust_decimal::Decimal;

use crate::domain::money::round_money;
use crate::domain::{ChargingLimit, DomainError, DomainResult, LimitKind, TariffSnapshot};

/// Assumed session length when only an energy figure is given.
const ESTIMATED_DURATION_MINUTES: i64 = 60;
/// Reservation cap for unlimited charging, on top of the session fee.
const UNLIMITED_CAP_SOM: i64 = 200;
/// Smallest reservation an unlimited session may start with.
const MIN_RESERVATION_SOM: i64 = 10;

#[derive(Debug, Clone)]
pub struct Reservation {
    pub amount: Decimal,
    pub limit_kind: LimitKind,
    pub limit_value: Decimal,
    /// Estimated cost before caps were applied.
    pub base_amount: Decimal,
}

/// Compute the reservation for a start request.
///
/// Failure modes: `amount_exceeds_balance` when the requested spend
/// ceiling is above the balance, `zero_balance` / `insufficient_balance`
/// for unlimited charging, and a final `insufficient_balance` check for
/// every mode.
pub fn calculate_reservation(
    balance: Decimal,
    snapshot: &TariffSnapshot,
    limit: &ChargingLimit,
) -> DomainResult<Reservation> {
    let (limit_kind, limit_value) = limit.persisted();

    let reservation = match limit {
        ChargingLimit::EnergyAndAmount(energy_kwh, amount_som) => {
            ensure_positive_ceiling(*amount_som)?;
            let estimated = snapshot.estimated_cost(*energy_kwh, ESTIMATED_DURATION_MINUTES);
            Reservation {
                amount: estimated.min(*amount_som),
                limit_kind,
                limit_value,
                base_amount: estimated,
            }
        }

        ChargingLimit::Amount(amount_som) => {
            ensure_positive_ceiling(*amount_som)?;
            if *amount_som > balance {
                return Err(DomainError::AmountExceedsBalance {
                    balance,
                    requested: *amount_som,
                });
            }
            Reservation {
                amount: balance.min(*amount_som),
                limit_kind,
                limit_value,
                base_amount: *amount_som,
            }
        }

        ChargingLimit::Energy(energy_kwh) => {
            let estimated = snapshot.estimated_cost(*energy_kwh, ESTIMATED_DURATION_MINUTES);
            Reservation {
                amount: estimated,
                limit_kind,
                limit_value,
                base_amount: estimated,
            }
        }

        ChargingLimit::None => {
            if balance <= Decimal::ZERO {
                return Err(DomainError::ZeroBalance { balance });
            }
            let cap = Decimal::from(UNLIMITED_CAP_SOM) + snapshot.session_fee;
            let amount = balance.min(cap);
            if amount < Decimal::from(MIN_RESERVATION_SOM) {
                return Err(DomainError::InsufficientBalance {
                    balance,
                    required: Decimal::from(MIN_RESERVATION_SOM),
                });
            }
            Reservation {
                amount,
                limit_kind,
                limit_value,
                base_amount: cap,
            }
        }
    };

    let amount = round_money(reservation.amount);
    if balance < amount {
        return Err(DomainError::InsufficientBalance {
            balance,
            required: amount,
        });
    }

    Ok(Reservation {
        amount,
        base_amount: round_money(reservation.base_amount),
        ..reservation
    })
}

/// A spend ceiling of zero or less would turn the reservation debit into
/// a credit; refuse it before any balance arithmetic.
fn ensure_positive_ceiling(amount_som: Decimal) -> DomainResult<()> {
    if amount_som <= Decimal::ZERO {
        return Err(DomainError::Validation(
            "amount_som must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn snapshot(rate: &str, fee: &str) -> TariffSnapshot {
        let mut s = TariffSnapshot::default_tariff();
        s.rate_per_kwh = d(rate);
        s.session_fee = d(fee);
        s
    }

    #[test]
    fn energy_limit_reserves_estimated_cost() {
        // 10 kWh at 13.5 KGS/kWh, no fee → 135.00
        let r = calculate_reservation(
            d("1000"),
            &snapshot("13.5", "0"),
            &ChargingLimit::Energy(10.0),
        )
        .unwrap();
        assert_eq!(r.amount, d("135.00"));
        assert_eq!(r.limit_kind, LimitKind::Energy);
        assert_eq!(r.limit_value, d("10"));
    }

    #[test]
    fn energy_limit_includes_session_fee() {
        let r = calculate_reservation(
            d("1000"),
            &snapshot("13.5", "25"),
            &ChargingLimit::Energy(10.0),
        )
        .unwrap();
        assert_eq!(r.amount, d("160.00"));
    }

    #[test]
    fn both_limits_take_the_cheaper_bound() {
        let r = calculate_reservation(
            d("1000"),
            &snapshot("13.5", "0"),
            &ChargingLimit::EnergyAndAmount(10.0, d("100")),
        )
        .unwrap();
        // min(135, 100) = 100; the limit stays energy-typed
        assert_eq!(r.amount, d("100"));
        assert_eq!(r.limit_kind, LimitKind::Energy);
    }

    #[test]
    fn amount_limit_over_balance_is_rejected_with_details() {
        let err = calculate_reservation(
            d("50"),
            &snapshot("13.5", "0"),
            &ChargingLimit::Amount(d("200")),
        )
        .unwrap_err();
        match err {
            DomainError::AmountExceedsBalance { balance, requested } => {
                assert_eq!(balance, d("50"));
                assert_eq!(requested, d("200"));
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn negative_amount_limit_is_rejected() {
        let err = calculate_reservation(
            d("500"),
            &snapshot("13.5", "0"),
            &ChargingLimit::Amount(d("-50")),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = calculate_reservation(
            d("500"),
            &snapshot("13.5", "0"),
            &ChargingLimit::EnergyAndAmount(10.0, d("-50")),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn zero_amount_limit_is_rejected() {
        let err = calculate_reservation(
            d("500"),
            &snapshot("13.5", "0"),
            &ChargingLimit::Amount(d("0")),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn amount_limit_within_balance() {
        let r = calculate_reservation(
            d("500"),
            &snapshot("13.5", "0"),
            &ChargingLimit::Amount(d("200")),
        )
        .unwrap();
        assert_eq!(r.amount, d("200"));
        assert_eq!(r.limit_kind, LimitKind::Amount);
        assert_eq!(r.limit_value, d("200"));
    }

    #[test]
    fn unlimited_caps_at_200_plus_fee() {
        let r = calculate_reservation(
            d("1000"),
            &snapshot("13.5", "25"),
            &ChargingLimit::None,
        )
        .unwrap();
        assert_eq!(r.amount, d("225"));
        assert_eq!(r.limit_kind, LimitKind::None);
    }

    #[test]
    fn unlimited_uses_balance_when_below_cap() {
        let r =
            calculate_reservation(d("80"), &snapshot("13.5", "0"), &ChargingLimit::None).unwrap();
        assert_eq!(r.amount, d("80"));
    }

    #[test]
    fn unlimited_rejects_zero_balance() {
        let err =
            calculate_reservation(d("0"), &snapshot("13.5", "0"), &ChargingLimit::None).unwrap_err();
        assert!(matches!(err, DomainError::ZeroBalance { .. }));
    }

    #[test]
    fn unlimited_rejects_below_min_reservation() {
        let err =
            calculate_reservation(d("5"), &snapshot("13.5", "0"), &ChargingLimit::None).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientBalance { .. }));
    }

    #[test]
    fn final_balance_check_applies_to_energy_mode() {
        let err = calculate_reservation(
            d("100"),
            &snapshot("13.5", "0"),
            &ChargingLimit::Energy(10.0),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientBalance { .. }));
    }

    #[test]
    fn per_minute_rate_enters_the_estimate() {
        let mut s = snapshot("10", "0");
        s.rate_per_minute = d("0.5");
        let r = calculate_reservation(d("1000"), &s, &ChargingLimit::Energy(10.0)).unwrap();
        // 10*10 + 60*0.5 = 130
        assert_eq!(r.amount, d("130.00"));
    }
}
