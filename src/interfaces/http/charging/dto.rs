//! Charging API request DTOs

use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Spend ceiling bounds in KGS: must be positive, capped at 100 000.
fn validate_amount_som(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(ValidationError::new("amount_som_not_positive"));
    }
    if *amount > Decimal::from(100_000) {
        return Err(ValidationError::new("amount_som_too_large"));
    }
    Ok(())
}

/// Body of `POST /api/v1/charging/start`.
///
/// `energy_kwh` and `amount_som` are both optional; their combination
/// selects the charging limit mode.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartChargingRequest {
    #[validate(length(min = 1, max = 64))]
    pub station_id: String,

    #[validate(range(min = 1, max = 64))]
    pub connector_id: u32,

    /// Stop after delivering this many kWh.
    #[validate(range(min = 0.1, max = 1000.0))]
    pub energy_kwh: Option<f64>,

    /// Spend ceiling in KGS.
    #[validate(custom(function = "validate_amount_som"))]
    pub amount_som: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_amount_som_is_rejected() {
        let body = StartChargingRequest {
            station_id: "ST-1".to_string(),
            connector_id: 1,
            energy_kwh: None,
            amount_som: Some(Decimal::from(-50)),
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn zero_amount_som_is_rejected() {
        let body = StartChargingRequest {
            station_id: "ST-1".to_string(),
            connector_id: 1,
            energy_kwh: None,
            amount_som: Some(Decimal::ZERO),
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn positive_amount_som_passes() {
        let body = StartChargingRequest {
            station_id: "ST-1".to_string(),
            connector_id: 1,
            energy_kwh: Some(10.0),
            amount_som: Some(Decimal::from(200)),
        };
        assert!(body.validate().is_ok());
    }
}

/// Body of `POST /api/v1/charging/stop`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StopChargingRequest {
    pub session_id: Uuid,
}
