//! OCPP-side domain entities: the station's view of a transaction, raw
//! meter samples and the local authorisation list.

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcppTransactionStatus {
    Started,
    Stopped,
}

impl OcppTransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "Started",
            Self::Stopped => "Stopped",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Stopped" => Self::Stopped,
            _ => Self::Started,
        }
    }
}

/// The station's view of a charging transaction.
///
/// `(station_id, transaction_id)` is unique; replays of StartTransaction
/// within the same Unix second resolve to the existing row.
#[derive(Debug, Clone)]
pub struct OcppTransaction {
    pub id: i64,
    pub station_id: String,
    pub transaction_id: i32,
    pub connector_number: u32,
    pub id_tag: String,
    /// Wh register at start.
    pub meter_start: i32,
    pub meter_stop: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub stop_reason: Option<String>,
    pub status: OcppTransactionStatus,
    pub charging_session_id: Option<Uuid>,
}

impl OcppTransaction {
    /// Energy delivered in kWh, from meter_stop when present.
    ///
    /// Negative deltas (meter replaced mid-transaction) clamp to zero.
    pub fn energy_kwh(&self) -> Option<f64> {
        self.meter_stop
            .map(|stop| f64::from((stop - self.meter_start).max(0)) / 1000.0)
    }
}

/// Append-only raw meter sample set, one row per MeterValues call.
#[derive(Debug, Clone)]
pub struct MeterValueRow {
    pub station_id: String,
    pub transaction_id: Option<i32>,
    pub connector_number: u32,
    pub timestamp: DateTime<Utc>,
    /// The measurand map as received ({measurand, value, unit, ...}).
    pub sampled_values: serde_json::Value,
}

/// Local authorisation entry: id_tag is the client's normalised phone.
#[derive(Debug, Clone)]
pub struct OcppAuthorization {
    pub id_tag: String,
    pub status: String,
    pub client_id: Option<Uuid>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl OcppAuthorization {
    pub fn is_accepted_at(&self, now: DateTime<Utc>) -> bool {
        self.status == "Accepted" && !self.is_expired_at(now)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|exp| exp < now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_from_meter_registers() {
        let tx = OcppTransaction {
            id: 1,
            station_id: "ST-1".to_string(),
            transaction_id: 1700000000,
            connector_number: 1,
            id_tag: "996555000111".to_string(),
            meter_start: 1000,
            meter_stop: Some(11500),
            started_at: Utc::now(),
            stopped_at: Some(Utc::now()),
            stop_reason: None,
            status: OcppTransactionStatus::Stopped,
            charging_session_id: None,
        };
        assert_eq!(tx.energy_kwh(), Some(10.5));
    }

    #[test]
    fn negative_delta_clamps_to_zero() {
        let tx = OcppTransaction {
            id: 1,
            station_id: "ST-1".to_string(),
            transaction_id: 1700000000,
            connector_number: 1,
            id_tag: "tag".to_string(),
            meter_start: 5000,
            meter_stop: Some(100),
            started_at: Utc::now(),
            stopped_at: None,
            stop_reason: None,
            status: OcppTransactionStatus::Started,
            charging_session_id: None,
        };
        assert_eq!(tx.energy_kwh(), Some(0.0));
    }
}
