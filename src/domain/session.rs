//! Charging-session aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::tariff::TariffSnapshot;

/// Session lifecycle.
///
/// `pending` → RemoteStart queued, waiting for the station's
/// StartTransaction; `started` → OCPP transaction bound; `stopping` →
/// a stop was requested (limit breach or mobile stop); `stopped` /
/// `error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Started,
    Stopping,
    Stopped,
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "started" => Self::Started,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            _ => Self::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Error)
    }
}

/// Limit kind persisted on the session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    None,
    Energy,
    Amount,
}

impl LimitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Energy => "energy",
            Self::Amount => "amount",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "energy" => Self::Energy,
            "amount" => Self::Amount,
            _ => Self::None,
        }
    }
}

/// Caller-requested charging limit, as received by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChargingLimit {
    /// Unlimited charging; reservation is capped.
    None,
    /// Stop after delivering this many kWh.
    Energy(f64),
    /// Stop when the accrued cost reaches this amount (KGS).
    Amount(Decimal),
    /// Energy limit with a spend ceiling.
    EnergyAndAmount(f64, Decimal),
}

impl ChargingLimit {
    pub fn from_request(energy_kwh: Option<f64>, amount_som: Option<Decimal>) -> Self {
        match (energy_kwh, amount_som) {
            (Some(e), Some(a)) => Self::EnergyAndAmount(e, a),
            (Some(e), None) => Self::Energy(e),
            (None, Some(a)) => Self::Amount(a),
            (None, None) => Self::None,
        }
    }

    /// The (kind, value) pair persisted on the session.
    pub fn persisted(&self) -> (LimitKind, Decimal) {
        match self {
            Self::None => (LimitKind::None, Decimal::ZERO),
            Self::Energy(kwh) | Self::EnergyAndAmount(kwh, _) => (
                LimitKind::Energy,
                Decimal::from_f64_retain(*kwh).unwrap_or(Decimal::ZERO),
            ),
            Self::Amount(som) => (LimitKind::Amount, *som),
        }
    }
}

/// The engine's aggregate root.
#[derive(Debug, Clone)]
pub struct ChargingSession {
    pub id: Uuid,
    pub client_id: Uuid,
    pub station_id: String,
    pub connector_number: u32,
    pub status: SessionStatus,
    pub limit_kind: LimitKind,
    pub limit_value: Decimal,
    /// Debited from the client at creation time.
    pub reserved_amount: Decimal,
    pub base_amount: Decimal,
    pub final_amount: Option<Decimal>,
    pub energy_kwh: Option<f64>,
    pub start_time: DateTime<Utc>,
    pub stop_time: Option<DateTime<Utc>>,
    /// Bound on the station's StartTransaction; NULL until observed.
    pub ocpp_transaction_id: Option<i32>,
    pub pricing_history_id: Option<Uuid>,
}

impl ChargingSession {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn duration_minutes(&self, now: DateTime<Utc>) -> i64 {
        let end = self.stop_time.unwrap_or(now);
        (end - self.start_time).num_minutes().max(0)
    }
}

/// Input for the transactional session-creation path.
#[derive(Debug, Clone)]
pub struct NewChargingSession {
    pub client_id: Uuid,
    pub station_id: String,
    pub connector_number: u32,
    pub limit_kind: LimitKind,
    pub limit_value: Decimal,
    pub reserved_amount: Decimal,
    pub base_amount: Decimal,
    pub snapshot: TariffSnapshot,
}

/// Outcome of the settlement transaction.
#[derive(Debug, Clone)]
pub struct SessionSettlement {
    pub session_id: Uuid,
    pub actual_energy_kwh: f64,
    pub actual_cost: Decimal,
    pub refund: Decimal,
    pub additional_charge: Decimal,
    /// True when the overdraft could not be fully covered by the balance.
    pub overdraft_uncovered: bool,
    pub new_balance: Decimal,
}
