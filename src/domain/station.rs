//! Station and connector domain entities

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Administrative status set by the operator, not by the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationStatus {
    Active,
    Inactive,
    Maintenance,
}

impl StationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Maintenance => "maintenance",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "maintenance" => Self::Maintenance,
            _ => Self::Inactive,
        }
    }
}

/// A physical charger.
#[derive(Debug, Clone)]
pub struct Station {
    pub id: String,
    pub serial: Option<String>,
    pub location_id: Option<Uuid>,
    pub status: StationStatus,
    /// Heartbeat-derived availability, maintained by the sweeper.
    pub is_available: bool,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub firmware_version: Option<String>,
    /// Station-specific price; overrides the tariff plan when nonzero.
    pub price_per_kwh: Option<Decimal>,
    pub session_fee: Option<Decimal>,
    pub currency: String,
    pub tariff_plan_id: Option<Uuid>,
    /// SHA-256 of the provisioned API key, if any.
    pub api_key_hash: Option<String>,
    pub api_key_expires_at: Option<DateTime<Utc>>,
}

impl Station {
    pub fn is_active(&self) -> bool {
        self.status == StationStatus::Active
    }
}

/// Operational status of one plug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorStatus {
    Available,
    Occupied,
    Faulted,
    Unavailable,
}

impl ConnectorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Faulted => "faulted",
            Self::Unavailable => "unavailable",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "available" => Self::Available,
            "occupied" => Self::Occupied,
            "faulted" => Self::Faulted,
            _ => Self::Unavailable,
        }
    }

    /// Map an OCPP 1.6 `ChargePointStatus` string onto the internal set.
    ///
    /// Preparing/Charging/Suspended*/Finishing/Reserved all read as
    /// `occupied`: from the operator's point of view the plug is taken.
    pub fn from_ocpp(status: &str) -> Self {
        match status {
            "Available" => Self::Available,
            "Preparing" | "Charging" | "SuspendedEV" | "SuspendedEVSE" | "Finishing"
            | "Reserved" => Self::Occupied,
            "Faulted" => Self::Faulted,
            _ => Self::Unavailable,
        }
    }
}

/// One plug on a station.
#[derive(Debug, Clone)]
pub struct Connector {
    pub station_id: String,
    pub connector_number: u32,
    pub connector_type: String,
    pub power_kw: Option<f64>,
    pub status: ConnectorStatus,
    pub error_code: Option<String>,
    pub last_status_update: Option<DateTime<Utc>>,
}

/// Derived status of a charging location (group of stations).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationStatus {
    Offline,
    Maintenance,
    Occupied,
    Available,
    Partial,
}

impl LocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Maintenance => "maintenance",
            Self::Occupied => "occupied",
            Self::Available => "available",
            Self::Partial => "partial",
        }
    }
}

/// Aggregate per-station states into the location view.
///
/// Priority: offline > maintenance > all-occupied > all-available > partial.
pub fn derive_location_status(
    available: usize,
    occupied: usize,
    offline: usize,
    maintenance: usize,
) -> LocationStatus {
    let total = available + occupied + offline + maintenance;
    if total == 0 || offline > 0 {
        return LocationStatus::Offline;
    }
    if maintenance > 0 {
        return LocationStatus::Maintenance;
    }
    if occupied == total {
        return LocationStatus::Occupied;
    }
    if available == total {
        return LocationStatus::Available;
    }
    LocationStatus::Partial
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocpp_status_mapping() {
        assert_eq!(ConnectorStatus::from_ocpp("Available"), ConnectorStatus::Available);
        for s in [
            "Preparing",
            "Charging",
            "SuspendedEV",
            "SuspendedEVSE",
            "Finishing",
            "Reserved",
        ] {
            assert_eq!(ConnectorStatus::from_ocpp(s), ConnectorStatus::Occupied);
        }
        assert_eq!(ConnectorStatus::from_ocpp("Faulted"), ConnectorStatus::Faulted);
        assert_eq!(
            ConnectorStatus::from_ocpp("Unavailable"),
            ConnectorStatus::Unavailable
        );
        // Unknown statuses degrade to unavailable
        assert_eq!(
            ConnectorStatus::from_ocpp("SomethingNew"),
            ConnectorStatus::Unavailable
        );
    }

    #[test]
    fn location_status_priorities() {
        assert_eq!(derive_location_status(0, 0, 0, 0), LocationStatus::Offline);
        assert_eq!(derive_location_status(2, 1, 1, 0), LocationStatus::Offline);
        assert_eq!(derive_location_status(2, 1, 0, 1), LocationStatus::Maintenance);
        assert_eq!(derive_location_status(0, 3, 0, 0), LocationStatus::Occupied);
        assert_eq!(derive_location_status(3, 0, 0, 0), LocationStatus::Available);
        assert_eq!(derive_location_status(1, 2, 0, 0), LocationStatus::Partial);
    }
}
