//! Repository interfaces
//!
//! The application layer depends on these traits only; SeaORM
//! implementations live in `infrastructure::database::repositories`.
//! Methods that move money run their whole unit of work inside one
//! database transaction with the client row locked.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::client::Client;
use super::error::DomainResult;
use super::idempotency::IdempotencyRecord;
use super::ocpp::{MeterValueRow, OcppAuthorization, OcppTransaction};
use super::session::{ChargingSession, NewChargingSession, SessionSettlement, SessionStatus};
use super::station::{Connector, ConnectorStatus, Station};
use super::tariff::{ClientTariff, TariffRule, TariffSnapshot};

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Client>>;
    /// Match by phone after normalisation to digits.
    async fn find_by_phone_digits(&self, digits: &str) -> DomainResult<Option<Client>>;
}

#[async_trait]
pub trait StationRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Station>>;
    async fn list_all(&self) -> DomainResult<Vec<Station>>;
    async fn list_by_location(&self, location_id: Uuid) -> DomainResult<Vec<Station>>;

    async fn set_available(&self, id: &str, available: bool) -> DomainResult<()>;
    async fn record_heartbeat(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()>;
    async fn record_boot(&self, id: &str, firmware_version: Option<&str>) -> DomainResult<()>;
    /// Seed or update a configuration key reported to the station.
    async fn set_config_value(
        &self,
        station_id: &str,
        key: &str,
        value: &str,
        readonly: bool,
    ) -> DomainResult<()>;

    async fn find_connector(
        &self,
        station_id: &str,
        connector_number: u32,
    ) -> DomainResult<Option<Connector>>;
    async fn list_connectors(&self, station_id: &str) -> DomainResult<Vec<Connector>>;
    async fn update_connector_status(
        &self,
        station_id: &str,
        connector_number: u32,
        status: ConnectorStatus,
        error_code: Option<&str>,
    ) -> DomainResult<()>;
    /// Free every occupied connector of a station (reboot reconciliation).
    async fn release_occupied_connectors(&self, station_id: &str) -> DomainResult<u64>;
}

#[async_trait]
pub trait TariffRepository: Send + Sync {
    /// The most recent active override for a client at `at`, if any.
    async fn find_client_tariff(
        &self,
        client_id: Uuid,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<ClientTariff>>;
    /// Active rules of a plan, priority descending then newest first.
    async fn list_active_rules(&self, plan_id: Uuid) -> DomainResult<Vec<TariffRule>>;
    /// The snapshot persisted for a session (pricing_history).
    async fn find_snapshot_for_session(
        &self,
        session_id: Uuid,
    ) -> DomainResult<Option<TariffSnapshot>>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<ChargingSession>>;
    /// The client's session not in a terminal state, if any.
    async fn find_active_for_client(&self, client_id: Uuid) -> DomainResult<Option<ChargingSession>>;
    /// The non-terminal session bound to a connector, if any.
    async fn find_active_for_connector(
        &self,
        station_id: &str,
        connector_number: u32,
    ) -> DomainResult<Option<ChargingSession>>;
    /// Most recent pending/started session of a client on a station
    /// (StartTransaction binding, steps 2 and 3).
    async fn find_bindable_for_client_on_station(
        &self,
        client_id: Uuid,
        station_id: &str,
    ) -> DomainResult<Option<ChargingSession>>;
    /// Pending/started sessions on a station without a bound OCPP
    /// transaction (reboot reconciliation).
    async fn find_unbound_on_station(&self, station_id: &str) -> DomainResult<Vec<ChargingSession>>;
    /// Started sessions on a station with a bound OCPP transaction
    /// (the station lost them across a reboot).
    async fn find_bound_active_on_station(
        &self,
        station_id: &str,
    ) -> DomainResult<Vec<ChargingSession>>;
    /// Sessions `started` before `cutoff` (hanging-session sweep).
    async fn find_hanging(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<ChargingSession>>;

    async fn bind_transaction(&self, session_id: Uuid, transaction_id: i32) -> DomainResult<()>;
    async fn update_energy(&self, session_id: Uuid, energy_kwh: f64) -> DomainResult<()>;
    /// Compare-and-set on the status column; returns false when the row
    /// was not in `from`. Used to fire a limit stop exactly once.
    async fn transition_status(
        &self,
        session_id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
    ) -> DomainResult<bool>;

    /// One transaction: debit the reservation (client row locked, balance
    /// must stay non-negative), insert the pricing snapshot, insert the
    /// session in `pending`, write the `charge_reserve` audit row and mark
    /// the connector occupied.
    /// Returns the created session and the client's balance after the
    /// reservation debit.
    async fn create_with_reservation(
        &self,
        new_session: NewChargingSession,
    ) -> DomainResult<(ChargingSession, Decimal)>;

    /// One transaction: settle a session — refund the unused reservation
    /// or debit the overdraft (capped at the available balance), write the
    /// audit row, finalize the session row and free the connector.
    async fn settle(
        &self,
        session_id: Uuid,
        actual_energy_kwh: f64,
        actual_cost: Decimal,
    ) -> DomainResult<SessionSettlement>;

    /// One transaction: transition an orphaned session to `error`, credit
    /// the full reservation back and write a `charge_refund` audit row.
    async fn fail_with_refund(&self, session_id: Uuid, description: &str) -> DomainResult<()>;
}

#[async_trait]
pub trait OcppTransactionRepository: Send + Sync {
    async fn find(
        &self,
        station_id: &str,
        transaction_id: i32,
    ) -> DomainResult<Option<OcppTransaction>>;
    /// Latest transaction bound to a charging session.
    async fn find_for_session(&self, session_id: Uuid) -> DomainResult<Option<OcppTransaction>>;
    async fn insert(&self, transaction: OcppTransaction) -> DomainResult<OcppTransaction>;
    async fn mark_stopped(
        &self,
        station_id: &str,
        transaction_id: i32,
        meter_stop: i32,
        stopped_at: DateTime<Utc>,
        reason: Option<&str>,
    ) -> DomainResult<Option<OcppTransaction>>;

    async fn append_meter_values(&self, row: MeterValueRow) -> DomainResult<()>;
    /// Last Energy.Active.Import.Register sample (Wh) for a transaction.
    async fn last_energy_register(
        &self,
        station_id: &str,
        transaction_id: i32,
    ) -> DomainResult<Option<f64>>;

    async fn upsert_authorization(&self, id_tag: &str, client_id: Option<Uuid>) -> DomainResult<()>;
    async fn find_authorization(&self, id_tag: &str) -> DomainResult<Option<OcppAuthorization>>;
}

#[async_trait]
pub trait IdempotencyRepository: Send + Sync {
    async fn find(&self, key: &str) -> DomainResult<Option<IdempotencyRecord>>;
    async fn insert(&self, record: IdempotencyRecord) -> DomainResult<()>;
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> DomainResult<u64>;
}

/// Unified access to all repositories (one per aggregate).
pub trait RepositoryProvider: Send + Sync {
    fn clients(&self) -> Arc<dyn ClientRepository>;
    fn stations(&self) -> Arc<dyn StationRepository>;
    fn tariffs(&self) -> Arc<dyn TariffRepository>;
    fn sessions(&self) -> Arc<dyn SessionRepository>;
    fn ocpp_transactions(&self) -> Arc<dyn OcppTransactionRepository>;
    fn idempotency(&self) -> Arc<dyn IdempotencyRepository>;
}
