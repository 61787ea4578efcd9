//! Core business entities, value objects and repository interfaces.

pub mod client;
pub mod error;
pub mod idempotency;
pub mod money;
pub mod ocpp;
pub mod repositories;
pub mod session;
pub mod station;
pub mod tariff;

pub use client::{Client, ClientStatus, PaymentKind, PaymentRecord};
pub use error::{DomainError, DomainResult};
pub use idempotency::IdempotencyRecord;
pub use ocpp::{MeterValueRow, OcppAuthorization, OcppTransaction, OcppTransactionStatus};
pub use repositories::{
    ClientRepository, IdempotencyRepository, OcppTransactionRepository, RepositoryProvider,
    SessionRepository, StationRepository, TariffRepository,
};
pub use session::{
    ChargingLimit, ChargingSession, LimitKind, NewChargingSession, SessionSettlement,
    SessionStatus,
};
pub use station::{
    derive_location_status, Connector, ConnectorStatus, LocationStatus, Station, StationStatus,
};
pub use tariff::{ClientTariff, TariffPlan, TariffRule, TariffSnapshot, TariffType};
