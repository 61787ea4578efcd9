//! Domain errors
//!
//! One variant per user-visible failure; `code()` yields the stable wire
//! code the HTTP layer reports. Database failures are folded into
//! `Database` and treated as transient for the bounded-retry path.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Client not found: {0}")]
    ClientNotFound(Uuid),

    #[error("Account is pending deletion")]
    AccountDeletionPending,

    #[error("Account is blocked")]
    AccountBlocked,

    #[error("Station not found: {0}")]
    StationNotFound(String),

    #[error("Station {station_id} is offline (last heartbeat {minutes_ago} minutes ago)")]
    StationOffline {
        station_id: String,
        minutes_ago: i64,
    },

    #[error("Station {0} has never connected")]
    StationNeverConnected(String),

    #[error("Connector {0} not found")]
    ConnectorNotFound(u32),

    #[error("Connector {0} is occupied or faulted")]
    ConnectorOccupied(u32),

    #[error("Client already has an active charging session")]
    SessionAlreadyActive,

    #[error("Charging session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Insufficient balance: {balance} available, {required} required")]
    InsufficientBalance { balance: Decimal, required: Decimal },

    #[error("Requested amount {requested} exceeds balance {balance}")]
    AmountExceedsBalance { balance: Decimal, requested: Decimal },

    #[error("Balance is empty")]
    ZeroBalance { balance: Decimal },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl DomainError {
    /// Stable error code reported to API callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ClientNotFound(_) => "client_not_found",
            Self::AccountDeletionPending => "account_deletion_pending",
            Self::AccountBlocked => "account_blocked",
            Self::StationNotFound(_) => "station_not_found",
            Self::StationOffline { .. } => "station_offline",
            Self::StationNeverConnected(_) => "station_never_connected",
            Self::ConnectorNotFound(_) => "connector_not_found",
            Self::ConnectorOccupied(_) => "connector_occupied",
            Self::SessionAlreadyActive => "session_already_active",
            Self::SessionNotFound(_) => "session_not_found",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::AmountExceedsBalance { .. } => "amount_exceeds_balance",
            Self::ZeroBalance { .. } => "zero_balance",
            Self::Validation(_) => "invalid_request",
            Self::Conflict(_) => "invalid_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Database(_) => "internal_error",
        }
    }

    /// Whether this error is likely transient (e.g. DB connection lost)
    /// and the operation may succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
