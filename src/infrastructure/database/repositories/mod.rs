//! SeaORM repository implementations
//!
//! Per-aggregate repositories + unified RepositoryProvider.

pub mod client_repository;
pub mod idempotency_repository;
pub mod ocpp_transaction_repository;
pub mod repository_provider;
pub mod session_repository;
pub mod station_repository;
pub mod tariff_repository;

pub use repository_provider::SeaOrmRepositoryProvider;

use crate::domain::DomainError;

/// Shared DbErr → DomainError mapping.
pub(crate) fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Database(e.to_string())
}
