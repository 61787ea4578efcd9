//! SeaORM implementation of RepositoryProvider

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::domain::{
    ClientRepository, IdempotencyRepository, OcppTransactionRepository, RepositoryProvider,
    SessionRepository, StationRepository, TariffRepository,
};

use super::client_repository::SeaOrmClientRepository;
use super::idempotency_repository::SeaOrmIdempotencyRepository;
use super::ocpp_transaction_repository::SeaOrmOcppTransactionRepository;
use super::session_repository::SeaOrmSessionRepository;
use super::station_repository::SeaOrmStationRepository;
use super::tariff_repository::SeaOrmTariffRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repositories.
pub struct SeaOrmRepositoryProvider {
    clients: Arc<SeaOrmClientRepository>,
    stations: Arc<SeaOrmStationRepository>,
    tariffs: Arc<SeaOrmTariffRepository>,
    sessions: Arc<SeaOrmSessionRepository>,
    ocpp_transactions: Arc<SeaOrmOcppTransactionRepository>,
    idempotency: Arc<SeaOrmIdempotencyRepository>,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            clients: Arc::new(SeaOrmClientRepository::new(db.clone())),
            stations: Arc::new(SeaOrmStationRepository::new(db.clone())),
            tariffs: Arc::new(SeaOrmTariffRepository::new(db.clone())),
            sessions: Arc::new(SeaOrmSessionRepository::new(db.clone())),
            ocpp_transactions: Arc::new(SeaOrmOcppTransactionRepository::new(db.clone())),
            idempotency: Arc::new(SeaOrmIdempotencyRepository::new(db)),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn clients(&self) -> Arc<dyn ClientRepository> {
        self.clients.clone()
    }

    fn stations(&self) -> Arc<dyn StationRepository> {
        self.stations.clone()
    }

    fn tariffs(&self) -> Arc<dyn TariffRepository> {
        self.tariffs.clone()
    }

    fn sessions(&self) -> Arc<dyn SessionRepository> {
        self.sessions.clone()
    }

    fn ocpp_transactions(&self) -> Arc<dyn OcppTransactionRepository> {
        self.ocpp_transactions.clone()
    }

    fn idempotency(&self) -> Arc<dyn IdempotencyRepository> {
        self.idempotency.clone()
    }
}
