//! SeaORM implementation of StationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::domain::{
    Connector, ConnectorStatus, DomainResult, Station, StationRepository, StationStatus,
};
use crate::infrastructure::database::entities::{connector, station, station_config};

use super::db_err;

pub struct SeaOrmStationRepository {
    db: DatabaseConnection,
}

impl SeaOrmStationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn station_to_domain(m: station::Model) -> Station {
    Station {
        id: m.id,
        serial: m.serial_number,
        location_id: m.location_id,
        status: StationStatus::from_str(&m.status),
        is_available: m.is_available,
        last_heartbeat_at: m.last_heartbeat_at,
        firmware_version: m.firmware_version,
        price_per_kwh: m.price_per_kwh,
        session_fee: m.session_fee,
        currency: m.currency,
        tariff_plan_id: m.tariff_plan_id,
        api_key_hash: m.api_key_hash,
        api_key_expires_at: m.api_key_expires_at,
    }
}

pub(crate) fn connector_to_domain(m: connector::Model) -> Connector {
    Connector {
        station_id: m.station_id,
        connector_number: m.connector_number as u32,
        connector_type: m.connector_type,
        power_kw: m.power_kw,
        status: ConnectorStatus::from_str(&m.status),
        error_code: m.error_code,
        last_status_update: m.last_status_update,
    }
}

#[async_trait]
impl StationRepository for SeaOrmStationRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Station>> {
        let model = station::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(station_to_domain))
    }

    async fn list_all(&self) -> DomainResult<Vec<Station>> {
        let models = station::Entity::find().all(&self.db).await.map_err(db_err)?;
        Ok(models.into_iter().map(station_to_domain).collect())
    }

    async fn list_by_location(&self, location_id: Uuid) -> DomainResult<Vec<Station>> {
        let models = station::Entity::find()
            .filter(station::Column::LocationId.eq(location_id))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(station_to_domain).collect())
    }

    async fn set_available(&self, id: &str, available: bool) -> DomainResult<()> {
        station::Entity::update_many()
            .col_expr(station::Column::IsAvailable, Expr::value(available))
            .col_expr(station::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(station::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn record_heartbeat(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()> {
        station::Entity::update_many()
            .col_expr(station::Column::LastHeartbeatAt, Expr::value(at))
            .col_expr(station::Column::IsAvailable, Expr::value(true))
            .col_expr(station::Column::UpdatedAt, Expr::value(at))
            .filter(station::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn record_boot(&self, id: &str, firmware_version: Option<&str>) -> DomainResult<()> {
        let now = Utc::now();
        let mut update = station::Entity::update_many()
            .col_expr(station::Column::LastBootAt, Expr::value(now))
            .col_expr(station::Column::LastHeartbeatAt, Expr::value(now))
            .col_expr(station::Column::IsAvailable, Expr::value(true))
            .col_expr(station::Column::UpdatedAt, Expr::value(now));
        if let Some(firmware) = firmware_version {
            update = update.col_expr(station::Column::FirmwareVersion, Expr::value(firmware));
        }
        update
            .filter(station::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_config_value(
        &self,
        station_id: &str,
        key: &str,
        value: &str,
        readonly: bool,
    ) -> DomainResult<()> {
        let existing = station_config::Entity::find()
            .filter(station_config::Column::StationId.eq(station_id))
            .filter(station_config::Column::Key.eq(key))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        match existing {
            Some(model) => {
                let mut active: station_config::ActiveModel = model.into();
                active.value = Set(value.to_string());
                active.readonly = Set(readonly);
                active.updated_at = Set(Utc::now());
                active.update(&self.db).await.map_err(db_err)?;
            }
            None => {
                let active = station_config::ActiveModel {
                    station_id: Set(station_id.to_string()),
                    key: Set(key.to_string()),
                    value: Set(value.to_string()),
                    readonly: Set(readonly),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                };
                active.insert(&self.db).await.map_err(db_err)?;
            }
        }
        Ok(())
    }

    async fn find_connector(
        &self,
        station_id: &str,
        connector_number: u32,
    ) -> DomainResult<Option<Connector>> {
        let model = connector::Entity::find()
            .filter(connector::Column::StationId.eq(station_id))
            .filter(connector::Column::ConnectorNumber.eq(connector_number as i32))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(connector_to_domain))
    }

    async fn list_connectors(&self, station_id: &str) -> DomainResult<Vec<Connector>> {
        let models = connector::Entity::find()
            .filter(connector::Column::StationId.eq(station_id))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(connector_to_domain).collect())
    }

    async fn update_connector_status(
        &self,
        station_id: &str,
        connector_number: u32,
        status: ConnectorStatus,
        error_code: Option<&str>,
    ) -> DomainResult<()> {
        let mut update = connector::Entity::update_many()
            .col_expr(connector::Column::Status, Expr::value(status.as_str()))
            .col_expr(connector::Column::LastStatusUpdate, Expr::value(Utc::now()));
        if let Some(code) = error_code {
            update = update.col_expr(connector::Column::ErrorCode, Expr::value(code));
        }
        update
            .filter(connector::Column::StationId.eq(station_id))
            .filter(connector::Column::ConnectorNumber.eq(connector_number as i32))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn release_occupied_connectors(&self, station_id: &str) -> DomainResult<u64> {
        let result = connector::Entity::update_many()
            .col_expr(
                connector::Column::Status,
                Expr::value(ConnectorStatus::Available.as_str()),
            )
            .col_expr(connector::Column::ErrorCode, Expr::value("NoError"))
            .col_expr(connector::Column::LastStatusUpdate, Expr::value(Utc::now()))
            .filter(connector::Column::StationId.eq(station_id))
            .filter(connector::Column::Status.eq(ConnectorStatus::Occupied.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}
