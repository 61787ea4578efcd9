//! SeaORM implementation of OcppTransactionRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::domain::{
    DomainResult, MeterValueRow, OcppAuthorization, OcppTransaction, OcppTransactionRepository,
    OcppTransactionStatus,
};
use crate::infrastructure::database::entities::{meter_value, ocpp_authorization, ocpp_transaction};

use super::db_err;

/// How many recent sample rows to scan for an energy register.
const ENERGY_LOOKBACK_ROWS: u64 = 10;

pub struct SeaOrmOcppTransactionRepository {
    db: DatabaseConnection,
}

impl SeaOrmOcppTransactionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: ocpp_transaction::Model) -> OcppTransaction {
    OcppTransaction {
        id: m.id,
        station_id: m.station_id,
        transaction_id: m.transaction_id,
        connector_number: m.connector_number as u32,
        id_tag: m.id_tag,
        meter_start: m.meter_start,
        meter_stop: m.meter_stop,
        started_at: m.started_at,
        stopped_at: m.stopped_at,
        stop_reason: m.stop_reason,
        status: OcppTransactionStatus::from_str(&m.status),
        charging_session_id: m.charging_session_id,
    }
}

fn auth_to_domain(m: ocpp_authorization::Model) -> OcppAuthorization {
    OcppAuthorization {
        id_tag: m.id_tag,
        status: m.status,
        client_id: m.client_id,
        expiry_date: m.expiry_date,
    }
}

/// Pull an Energy.Active.Import.Register reading (Wh) out of a stored
/// sampledValue array.
fn energy_register_from_samples(samples: &serde_json::Value) -> Option<f64> {
    let meter_values = samples.as_array()?;
    for meter_value in meter_values.iter().rev() {
        let sampled = meter_value.get("sampledValue")?.as_array()?;
        for sample in sampled.iter().rev() {
            let measurand = sample
                .get("measurand")
                .and_then(|m| m.as_str())
                .unwrap_or("Energy.Active.Import.Register");
            if measurand != "Energy.Active.Import.Register" {
                continue;
            }
            let value: f64 = sample.get("value")?.as_str()?.parse().ok()?;
            let unit = sample.get("unit").and_then(|u| u.as_str()).unwrap_or("Wh");
            return Some(if unit == "kWh" { value * 1000.0 } else { value });
        }
    }
    None
}

#[async_trait]
impl OcppTransactionRepository for SeaOrmOcppTransactionRepository {
    async fn find(
        &self,
        station_id: &str,
        transaction_id: i32,
    ) -> DomainResult<Option<OcppTransaction>> {
        let model = ocpp_transaction::Entity::find()
            .filter(ocpp_transaction::Column::StationId.eq(station_id))
            .filter(ocpp_transaction::Column::TransactionId.eq(transaction_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_for_session(&self, session_id: Uuid) -> DomainResult<Option<OcppTransaction>> {
        let model = ocpp_transaction::Entity::find()
            .filter(ocpp_transaction::Column::ChargingSessionId.eq(session_id))
            .order_by_desc(ocpp_transaction::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn insert(&self, transaction: OcppTransaction) -> DomainResult<OcppTransaction> {
        let model = ocpp_transaction::ActiveModel {
            station_id: Set(transaction.station_id.clone()),
            transaction_id: Set(transaction.transaction_id),
            connector_number: Set(transaction.connector_number as i32),
            id_tag: Set(transaction.id_tag.clone()),
            meter_start: Set(transaction.meter_start),
            meter_stop: Set(transaction.meter_stop),
            started_at: Set(transaction.started_at),
            stopped_at: Set(transaction.stopped_at),
            stop_reason: Set(transaction.stop_reason.clone()),
            status: Set(transaction.status.as_str().to_string()),
            charging_session_id: Set(transaction.charging_session_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(model_to_domain(model))
    }

    async fn mark_stopped(
        &self,
        station_id: &str,
        transaction_id: i32,
        meter_stop: i32,
        stopped_at: DateTime<Utc>,
        reason: Option<&str>,
    ) -> DomainResult<Option<OcppTransaction>> {
        let mut update = ocpp_transaction::Entity::update_many()
            .col_expr(ocpp_transaction::Column::MeterStop, Expr::value(meter_stop))
            .col_expr(ocpp_transaction::Column::StoppedAt, Expr::value(stopped_at))
            .col_expr(
                ocpp_transaction::Column::Status,
                Expr::value(OcppTransactionStatus::Stopped.as_str()),
            );
        if let Some(reason) = reason {
            update = update.col_expr(ocpp_transaction::Column::StopReason, Expr::value(reason));
        }
        update
            .filter(ocpp_transaction::Column::StationId.eq(station_id))
            .filter(ocpp_transaction::Column::TransactionId.eq(transaction_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        self.find(station_id, transaction_id).await
    }

    async fn append_meter_values(&self, row: MeterValueRow) -> DomainResult<()> {
        meter_value::ActiveModel {
            station_id: Set(row.station_id),
            transaction_id: Set(row.transaction_id),
            connector_number: Set(row.connector_number as i32),
            timestamp: Set(row.timestamp),
            sampled_values: Set(row.sampled_values),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn last_energy_register(
        &self,
        station_id: &str,
        transaction_id: i32,
    ) -> DomainResult<Option<f64>> {
        let rows = meter_value::Entity::find()
            .filter(meter_value::Column::StationId.eq(station_id))
            .filter(meter_value::Column::TransactionId.eq(transaction_id))
            .order_by_desc(meter_value::Column::Timestamp)
            .limit(ENERGY_LOOKBACK_ROWS)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(rows
            .iter()
            .find_map(|row| energy_register_from_samples(&row.sampled_values)))
    }

    async fn upsert_authorization(
        &self,
        id_tag: &str,
        client_id: Option<Uuid>,
    ) -> DomainResult<()> {
        let existing = ocpp_authorization::Entity::find_by_id(id_tag)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        if let Some(model) = existing {
            if model.client_id != client_id {
                let mut active: ocpp_authorization::ActiveModel = model.into();
                active.client_id = Set(client_id);
                active.update(&self.db).await.map_err(db_err)?;
            }
            return Ok(());
        }

        ocpp_authorization::ActiveModel {
            id_tag: Set(id_tag.to_string()),
            status: Set("Accepted".to_string()),
            parent_id_tag: Set(None),
            client_id: Set(client_id),
            expiry_date: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_authorization(&self, id_tag: &str) -> DomainResult<Option<OcppAuthorization>> {
        let model = ocpp_authorization::Entity::find_by_id(id_tag)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(auth_to_domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_energy_register_wh() {
        let samples = serde_json::json!([{
            "timestamp": "2025-06-01T12:00:00Z",
            "sampledValue": [
                {"value": "3.2", "measurand": "Power.Active.Import", "unit": "kW"},
                {"value": "11500", "measurand": "Energy.Active.Import.Register", "unit": "Wh"}
            ]
        }]);
        assert_eq!(energy_register_from_samples(&samples), Some(11500.0));
    }

    #[test]
    fn converts_kwh_unit() {
        let samples = serde_json::json!([{
            "sampledValue": [
                {"value": "11.5", "measurand": "Energy.Active.Import.Register", "unit": "kWh"}
            ]
        }]);
        assert_eq!(energy_register_from_samples(&samples), Some(11500.0));
    }

    #[test]
    fn missing_measurand_defaults_to_energy_register() {
        let samples = serde_json::json!([{
            "sampledValue": [{"value": "2000"}]
        }]);
        assert_eq!(energy_register_from_samples(&samples), Some(2000.0));
    }

    #[test]
    fn no_energy_sample_yields_none() {
        let samples = serde_json::json!([{
            "sampledValue": [
                {"value": "3.2", "measurand": "Power.Active.Import", "unit": "kW"}
            ]
        }]);
        assert_eq!(energy_register_from_samples(&samples), None);
    }
}
