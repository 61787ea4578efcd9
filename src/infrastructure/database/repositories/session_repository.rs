//! SeaORM implementation of SessionRepository
//!
//! The three money-moving paths (reservation, settlement, refund) each
//! run inside one database transaction with the client row locked
//! (`SELECT ... FOR UPDATE`), so concurrent Start/Stop on the same
//! client serialise and the balance never goes negative.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::domain::money::round_money;
use crate::domain::{
    ChargingSession, ConnectorStatus, DomainError, DomainResult, LimitKind, NewChargingSession,
    SessionRepository, SessionSettlement, SessionStatus,
};
use crate::infrastructure::database::entities::{
    charging_session, client, connector, payment_transaction, pricing_history,
};

use super::db_err;

const TERMINAL_STATUSES: [&str; 2] = ["stopped", "error"];
const BINDABLE_STATUSES: [&str; 2] = ["pending", "started"];

pub struct SeaOrmSessionRepository {
    db: DatabaseConnection,
}

impl SeaOrmSessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: charging_session::Model) -> ChargingSession {
    ChargingSession {
        id: m.id,
        client_id: m.client_id,
        station_id: m.station_id,
        connector_number: m.connector_number as u32,
        status: SessionStatus::from_str(&m.status),
        limit_kind: LimitKind::from_str(&m.limit_type),
        limit_value: m.limit_value,
        reserved_amount: m.reserved_amount,
        base_amount: m.base_amount,
        final_amount: m.final_amount,
        energy_kwh: m.energy_kwh,
        start_time: m.start_time,
        stop_time: m.stop_time,
        ocpp_transaction_id: m.ocpp_transaction_id,
        pricing_history_id: m.pricing_history_id,
    }
}

/// Lock and fetch the client row inside a settlement transaction.
async fn lock_client(
    txn: &DatabaseTransaction,
    client_id: Uuid,
) -> DomainResult<client::Model> {
    client::Entity::find_by_id(client_id)
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or(DomainError::ClientNotFound(client_id))
}

async fn set_client_balance(
    txn: &DatabaseTransaction,
    client_id: Uuid,
    balance: Decimal,
) -> DomainResult<()> {
    client::Entity::update_many()
        .col_expr(client::Column::Balance, Expr::value(balance))
        .col_expr(client::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(client::Column::Id.eq(client_id))
        .exec(txn)
        .await
        .map_err(db_err)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn insert_payment(
    txn: &DatabaseTransaction,
    client_id: Uuid,
    kind: &str,
    amount: Decimal,
    before: Decimal,
    after: Decimal,
    description: String,
    session_id: Uuid,
) -> DomainResult<()> {
    payment_transaction::ActiveModel {
        client_id: Set(client_id),
        transaction_type: Set(kind.to_string()),
        amount: Set(amount),
        balance_before: Set(before),
        balance_after: Set(after),
        description: Set(description),
        charging_session_id: Set(Some(session_id)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(db_err)?;
    Ok(())
}

async fn set_connector_status(
    txn: &DatabaseTransaction,
    station_id: &str,
    connector_number: i32,
    status: ConnectorStatus,
) -> DomainResult<()> {
    connector::Entity::update_many()
        .col_expr(connector::Column::Status, Expr::value(status.as_str()))
        .col_expr(connector::Column::LastStatusUpdate, Expr::value(Utc::now()))
        .filter(connector::Column::StationId.eq(station_id))
        .filter(connector::Column::ConnectorNumber.eq(connector_number))
        .exec(txn)
        .await
        .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl SessionRepository for SeaOrmSessionRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<ChargingSession>> {
        let model = charging_session::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_active_for_client(
        &self,
        client_id: Uuid,
    ) -> DomainResult<Option<ChargingSession>> {
        let model = charging_session::Entity::find()
            .filter(charging_session::Column::ClientId.eq(client_id))
            .filter(charging_session::Column::Status.is_not_in(TERMINAL_STATUSES))
            .order_by_desc(charging_session::Column::StartTime)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_active_for_connector(
        &self,
        station_id: &str,
        connector_number: u32,
    ) -> DomainResult<Option<ChargingSession>> {
        let model = charging_session::Entity::find()
            .filter(charging_session::Column::StationId.eq(station_id))
            .filter(charging_session::Column::ConnectorNumber.eq(connector_number as i32))
            .filter(charging_session::Column::Status.is_not_in(TERMINAL_STATUSES))
            .order_by_desc(charging_session::Column::StartTime)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_bindable_for_client_on_station(
        &self,
        client_id: Uuid,
        station_id: &str,
    ) -> DomainResult<Option<ChargingSession>> {
        let model = charging_session::Entity::find()
            .filter(charging_session::Column::ClientId.eq(client_id))
            .filter(charging_session::Column::StationId.eq(station_id))
            .filter(charging_session::Column::Status.is_in(BINDABLE_STATUSES))
            .filter(charging_session::Column::OcppTransactionId.is_null())
            .order_by_desc(charging_session::Column::StartTime)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_unbound_on_station(
        &self,
        station_id: &str,
    ) -> DomainResult<Vec<ChargingSession>> {
        let models = charging_session::Entity::find()
            .filter(charging_session::Column::StationId.eq(station_id))
            .filter(charging_session::Column::Status.is_in(BINDABLE_STATUSES))
            .filter(charging_session::Column::OcppTransactionId.is_null())
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_bound_active_on_station(
        &self,
        station_id: &str,
    ) -> DomainResult<Vec<ChargingSession>> {
        let models = charging_session::Entity::find()
            .filter(charging_session::Column::StationId.eq(station_id))
            .filter(charging_session::Column::Status.is_in(["started", "stopping"]))
            .filter(charging_session::Column::OcppTransactionId.is_not_null())
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_hanging(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<ChargingSession>> {
        let models = charging_session::Entity::find()
            .filter(charging_session::Column::Status.eq("started"))
            .filter(charging_session::Column::StartTime.lt(cutoff))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn bind_transaction(&self, session_id: Uuid, transaction_id: i32) -> DomainResult<()> {
        charging_session::Entity::update_many()
            .col_expr(
                charging_session::Column::OcppTransactionId,
                Expr::value(transaction_id),
            )
            .col_expr(charging_session::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(charging_session::Column::Id.eq(session_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        // pending → started; an already-started session keeps its status
        charging_session::Entity::update_many()
            .col_expr(charging_session::Column::Status, Expr::value("started"))
            .filter(charging_session::Column::Id.eq(session_id))
            .filter(charging_session::Column::Status.eq("pending"))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_energy(&self, session_id: Uuid, energy_kwh: f64) -> DomainResult<()> {
        charging_session::Entity::update_many()
            .col_expr(charging_session::Column::EnergyKwh, Expr::value(energy_kwh))
            .col_expr(charging_session::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(charging_session::Column::Id.eq(session_id))
            .filter(charging_session::Column::Status.is_not_in(TERMINAL_STATUSES))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn transition_status(
        &self,
        session_id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
    ) -> DomainResult<bool> {
        let result = charging_session::Entity::update_many()
            .col_expr(charging_session::Column::Status, Expr::value(to.as_str()))
            .col_expr(charging_session::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(charging_session::Column::Id.eq(session_id))
            .filter(charging_session::Column::Status.eq(from.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn create_with_reservation(
        &self,
        new_session: NewChargingSession,
    ) -> DomainResult<(ChargingSession, Decimal)> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let now = Utc::now();
        let session_id = Uuid::new_v4();

        // Debit under the row lock; the balance must stay non-negative.
        let client = lock_client(&txn, new_session.client_id).await?;
        if client.balance < new_session.reserved_amount {
            return Err(DomainError::InsufficientBalance {
                balance: client.balance,
                required: new_session.reserved_amount,
            });
        }
        let new_balance = round_money(client.balance - new_session.reserved_amount);
        set_client_balance(&txn, client.id, new_balance).await?;

        // Snapshot for audit, keyed to the session
        let snapshot = &new_session.snapshot;
        let pricing_history_id = Uuid::new_v4();
        pricing_history::ActiveModel {
            id: Set(pricing_history_id),
            station_id: Set(new_session.station_id.clone()),
            session_id: Set(Some(session_id)),
            tariff_plan_id: Set(snapshot.tariff_plan_id),
            rule_id: Set(snapshot.rule_id),
            calculation_time: Set(now),
            rate_per_kwh: Set(snapshot.rate_per_kwh),
            rate_per_minute: Set(snapshot.rate_per_minute),
            session_fee: Set(snapshot.session_fee),
            parking_fee_per_minute: Set(snapshot.parking_fee_per_minute),
            currency: Set(snapshot.currency.clone()),
            rule_name: Set(snapshot.active_rule.clone()),
            rule_details: Set(snapshot.rule_details.clone()),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        let model = charging_session::ActiveModel {
            id: Set(session_id),
            client_id: Set(new_session.client_id),
            station_id: Set(new_session.station_id.clone()),
            connector_number: Set(new_session.connector_number as i32),
            status: Set(SessionStatus::Pending.as_str().to_string()),
            limit_type: Set(new_session.limit_kind.as_str().to_string()),
            limit_value: Set(new_session.limit_value),
            reserved_amount: Set(new_session.reserved_amount),
            base_amount: Set(new_session.base_amount),
            final_amount: Set(None),
            energy_kwh: Set(None),
            start_time: Set(now),
            stop_time: Set(None),
            ocpp_transaction_id: Set(None),
            pricing_history_id: Set(Some(pricing_history_id)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        insert_payment(
            &txn,
            client.id,
            "charge_reserve",
            -new_session.reserved_amount,
            client.balance,
            new_balance,
            format!("Reservation for charging session {session_id}"),
            session_id,
        )
        .await?;

        set_connector_status(
            &txn,
            &new_session.station_id,
            new_session.connector_number as i32,
            ConnectorStatus::Occupied,
        )
        .await?;

        txn.commit().await.map_err(db_err)?;
        Ok((model_to_domain(model), new_balance))
    }

    async fn settle(
        &self,
        session_id: Uuid,
        actual_energy_kwh: f64,
        actual_cost: Decimal,
    ) -> DomainResult<SessionSettlement> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let now = Utc::now();
        let actual_cost = round_money(actual_cost);

        let session = charging_session::Entity::find_by_id(session_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(DomainError::SessionNotFound(session_id))?;

        if TERMINAL_STATUSES.contains(&session.status.as_str()) {
            return Err(DomainError::Conflict(format!(
                "Session {session_id} already settled"
            )));
        }

        let client = lock_client(&txn, session.client_id).await?;
        let reserved = session.reserved_amount;

        let mut refund = Decimal::ZERO;
        let mut additional_charge = Decimal::ZERO;
        let mut overdraft_uncovered = false;

        let new_balance = if actual_cost > reserved {
            // Overdraft: debit the difference, capped at what's there.
            let overdraft = round_money(actual_cost - reserved);
            additional_charge = overdraft.min(client.balance);
            overdraft_uncovered = additional_charge < overdraft;
            let after = round_money(client.balance - additional_charge);
            if additional_charge > Decimal::ZERO {
                insert_payment(
                    &txn,
                    client.id,
                    "charge_payment",
                    -additional_charge,
                    client.balance,
                    after,
                    format!("Overdraft payment for session {session_id}"),
                    session_id,
                )
                .await?;
            }
            after
        } else {
            refund = round_money(reserved - actual_cost);
            let after = round_money(client.balance + refund);
            if refund > Decimal::ZERO {
                insert_payment(
                    &txn,
                    client.id,
                    "charge_refund",
                    refund,
                    client.balance,
                    after,
                    format!(
                        "Refund for session {session_id}: {actual_energy_kwh:.3} kWh delivered"
                    ),
                    session_id,
                )
                .await?;
            }
            after
        };

        set_client_balance(&txn, client.id, new_balance).await?;

        charging_session::Entity::update_many()
            .col_expr(charging_session::Column::Status, Expr::value("stopped"))
            .col_expr(charging_session::Column::StopTime, Expr::value(now))
            .col_expr(
                charging_session::Column::EnergyKwh,
                Expr::value(actual_energy_kwh),
            )
            .col_expr(
                charging_session::Column::FinalAmount,
                Expr::value(actual_cost),
            )
            .col_expr(charging_session::Column::UpdatedAt, Expr::value(now))
            .filter(charging_session::Column::Id.eq(session_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        set_connector_status(
            &txn,
            &session.station_id,
            session.connector_number,
            ConnectorStatus::Available,
        )
        .await?;

        txn.commit().await.map_err(db_err)?;

        Ok(SessionSettlement {
            session_id,
            actual_energy_kwh,
            actual_cost,
            refund,
            additional_charge,
            overdraft_uncovered,
            new_balance,
        })
    }

    async fn fail_with_refund(&self, session_id: Uuid, description: &str) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let now = Utc::now();

        let session = charging_session::Entity::find_by_id(session_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(DomainError::SessionNotFound(session_id))?;

        // Idempotent: a second reconciliation pass is a no-op.
        if TERMINAL_STATUSES.contains(&session.status.as_str()) {
            return Ok(());
        }

        let client = lock_client(&txn, session.client_id).await?;
        let refund = session.reserved_amount;
        let new_balance = round_money(client.balance + refund);

        if refund > Decimal::ZERO {
            insert_payment(
                &txn,
                client.id,
                "charge_refund",
                refund,
                client.balance,
                new_balance,
                format!("{description} (session {session_id})"),
                session_id,
            )
            .await?;
            set_client_balance(&txn, client.id, new_balance).await?;
        }

        charging_session::Entity::update_many()
            .col_expr(charging_session::Column::Status, Expr::value("error"))
            .col_expr(charging_session::Column::StopTime, Expr::value(now))
            .col_expr(charging_session::Column::EnergyKwh, Expr::value(0.0_f64))
            .col_expr(
                charging_session::Column::FinalAmount,
                Expr::value(Decimal::ZERO),
            )
            .col_expr(charging_session::Column::UpdatedAt, Expr::value(now))
            .filter(charging_session::Column::Id.eq(session_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }
}
