//! SeaORM implementation of TariffRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::domain::{
    ClientTariff, DomainResult, TariffRepository, TariffRule, TariffSnapshot, TariffType,
};
use crate::infrastructure::database::entities::{client_tariff, pricing_history, tariff_rule};

use super::db_err;

pub struct SeaOrmTariffRepository {
    db: DatabaseConnection,
}

impl SeaOrmTariffRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn rule_to_domain(m: tariff_rule::Model) -> TariffRule {
    let days_of_week = m
        .days_of_week
        .as_ref()
        .and_then(|v| serde_json::from_value::<Vec<u8>>(v.clone()).ok())
        .unwrap_or_default();

    TariffRule {
        id: m.id,
        tariff_plan_id: m.tariff_plan_id,
        name: m.name,
        tariff_type: TariffType::from_str(&m.tariff_type),
        connector_type: m.connector_type,
        power_range_min: m.power_range_min,
        power_range_max: m.power_range_max,
        price: m.price,
        currency: m.currency,
        time_start: m.time_start,
        time_end: m.time_end,
        days_of_week,
        is_weekend: m.is_weekend,
        valid_from: m.valid_from,
        valid_until: m.valid_until,
        priority: m.priority,
        is_active: m.is_active,
        created_at: m.created_at,
    }
}

fn client_tariff_to_domain(m: client_tariff::Model) -> ClientTariff {
    ClientTariff {
        id: m.id,
        client_id: m.client_id,
        fixed_rate_per_kwh: m.fixed_rate_per_kwh,
        tariff_plan_id: m.tariff_plan_id,
        discount_percent: m.discount_percent,
        valid_from: m.valid_from,
        valid_until: m.valid_until,
        is_active: m.is_active,
    }
}

fn history_to_snapshot(m: pricing_history::Model) -> TariffSnapshot {
    TariffSnapshot {
        rate_per_kwh: m.rate_per_kwh,
        rate_per_minute: m.rate_per_minute,
        session_fee: m.session_fee,
        parking_fee_per_minute: m.parking_fee_per_minute,
        currency: m.currency,
        active_rule: m.rule_name,
        rule_details: m.rule_details,
        time_based: false,
        next_rate_change: None,
        tariff_plan_id: m.tariff_plan_id,
        rule_id: m.rule_id,
    }
}

#[async_trait]
impl TariffRepository for SeaOrmTariffRepository {
    async fn find_client_tariff(
        &self,
        client_id: Uuid,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<ClientTariff>> {
        let model = client_tariff::Entity::find()
            .filter(client_tariff::Column::ClientId.eq(client_id))
            .filter(client_tariff::Column::IsActive.eq(true))
            .filter(client_tariff::Column::ValidFrom.lte(at))
            .filter(
                Condition::any()
                    .add(client_tariff::Column::ValidUntil.is_null())
                    .add(client_tariff::Column::ValidUntil.gt(at)),
            )
            .order_by_desc(client_tariff::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(client_tariff_to_domain))
    }

    async fn list_active_rules(&self, plan_id: Uuid) -> DomainResult<Vec<TariffRule>> {
        let models = tariff_rule::Entity::find()
            .filter(tariff_rule::Column::TariffPlanId.eq(plan_id))
            .filter(tariff_rule::Column::IsActive.eq(true))
            .order_by_desc(tariff_rule::Column::Priority)
            .order_by_desc(tariff_rule::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(rule_to_domain).collect())
    }

    async fn find_snapshot_for_session(
        &self,
        session_id: Uuid,
    ) -> DomainResult<Option<TariffSnapshot>> {
        let model = pricing_history::Entity::find()
            .filter(pricing_history::Column::SessionId.eq(session_id))
            .order_by_desc(pricing_history::Column::CalculationTime)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(history_to_snapshot))
    }
}
