//! Pricing history entity — the persisted tariff snapshot per session

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "pricing_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub station_id: String,

    #[sea_orm(nullable)]
    pub session_id: Option<Uuid>,

    #[sea_orm(nullable)]
    pub tariff_plan_id: Option<Uuid>,

    #[sea_orm(nullable)]
    pub rule_id: Option<Uuid>,

    pub calculation_time: DateTimeUtc,

    pub rate_per_kwh: Decimal,
    pub rate_per_minute: Decimal,
    pub session_fee: Decimal,
    pub parking_fee_per_minute: Decimal,
    pub currency: String,

    pub rule_name: String,
    pub rule_details: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
