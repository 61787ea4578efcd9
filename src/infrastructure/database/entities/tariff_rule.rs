//! Tariff rule entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tariff_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tariff_plan_id: Uuid,
    pub name: String,

    /// per_kwh | per_minute | session_fee | parking_fee
    pub tariff_type: String,

    /// Connector type filter; "ALL" or NULL matches everything.
    #[sea_orm(nullable)]
    pub connector_type: Option<String>,

    #[sea_orm(nullable, column_type = "Double")]
    pub power_range_min: Option<f64>,

    #[sea_orm(nullable, column_type = "Double")]
    pub power_range_max: Option<f64>,

    pub price: Decimal,
    pub currency: String,

    /// Window may cross midnight; inclusive bounds.
    #[sea_orm(nullable)]
    pub time_start: Option<Time>,

    #[sea_orm(nullable)]
    pub time_end: Option<Time>,

    /// ISO weekdays 1..7 as a JSON array; NULL = unfiltered.
    #[sea_orm(nullable)]
    pub days_of_week: Option<Json>,

    #[sea_orm(nullable)]
    pub is_weekend: Option<bool>,

    #[sea_orm(nullable)]
    pub valid_from: Option<Date>,

    #[sea_orm(nullable)]
    pub valid_until: Option<Date>,

    /// Higher wins. Within a plan, two active overlapping rules must not
    /// share a priority (admin validation enforces this).
    pub priority: i32,

    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tariff_plan::Entity",
        from = "Column::TariffPlanId",
        to = "super::tariff_plan::Column::Id"
    )]
    Plan,
}

impl Related<super::tariff_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
