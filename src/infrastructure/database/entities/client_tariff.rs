//! Per-client tariff override entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "client_tariffs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub client_id: Uuid,

    #[sea_orm(nullable)]
    pub tariff_plan_id: Option<Uuid>,

    #[sea_orm(nullable)]
    pub discount_percent: Option<Decimal>,

    /// Short-circuits plan resolution when set.
    #[sea_orm(nullable)]
    pub fixed_rate_per_kwh: Option<Decimal>,

    pub is_active: bool,
    pub valid_from: DateTimeUtc,

    #[sea_orm(nullable)]
    pub valid_until: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
