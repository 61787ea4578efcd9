//! Station entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(nullable)]
    pub serial_number: Option<String>,

    #[sea_orm(nullable)]
    pub location_id: Option<Uuid>,

    /// Administrative status: active | inactive | maintenance
    pub status: String,

    /// Heartbeat-derived availability, maintained by the sweeper.
    pub is_available: bool,

    #[sea_orm(nullable)]
    pub last_heartbeat_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub last_boot_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub firmware_version: Option<String>,

    /// Station-specific price; overrides the plan when set and nonzero.
    #[sea_orm(nullable)]
    pub price_per_kwh: Option<Decimal>,

    #[sea_orm(nullable)]
    pub session_fee: Option<Decimal>,

    pub currency: String,

    #[sea_orm(nullable)]
    pub tariff_plan_id: Option<Uuid>,

    /// SHA-256 of the provisioned API key.
    #[sea_orm(nullable)]
    pub api_key_hash: Option<String>,

    #[sea_orm(nullable)]
    pub api_key_expires_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::connector::Entity")]
    Connectors,
    #[sea_orm(has_many = "super::charging_session::Entity")]
    ChargingSessions,
    #[sea_orm(
        belongs_to = "super::tariff_plan::Entity",
        from = "Column::TariffPlanId",
        to = "super::tariff_plan::Column::Id"
    )]
    TariffPlan,
}

impl Related<super::connector::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Connectors.def()
    }
}

impl Related<super::tariff_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TariffPlan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
