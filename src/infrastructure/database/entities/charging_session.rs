//! Charging session entity
//!
//! A partial unique index on (client_id) WHERE status NOT IN
//! ('stopped','error') backs the one-active-session-per-client
//! invariant; the engine checks it first so callers get a clean error.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "charging_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub client_id: Uuid,
    pub station_id: String,
    pub connector_number: i32,

    /// pending | started | stopping | stopped | error
    pub status: String,

    /// none | energy | amount
    pub limit_type: String,

    /// kWh for energy limits, KGS for amount limits, 0 for none.
    pub limit_value: Decimal,

    pub reserved_amount: Decimal,
    pub base_amount: Decimal,

    #[sea_orm(nullable)]
    pub final_amount: Option<Decimal>,

    #[sea_orm(nullable, column_type = "Double")]
    pub energy_kwh: Option<f64>,

    pub start_time: DateTimeUtc,

    #[sea_orm(nullable)]
    pub stop_time: Option<DateTimeUtc>,

    /// Bound from the station's StartTransaction; NULL until observed.
    #[sea_orm(nullable)]
    pub ocpp_transaction_id: Option<i32>,

    #[sea_orm(nullable)]
    pub pricing_history_id: Option<Uuid>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
    #[sea_orm(
        belongs_to = "super::station::Entity",
        from = "Column::StationId",
        to = "super::station::Column::Id"
    )]
    Station,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::station::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Station.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
