//! OCPP transaction entity
//!
//! Unique on (station_id, transaction_id): StartTransaction replays
//! within the same Unix second resolve to the existing row.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ocpp_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub station_id: String,
    pub transaction_id: i32,
    pub connector_number: i32,
    pub id_tag: String,

    /// Wh register at start
    pub meter_start: i32,

    #[sea_orm(nullable)]
    pub meter_stop: Option<i32>,

    pub started_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub stopped_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub stop_reason: Option<String>,

    /// Started | Stopped
    pub status: String,

    #[sea_orm(nullable)]
    pub charging_session_id: Option<Uuid>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charging_session::Entity",
        from = "Column::ChargingSessionId",
        to = "super::charging_session::Column::Id"
    )]
    ChargingSession,
}

impl Related<super::charging_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingSession.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
