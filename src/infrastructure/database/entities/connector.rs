//! Connector entity; unique on (station_id, connector_number)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "connectors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub station_id: String,
    pub connector_number: i32,

    /// CCS2, CHAdeMO, Type2, GB/T ...
    pub connector_type: String,

    #[sea_orm(nullable, column_type = "Double")]
    pub power_kw: Option<f64>,

    /// available | occupied | faulted | unavailable
    pub status: String,

    #[sea_orm(nullable)]
    pub error_code: Option<String>,

    #[sea_orm(nullable)]
    pub last_status_update: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::station::Entity",
        from = "Column::StationId",
        to = "super::station::Column::Id"
    )]
    Station,
}

impl Related<super::station::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Station.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
