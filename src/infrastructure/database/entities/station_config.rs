//! Station configuration entity; unique on (station_id, key)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ocpp_station_config")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub station_id: String,
    pub key: String,
    pub value: String,
    pub readonly: bool,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
