//! Meter value entity — append-only time series

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ocpp_meter_values")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub station_id: String,

    #[sea_orm(nullable)]
    pub transaction_id: Option<i32>,

    pub connector_number: i32,
    pub timestamp: DateTimeUtc,

    /// The sampledValue array as received.
    pub sampled_values: Json,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
