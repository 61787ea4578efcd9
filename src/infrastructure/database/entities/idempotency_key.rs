//! Idempotency record entity; 24-hour retention

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "idempotency_keys")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,

    pub method: String,
    pub path: String,

    /// SHA-256 of the canonical-JSON body, hex-encoded.
    pub body_hash: String,

    pub response_json: Json,
    pub status_code: i16,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
