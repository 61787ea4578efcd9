//! Local authorisation entity; id_tag is the client's normalised phone

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ocpp_authorization")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id_tag: String,

    /// Accepted | Blocked | Expired | Invalid
    pub status: String,

    #[sea_orm(nullable)]
    pub parent_id_tag: Option<String>,

    #[sea_orm(nullable)]
    pub client_id: Option<Uuid>,

    #[sea_orm(nullable)]
    pub expiry_date: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
