//! Wallet audit entity — append-only, before/after balances

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub client_id: Uuid,

    /// charge_reserve | charge_payment | charge_refund
    pub transaction_type: String,

    /// Signed: negative for debits, positive for credits.
    pub amount: Decimal,

    pub balance_before: Decimal,
    pub balance_after: Decimal,

    pub description: String,

    #[sea_orm(nullable)]
    pub charging_session_id: Option<Uuid>,

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
