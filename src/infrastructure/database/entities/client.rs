//! Client (wallet) entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub phone: String,

    /// KGS, 2 decimal places. Non-negative after every committed
    /// transition; enforced by the settlement transactions.
    pub balance: Decimal,

    /// active | inactive | blocked | pending_deletion
    pub status: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::charging_session::Entity")]
    ChargingSessions,
    #[sea_orm(has_many = "super::payment_transaction::Entity")]
    PaymentTransactions,
}

impl Related<super::charging_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingSessions.def()
    }
}

impl Related<super::payment_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
