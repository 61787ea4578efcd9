//! SeaORM implementation of ClientRepository

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DbBackend, EntityTrait, Statement};
use uuid::Uuid;

use crate::domain::{Client, ClientRepository, ClientStatus, DomainResult};
use crate::infrastructure::database::entities::client;

use super::db_err;

pub struct SeaOrmClientRepository {
    db: DatabaseConnection,
}

impl SeaOrmClientRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

pub(crate) fn model_to_domain(m: client::Model) -> Client {
    Client {
        id: m.id,
        phone: m.phone,
        balance: m.balance,
        status: ClientStatus::from_str(&m.status),
        created_at: m.created_at,
    }
}

#[async_trait]
impl ClientRepository for SeaOrmClientRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Client>> {
        let model = client::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_phone_digits(&self, digits: &str) -> DomainResult<Option<Client>> {
        // Stored phones carry formatting ('+', spaces); compare after
        // stripping non-digits on the database side.
        let model = client::Entity::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"SELECT * FROM "clients" WHERE regexp_replace("phone", '\D', '', 'g') = $1 LIMIT 1"#,
                [digits.into()],
            ))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }
}
