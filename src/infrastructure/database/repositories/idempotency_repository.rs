//! SeaORM implementation of IdempotencyRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::domain::{DomainResult, IdempotencyRecord, IdempotencyRepository};
use crate::infrastructure::database::entities::idempotency_key;

use super::db_err;

pub struct SeaOrmIdempotencyRepository {
    db: DatabaseConnection,
}

impl SeaOrmIdempotencyRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: idempotency_key::Model) -> IdempotencyRecord {
    IdempotencyRecord {
        key: m.key,
        method: m.method,
        path: m.path,
        body_hash: m.body_hash,
        response_body: m.response_json,
        status_code: m.status_code as u16,
        created_at: m.created_at,
    }
}

#[async_trait]
impl IdempotencyRepository for SeaOrmIdempotencyRepository {
    async fn find(&self, key: &str) -> DomainResult<Option<IdempotencyRecord>> {
        let model = idempotency_key::Entity::find_by_id(key)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn insert(&self, record: IdempotencyRecord) -> DomainResult<()> {
        idempotency_key::ActiveModel {
            key: Set(record.key),
            method: Set(record.method),
            path: Set(record.path),
            body_hash: Set(record.body_hash),
            response_json: Set(record.response_body),
            status_code: Set(record.status_code as i16),
            created_at: Set(record.created_at),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let result = idempotency_key::Entity::delete_many()
            .filter(idempotency_key::Column::CreatedAt.lt(cutoff))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}
