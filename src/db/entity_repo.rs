// src/db/entity_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{common::error::AppError, models::entity::EntityKind};

/// Checagem de existência para referências polimórficas,
/// já que o par entity_type/entity_id não tem chave estrangeira.
#[async_trait]
pub trait EntityLookup: Send + Sync {
    async fn exists(&self, kind: EntityKind, id: i64) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgEntityLookup {
    pool: PgPool,
}

impl PgEntityLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityLookup for PgEntityLookup {
    async fn exists(&self, kind: EntityKind, id: i64) -> Result<bool, AppError> {
        // O nome da tabela vem de um enum fechado, nunca da entrada do usuário
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", kind.table());
        let found: bool = sqlx::query_scalar(&sql).bind(id).fetch_one(&self.pool).await?;
        Ok(found)
    }
}
