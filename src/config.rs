// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use sqlx::postgres::PgPoolOptions;

use crate::{
    db::{MemoryStore, PgCustomFieldRepository, PgEntityLookup, PgWorkflowRepository},
    services::{CustomFieldService, TargetService, WorkflowService},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow!(
                "STORAGE_BACKEND inválido: '{}' (use 'postgres' ou 'memory')",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub bind_addr: String,
}

impl Config {
    /// Lê o `.env` (se existir) e as variáveis de ambiente.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let storage = env_or("STORAGE_BACKEND", "postgres").parse()?;

        let database_url = env::var("DATABASE_URL").ok();
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL deve ser definida"));
        }

        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", "5")
            .parse()
            .context("DATABASE_MAX_CONNECTIONS deve ser um número")?;
        let acquire_timeout = env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", "3")
            .parse()
            .map(Duration::from_secs)
            .context("DATABASE_ACQUIRE_TIMEOUT_SECS deve ser um número")?;

        Ok(Self {
            storage,
            database_url,
            max_connections,
            acquire_timeout,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub custom_field_service: CustomFieldService,
    pub workflow_service: WorkflowService,
    pub target_service: TargetService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let database_url = match (config.storage, config.database_url.as_deref()) {
            (StorageBackend::Memory, _) => {
                tracing::warn!("Usando armazenamento em memória; nada será persistido");
                return Ok(Self::in_memory());
            }
            (StorageBackend::Postgres, Some(url)) => url,
            (StorageBackend::Postgres, None) => {
                return Err(anyhow!("DATABASE_URL deve ser definida"))
            }
        };

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        sqlx::migrate!()
            .run(&db_pool)
            .await
            .context("Falha ao rodar as migrações do banco de dados")?;

        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

        // --- Monta o gráfico de dependências ---
        Ok(Self {
            custom_field_service: CustomFieldService::new(Arc::new(PgCustomFieldRepository::new(
                db_pool.clone(),
            ))),
            workflow_service: WorkflowService::new(Arc::new(PgWorkflowRepository::new(
                db_pool.clone(),
            ))),
            target_service: TargetService::new(Arc::new(PgEntityLookup::new(db_pool))),
        })
    }

    /// Mesmos serviços, sobre um único `MemoryStore`.
    pub fn in_memory() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            custom_field_service: CustomFieldService::new(Arc::new(store.clone())),
            workflow_service: WorkflowService::new(Arc::new(store.clone())),
            target_service: TargetService::new(Arc::new(store)),
        }
    }
}
