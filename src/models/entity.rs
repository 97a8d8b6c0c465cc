// src/models/entity.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Valor sentinela de `entity_type` para "sem vínculo".
pub const NO_ENTITY: &str = "none";

/// Tipos de registro que podem ser alvo de uma referência polimórfica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Customer,
    Lead,
    Deal,
    Task,
    Communication,
    Workflow,
}

impl EntityKind {
    /// Tabela onde o registro referenciado mora.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Customer => "customers",
            EntityKind::Lead => "leads",
            EntityKind::Deal => "deals",
            EntityKind::Task => "tasks",
            EntityKind::Communication => "communications",
            EntityKind::Workflow => "workflows",
        }
    }
}

/// Registro que carrega o par `entity_type` + `entity_id`.
/// Cada um aceita um conjunto fechado de alvos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TargetOwner {
    Task,
    Communication,
    Document,
}

impl TargetOwner {
    pub fn allowed_kinds(&self) -> &'static [EntityKind] {
        match self {
            TargetOwner::Task | TargetOwner::Communication => {
                &[EntityKind::Customer, EntityKind::Lead, EntityKind::Deal]
            }
            TargetOwner::Document => &[
                EntityKind::Customer,
                EntityKind::Lead,
                EntityKind::Deal,
                EntityKind::Task,
                EntityKind::Communication,
                EntityKind::Workflow,
            ],
        }
    }
}

/// Referência polimórfica já validada.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolymorphicRef {
    /// `entity_type = none`: o id é ignorado.
    Detached,
    Entity { kind: EntityKind, id: i64 },
}

impl PolymorphicRef {
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            PolymorphicRef::Detached => None,
            PolymorphicRef::Entity { kind, .. } => Some(*kind),
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            PolymorphicRef::Detached => None,
            PolymorphicRef::Entity { id, .. } => Some(*id),
        }
    }
}

/// Forma de fio de uma referência (`entity_type` / `entity_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EntityRefView {
    #[schema(example = "customer")]
    pub entity_type: String,
    #[schema(example = 42)]
    pub entity_id: Option<i64>,
}

impl From<PolymorphicRef> for EntityRefView {
    fn from(r: PolymorphicRef) -> Self {
        match r {
            PolymorphicRef::Detached => EntityRefView {
                entity_type: NO_ENTITY.to_string(),
                entity_id: None,
            },
            PolymorphicRef::Entity { kind, id } => EntityRefView {
                entity_type: crate::validation::ClosedSet::as_str(&kind).to_string(),
                entity_id: Some(id),
            },
        }
    }
}

/// Pedido de checagem de alvo (`POST /api/targets/validate`).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TargetInput {
    /// Tipo do registro que carrega a referência
    pub owner: TargetOwner,
    #[schema(example = "deal")]
    pub entity_type: Option<String>,
    #[schema(example = 7)]
    pub entity_id: Option<i64>,
}
