// src/models/workflow.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Mapa livre de chave/valor (trigger_data, action_data, condition).
pub type Payload = Map<String, Value>;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "workflow_entity_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEntityType {
    Customer,
    Lead,
    Deal,
    Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "workflow_trigger_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    OnCreate,
    OnUpdate,
    OnStatusChange,
    Scheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "workflow_action_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    UpdateField,
    CreateTask,
    SendEmail,
    AssignUser,
    ChangeStatus,
    CreateNotification,
    Webhook,
}

// --- REGISTROS ---

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WorkflowAction {
    pub id: i64,
    pub workflow_id: i64,
    #[schema(example = 1)]
    pub sequence: i32,
    pub action_type: ActionType,
    #[schema(value_type = Object)]
    pub action_data: Payload,
    #[schema(value_type = Option<Object>)]
    pub condition: Option<Payload>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Workflow {
    pub id: i64,
    #[schema(example = "Follow up won deals")]
    pub name: String,
    pub description: Option<String>,
    pub entity_type: WorkflowEntityType,
    pub is_active: bool,
    pub trigger_type: TriggerType,
    #[schema(value_type = Object)]
    pub trigger_data: Payload,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    // Sempre ordenadas por (sequence, id)
    pub actions: Vec<WorkflowAction>,
}

// Linhas cruas do Postgres (JSONB chega embrulhado em `Json`)

#[derive(Debug, Clone, FromRow)]
pub struct WorkflowRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub entity_type: WorkflowEntityType,
    pub is_active: bool,
    pub trigger_type: TriggerType,
    pub trigger_data: Json<Payload>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRow {
    pub fn with_actions(self, actions: Vec<WorkflowAction>) -> Workflow {
        Workflow {
            id: self.id,
            name: self.name,
            description: self.description,
            entity_type: self.entity_type,
            is_active: self.is_active,
            trigger_type: self.trigger_type,
            trigger_data: self.trigger_data.0,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
            actions,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct WorkflowActionRow {
    pub id: i64,
    pub workflow_id: i64,
    pub sequence: i32,
    pub action_type: ActionType,
    pub action_data: Json<Payload>,
    pub condition: Option<Json<Payload>>,
    pub created_at: DateTime<Utc>,
}

impl From<WorkflowActionRow> for WorkflowAction {
    fn from(row: WorkflowActionRow) -> Self {
        WorkflowAction {
            id: row.id,
            workflow_id: row.workflow_id,
            sequence: row.sequence,
            action_type: row.action_type,
            action_data: row.action_data.0,
            condition: row.condition.map(|c| c.0),
            created_at: row.created_at,
        }
    }
}

// --- DADOS VALIDADOS (entrada do repositório) ---

#[derive(Debug, Clone)]
pub struct NewWorkflow {
    pub name: String,
    pub description: Option<String>,
    pub entity_type: WorkflowEntityType,
    pub is_active: bool,
    pub trigger_type: TriggerType,
    pub trigger_data: Payload,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewWorkflowAction {
    pub sequence: i32,
    pub action_type: ActionType,
    pub action_data: Payload,
    pub condition: Option<Payload>,
}

/// Alterações parciais; `None` mantém o valor atual.
#[derive(Debug, Clone, Default)]
pub struct WorkflowChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub entity_type: Option<WorkflowEntityType>,
    pub is_active: Option<bool>,
    pub trigger_type: Option<TriggerType>,
    pub trigger_data: Option<Payload>,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowFilter {
    pub entity_type: Option<WorkflowEntityType>,
    pub is_active: Option<bool>,
    pub trigger_type: Option<TriggerType>,
    pub search: Option<String>,
}

// --- PAYLOADS DE ENTRADA ---
// Os discriminadores chegam como texto e são checados contra o enum no serviço.

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct WorkflowActionInput {
    #[validate(range(min = 1, message = "A sequência deve ser no mínimo 1."))]
    #[schema(example = 1)]
    pub sequence: i32,

    #[schema(example = "create_task")]
    pub action_type: String,

    #[schema(value_type = Object)]
    pub action_data: Payload,

    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub condition: Option<Payload>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateWorkflowInput {
    #[validate(length(min = 3, max = 100, message = "O nome deve ter entre 3 e 100 caracteres."))]
    pub name: String,

    pub description: Option<String>,

    #[schema(example = "deal")]
    pub entity_type: String,

    #[serde(default = "default_active")]
    pub is_active: bool,

    #[schema(example = "on_status_change")]
    pub trigger_type: String,

    #[serde(default)]
    #[schema(value_type = Object)]
    pub trigger_data: Payload,

    #[serde(default)]
    pub actions: Vec<WorkflowActionInput>,

    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateWorkflowInput {
    #[validate(length(min = 3, max = 100, message = "O nome deve ter entre 3 e 100 caracteres."))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub entity_type: Option<String>,
    pub is_active: Option<bool>,
    pub trigger_type: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub trigger_data: Option<Payload>,
    // Quando presente, substitui a lista inteira de ações
    pub actions: Option<Vec<WorkflowActionInput>>,
}

/// Filtros de listagem (`GET /api/workflows`). Tudo opcional.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WorkflowListQuery {
    /// customer, lead, deal ou task
    pub entity_type: Option<String>,
    pub is_active: Option<bool>,
    /// on_create, on_update, on_status_change ou scheduled
    pub trigger_type: Option<String>,
    /// Busca no nome e na descrição, sem diferenciar maiúsculas
    pub search: Option<String>,
}
