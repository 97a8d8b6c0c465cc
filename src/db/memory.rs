// src/db/memory.rs
//
// Armazenamento em memória com as mesmas garantias das tabelas do Postgres
// (nome único, um valor por par dono/campo, cascade das ações).
// Usado com STORAGE_BACKEND=memory e pela suíte de testes.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    common::error::AppError,
    db::{
        custom_field_repo::{check_writable, name_taken, type_locked},
        CustomFieldRepository, EntityLookup, WorkflowRepository,
    },
    models::{
        custom_field::{
            CustomFieldDefinition, CustomFieldValue, FieldValue, NewCustomFieldDefinition,
            RemovalOutcome,
        },
        entity::EntityKind,
        workflow::{
            NewWorkflow, NewWorkflowAction, Workflow, WorkflowAction, WorkflowChanges,
            WorkflowFilter,
        },
    },
};

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    definitions: BTreeMap<i64, CustomFieldDefinition>,
    // Chave (owner_id, field_id): a unicidade do par vem de graça
    values: BTreeMap<(i64, i64), CustomFieldValue>,
    workflows: BTreeMap<i64, Workflow>,
    entities: HashSet<(EntityKind, i64)>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.definitions
            .values()
            .any(|d| d.name == name && Some(d.id) != except)
    }

    fn build_actions(&mut self, workflow_id: i64, actions: &[NewWorkflowAction]) -> Vec<WorkflowAction> {
        let now = Utc::now();
        let mut built: Vec<WorkflowAction> = actions
            .iter()
            .map(|a| WorkflowAction {
                id: self.next_id(),
                workflow_id,
                sequence: a.sequence,
                action_type: a.action_type,
                action_data: a.action_data.clone(),
                condition: a.condition.clone(),
                created_at: now,
            })
            .collect();
        built.sort_by_key(|a| (a.sequence, a.id));
        built
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra um cliente/lead/negócio/etc. para as checagens de referência.
    pub async fn register_entity(&self, kind: EntityKind, id: i64) {
        self.state.lock().await.entities.insert((kind, id));
    }

    pub async fn forget_entity(&self, kind: EntityKind, id: i64) {
        self.state.lock().await.entities.remove(&(kind, id));
    }
}

#[async_trait]
impl CustomFieldRepository for MemoryStore {
    async fn insert_definition(
        &self,
        new: &NewCustomFieldDefinition,
    ) -> Result<CustomFieldDefinition, AppError> {
        let mut state = self.state.lock().await;
        if state.name_taken(&new.name, None) {
            return Err(AppError::Conflict(name_taken(&new.name)));
        }

        let now = Utc::now();
        let definition = CustomFieldDefinition {
            id: state.next_id(),
            name: new.name.clone(),
            field_type: new.field_type,
            required: new.required,
            options: new.options.clone(),
            active: new.active,
            created_at: now,
            updated_at: now,
        };
        state.definitions.insert(definition.id, definition.clone());
        Ok(definition)
    }

    async fn get_definition(&self, id: i64) -> Result<Option<CustomFieldDefinition>, AppError> {
        Ok(self.state.lock().await.definitions.get(&id).cloned())
    }

    async fn find_definition_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CustomFieldDefinition>, AppError> {
        let state = self.state.lock().await;
        Ok(state.definitions.values().find(|d| d.name == name).cloned())
    }

    async fn update_definition(
        &self,
        definition: &CustomFieldDefinition,
    ) -> Result<Option<CustomFieldDefinition>, AppError> {
        let mut state = self.state.lock().await;
        let Some(current) = state.definitions.get(&definition.id) else {
            return Ok(None);
        };
        if current.field_type != definition.field_type
            && state.values.values().any(|v| v.field_id == definition.id)
        {
            return Err(type_locked(definition.id));
        }
        if state.name_taken(&definition.name, Some(definition.id)) {
            return Err(AppError::Conflict(name_taken(&definition.name)));
        }

        let mut updated = definition.clone();
        updated.updated_at = Utc::now();
        state.definitions.insert(updated.id, updated.clone());
        Ok(Some(updated))
    }

    async fn list_definitions(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<CustomFieldDefinition>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .definitions
            .values()
            .filter(|d| include_inactive || d.active)
            .cloned()
            .collect())
    }

    async fn deactivate_or_delete(&self, id: i64) -> Result<Option<RemovalOutcome>, AppError> {
        let mut state = self.state.lock().await;
        if !state.definitions.contains_key(&id) {
            return Ok(None);
        }

        let referenced = state.values.values().any(|v| v.field_id == id);
        if referenced {
            if let Some(def) = state.definitions.get_mut(&id) {
                def.active = false;
                def.updated_at = Utc::now();
            }
            Ok(Some(RemovalOutcome::Deactivated))
        } else {
            state.definitions.remove(&id);
            Ok(Some(RemovalOutcome::Deleted))
        }
    }

    async fn upsert_values(
        &self,
        owner_id: i64,
        values: &[(i64, FieldValue)],
    ) -> Result<Vec<CustomFieldValue>, AppError> {
        let mut state = self.state.lock().await;

        // Equivalente à chave estrangeira: checa tudo antes de escrever
        for (field_id, value) in values {
            let current = state
                .definitions
                .get(field_id)
                .map(|d| (d.field_type, d.active));
            check_writable(*field_id, current, value)?;
        }

        let now = Utc::now();
        let mut stored = Vec::with_capacity(values.len());
        for (field_id, value) in values {
            let key = (owner_id, *field_id);
            let existing = state.values.get(&key).cloned();
            let row = match existing {
                Some(existing) => CustomFieldValue {
                    value: value.clone(),
                    updated_at: now,
                    ..existing
                },
                None => CustomFieldValue {
                    id: state.next_id(),
                    owner_id,
                    field_id: *field_id,
                    value: value.clone(),
                    created_at: now,
                    updated_at: now,
                },
            };
            state.values.insert(key, row.clone());
            stored.push(row);
        }
        Ok(stored)
    }

    async fn get_value(
        &self,
        owner_id: i64,
        field_id: i64,
    ) -> Result<Option<CustomFieldValue>, AppError> {
        Ok(self.state.lock().await.values.get(&(owner_id, field_id)).cloned())
    }

    async fn list_values(&self, owner_id: i64) -> Result<Vec<CustomFieldValue>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .values
            .range((owner_id, i64::MIN)..=(owner_id, i64::MAX))
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn delete_value(&self, owner_id: i64, field_id: i64) -> Result<bool, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .values
            .remove(&(owner_id, field_id))
            .is_some())
    }

    async fn delete_owner_values(&self, owner_id: i64) -> Result<u64, AppError> {
        let mut state = self.state.lock().await;
        let before = state.values.len();
        state.values.retain(|(owner, _), _| *owner != owner_id);
        Ok((before - state.values.len()) as u64)
    }
}

#[async_trait]
impl WorkflowRepository for MemoryStore {
    async fn insert_workflow(
        &self,
        new: &NewWorkflow,
        actions: &[NewWorkflowAction],
    ) -> Result<Workflow, AppError> {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let now = Utc::now();
        let actions = state.build_actions(id, actions);

        let workflow = Workflow {
            id,
            name: new.name.clone(),
            description: new.description.clone(),
            entity_type: new.entity_type,
            is_active: new.is_active,
            trigger_type: new.trigger_type,
            trigger_data: new.trigger_data.clone(),
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
            actions,
        };
        state.workflows.insert(id, workflow.clone());
        Ok(workflow)
    }

    async fn get_workflow(&self, id: i64) -> Result<Option<Workflow>, AppError> {
        Ok(self.state.lock().await.workflows.get(&id).cloned())
    }

    async fn list_workflows(&self, filter: &WorkflowFilter) -> Result<Vec<Workflow>, AppError> {
        let state = self.state.lock().await;
        let search = filter.search.as_ref().map(|s| s.to_lowercase());

        let mut found: Vec<Workflow> = state
            .workflows
            .values()
            .filter(|w| filter.entity_type.is_none_or(|t| w.entity_type == t))
            .filter(|w| filter.is_active.is_none_or(|a| w.is_active == a))
            .filter(|w| filter.trigger_type.is_none_or(|t| w.trigger_type == t))
            .filter(|w| match &search {
                None => true,
                Some(term) => {
                    w.name.to_lowercase().contains(term)
                        || w
                            .description
                            .as_ref()
                            .is_some_and(|d| d.to_lowercase().contains(term))
                }
            })
            .cloned()
            .collect();

        found.sort_by(|a, b| {
            b.is_active
                .cmp(&a.is_active)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(found)
    }

    async fn update_workflow(
        &self,
        id: i64,
        changes: &WorkflowChanges,
        actions: Option<&[NewWorkflowAction]>,
    ) -> Result<Option<Workflow>, AppError> {
        let mut state = self.state.lock().await;
        let Some(mut workflow) = state.workflows.get(&id).cloned() else {
            return Ok(None);
        };

        if let Some(name) = &changes.name {
            workflow.name = name.clone();
        }
        if let Some(description) = &changes.description {
            workflow.description = Some(description.clone());
        }
        if let Some(entity_type) = changes.entity_type {
            workflow.entity_type = entity_type;
        }
        if let Some(is_active) = changes.is_active {
            workflow.is_active = is_active;
        }
        if let Some(trigger_type) = changes.trigger_type {
            workflow.trigger_type = trigger_type;
        }
        if let Some(trigger_data) = &changes.trigger_data {
            workflow.trigger_data = trigger_data.clone();
        }
        if let Some(actions) = actions {
            workflow.actions = state.build_actions(id, actions);
        }
        workflow.updated_at = Utc::now();

        state.workflows.insert(id, workflow.clone());
        Ok(Some(workflow))
    }

    async fn delete_workflow(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.state.lock().await.workflows.remove(&id).is_some())
    }

    async fn toggle_workflow(&self, id: i64) -> Result<Option<Workflow>, AppError> {
        let mut state = self.state.lock().await;
        Ok(state.workflows.get_mut(&id).map(|w| {
            w.is_active = !w.is_active;
            w.updated_at = Utc::now();
            w.clone()
        }))
    }
}

#[async_trait]
impl EntityLookup for MemoryStore {
    async fn exists(&self, kind: EntityKind, id: i64) -> Result<bool, AppError> {
        Ok(self.state.lock().await.entities.contains(&(kind, id)))
    }
}
