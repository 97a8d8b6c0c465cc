// src/services/workflow_service.rs

use std::sync::Arc;

use validator::Validate;

use crate::{
    common::error::AppError,
    db::WorkflowRepository,
    models::workflow::{
        ActionType, CreateWorkflowInput, NewWorkflow, NewWorkflowAction, TriggerType,
        UpdateWorkflowInput, Workflow, WorkflowActionInput, WorkflowChanges, WorkflowEntityType,
        WorkflowFilter, WorkflowListQuery,
    },
    validation::{
        payload::{ActionPayload, TriggerPayload},
        ClosedSet,
    },
};

#[derive(Clone)]
pub struct WorkflowService {
    repo: Arc<dyn WorkflowRepository>,
}

impl WorkflowService {
    pub fn new(repo: Arc<dyn WorkflowRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_workflow(&self, mut input: CreateWorkflowInput) -> Result<Workflow, AppError> {
        // O limite de tamanho vale para o nome já aparado
        input.name = input.name.trim().to_string();
        input.validate()?;

        let entity_type = WorkflowEntityType::parse(&input.entity_type)?;
        let trigger = TriggerPayload::from_data(
            TriggerType::parse(&input.trigger_type)?,
            &input.trigger_data,
        )?;
        let actions = build_actions(&input.actions)?;
        tracing::debug!("Gatilho {:?} com {} ações", trigger, actions.len());

        let workflow = self
            .repo
            .insert_workflow(
                &NewWorkflow {
                    name: input.name,
                    description: input.description,
                    entity_type,
                    is_active: input.is_active,
                    trigger_type: trigger.trigger_type(),
                    trigger_data: input.trigger_data,
                    created_by: input.created_by,
                },
                &actions,
            )
            .await?;

        tracing::info!(
            "Workflow criado: id={} name={} actions={}",
            workflow.id,
            workflow.name,
            workflow.actions.len()
        );
        Ok(workflow)
    }

    pub async fn get_workflow(&self, id: i64) -> Result<Workflow, AppError> {
        self.repo
            .get_workflow(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("workflow {} não encontrado", id)))
    }

    pub async fn list_workflows(&self, query: WorkflowListQuery) -> Result<Vec<Workflow>, AppError> {
        let filter = WorkflowFilter {
            entity_type: query
                .entity_type
                .as_deref()
                .map(WorkflowEntityType::parse)
                .transpose()?,
            is_active: query.is_active,
            trigger_type: query.trigger_type.as_deref().map(TriggerType::parse).transpose()?,
            search: query
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        };

        let workflows = self.repo.list_workflows(&filter).await?;
        tracing::debug!("Listando {} workflows", workflows.len());
        Ok(workflows)
    }

    /// Atualização parcial. Quando `actions` vem, a lista inteira é trocada.
    pub async fn update_workflow(
        &self,
        id: i64,
        mut input: UpdateWorkflowInput,
    ) -> Result<Workflow, AppError> {
        input.name = input.name.map(|n| n.trim().to_string());
        input.validate()?;
        let current = self.get_workflow(id).await?;

        let entity_type = input
            .entity_type
            .as_deref()
            .map(WorkflowEntityType::parse)
            .transpose()?;
        let requested = input.trigger_type.as_deref().map(TriggerType::parse).transpose()?;

        // Trocar só o tipo também revalida o trigger_data já gravado
        let trigger_type = if requested.is_some() || input.trigger_data.is_some() {
            let effective = requested.unwrap_or(current.trigger_type);
            let data = input.trigger_data.as_ref().unwrap_or(&current.trigger_data);
            let trigger = TriggerPayload::from_data(effective, data)?;
            requested.map(|_| trigger.trigger_type())
        } else {
            None
        };

        let actions = input.actions.as_deref().map(build_actions).transpose()?;

        let changes = WorkflowChanges {
            name: input.name,
            description: input.description,
            entity_type,
            is_active: input.is_active,
            trigger_type,
            trigger_data: input.trigger_data,
        };

        let workflow = self
            .repo
            .update_workflow(id, &changes, actions.as_deref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("workflow {} não encontrado", id)))?;

        tracing::info!(
            "Workflow atualizado: id={} (ações substituídas: {})",
            workflow.id,
            actions.is_some()
        );
        Ok(workflow)
    }

    pub async fn delete_workflow(&self, id: i64) -> Result<(), AppError> {
        if !self.repo.delete_workflow(id).await? {
            return Err(AppError::NotFound(format!("workflow {} não encontrado", id)));
        }
        tracing::info!("Workflow {} removido", id);
        Ok(())
    }

    /// Inverte `is_active`, sem nenhuma outra checagem.
    pub async fn toggle_workflow(&self, id: i64) -> Result<Workflow, AppError> {
        let workflow = self
            .repo
            .toggle_workflow(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("workflow {} não encontrado", id)))?;

        tracing::info!("Workflow {} agora is_active={}", workflow.id, workflow.is_active);
        Ok(workflow)
    }
}

fn build_actions(inputs: &[WorkflowActionInput]) -> Result<Vec<NewWorkflowAction>, AppError> {
    inputs
        .iter()
        .map(|input| -> Result<NewWorkflowAction, AppError> {
            input.validate()?;
            let payload =
                ActionPayload::from_data(ActionType::parse(&input.action_type)?, &input.action_data)?;

            Ok(NewWorkflowAction {
                sequence: input.sequence,
                action_type: payload.action_type(),
                action_data: input.action_data.clone(),
                condition: input.condition.clone(),
            })
        })
        .collect()
}
