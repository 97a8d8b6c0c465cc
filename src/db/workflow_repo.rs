// src/db/workflow_repo.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{types::Json, PgConnection, PgPool, Postgres, QueryBuilder};

use crate::{
    common::error::AppError,
    models::workflow::{
        NewWorkflow, NewWorkflowAction, Workflow, WorkflowAction, WorkflowActionRow,
        WorkflowChanges, WorkflowFilter, WorkflowRow,
    },
};

#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Workflow e ações na mesma transação.
    async fn insert_workflow(
        &self,
        new: &NewWorkflow,
        actions: &[NewWorkflowAction],
    ) -> Result<Workflow, AppError>;

    async fn get_workflow(&self, id: i64) -> Result<Option<Workflow>, AppError>;

    /// Ativos primeiro, depois por nome.
    async fn list_workflows(&self, filter: &WorkflowFilter) -> Result<Vec<Workflow>, AppError>;

    /// Aplica as alterações e, se `actions` vier, apaga todas as ações
    /// atuais e insere as novas (substituição completa, ids novos).
    async fn update_workflow(
        &self,
        id: i64,
        changes: &WorkflowChanges,
        actions: Option<&[NewWorkflowAction]>,
    ) -> Result<Option<Workflow>, AppError>;

    /// As ações vão junto (cascade).
    async fn delete_workflow(&self, id: i64) -> Result<bool, AppError>;

    /// Inverte `is_active` sem nenhuma outra condição.
    async fn toggle_workflow(&self, id: i64) -> Result<Option<Workflow>, AppError>;
}

const WORKFLOW_COLUMNS: &str = "id, name, description, entity_type, is_active, trigger_type, \
     trigger_data, created_by, created_at, updated_at";

const ACTION_COLUMNS: &str =
    "id, workflow_id, sequence, action_type, action_data, condition, created_at";

#[derive(Clone)]
pub struct PgWorkflowRepository {
    pool: PgPool,
}

impl PgWorkflowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_actions(
        conn: &mut PgConnection,
        workflow_id: i64,
        actions: &[NewWorkflowAction],
    ) -> Result<(), AppError> {
        for action in actions {
            sqlx::query(
                "INSERT INTO workflow_actions (workflow_id, sequence, action_type, action_data, condition)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(workflow_id)
            .bind(action.sequence)
            .bind(action.action_type)
            .bind(Json(&action.action_data))
            .bind(action.condition.as_ref().map(Json))
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    async fn load_actions(
        conn: &mut PgConnection,
        workflow_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<WorkflowAction>>, AppError> {
        let sql = format!(
            "SELECT {ACTION_COLUMNS} FROM workflow_actions
             WHERE workflow_id = ANY($1)
             ORDER BY workflow_id, sequence, id"
        );
        let rows = sqlx::query_as::<_, WorkflowActionRow>(&sql)
            .bind(workflow_ids)
            .fetch_all(&mut *conn)
            .await?;

        let mut grouped: HashMap<i64, Vec<WorkflowAction>> = HashMap::new();
        for row in rows {
            grouped.entry(row.workflow_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    async fn attach_actions(
        conn: &mut PgConnection,
        rows: Vec<WorkflowRow>,
    ) -> Result<Vec<Workflow>, AppError> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut actions = Self::load_actions(conn, &ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let own = actions.remove(&row.id).unwrap_or_default();
                row.with_actions(own)
            })
            .collect())
    }

    async fn fetch_one(conn: &mut PgConnection, id: i64) -> Result<Option<Workflow>, AppError> {
        let sql = format!("SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = $1");
        let row = sqlx::query_as::<_, WorkflowRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Self::attach_actions(conn, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl WorkflowRepository for PgWorkflowRepository {
    async fn insert_workflow(
        &self,
        new: &NewWorkflow,
        actions: &[NewWorkflowAction],
    ) -> Result<Workflow, AppError> {
        let mut tx = self.pool.begin().await?;

        let workflow_id: i64 = sqlx::query_scalar(
            "INSERT INTO workflows (name, description, entity_type, is_active, trigger_type, trigger_data, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.entity_type)
        .bind(new.is_active)
        .bind(new.trigger_type)
        .bind(Json(&new.trigger_data))
        .bind(new.created_by)
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_actions(&mut tx, workflow_id, actions).await?;

        let workflow = Self::fetch_one(&mut tx, workflow_id).await?.ok_or_else(|| {
            AppError::InternalServerError(anyhow::anyhow!("workflow {workflow_id} sumiu logo após o insert"))
        })?;

        tx.commit().await?;
        Ok(workflow)
    }

    async fn get_workflow(&self, id: i64) -> Result<Option<Workflow>, AppError> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_one(&mut conn, id).await
    }

    async fn list_workflows(&self, filter: &WorkflowFilter) -> Result<Vec<Workflow>, AppError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE TRUE"));

        if let Some(entity_type) = filter.entity_type {
            qb.push(" AND entity_type = ").push_bind(entity_type);
        }
        if let Some(is_active) = filter.is_active {
            qb.push(" AND is_active = ").push_bind(is_active);
        }
        if let Some(trigger_type) = filter.trigger_type {
            qb.push(" AND trigger_type = ").push_bind(trigger_type);
        }
        if let Some(search) = filter.search.as_deref() {
            let term = format!("%{}%", search);
            qb.push(" AND (name ILIKE ")
                .push_bind(term.clone())
                .push(" OR description ILIKE ")
                .push_bind(term)
                .push(")");
        }
        qb.push(" ORDER BY is_active DESC, name ASC, id ASC");

        let mut conn = self.pool.acquire().await?;
        let rows: Vec<WorkflowRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
        Self::attach_actions(&mut conn, rows).await
    }

    async fn update_workflow(
        &self,
        id: i64,
        changes: &WorkflowChanges,
        actions: Option<&[NewWorkflowAction]>,
    ) -> Result<Option<Workflow>, AppError> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<i64> = sqlx::query_scalar(
            "UPDATE workflows SET
                 name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 entity_type = COALESCE($4, entity_type),
                 is_active = COALESCE($5, is_active),
                 trigger_type = COALESCE($6, trigger_type),
                 trigger_data = COALESCE($7, trigger_data),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING id",
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.entity_type)
        .bind(changes.is_active)
        .bind(changes.trigger_type)
        .bind(changes.trigger_data.as_ref().map(Json))
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Ok(None);
        }

        if let Some(actions) = actions {
            sqlx::query("DELETE FROM workflow_actions WHERE workflow_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::insert_actions(&mut tx, id, actions).await?;
        }

        let workflow = Self::fetch_one(&mut tx, id).await?;
        tx.commit().await?;
        Ok(workflow)
    }

    async fn delete_workflow(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_workflow(&self, id: i64) -> Result<Option<Workflow>, AppError> {
        let mut tx = self.pool.begin().await?;

        let toggled: Option<i64> = sqlx::query_scalar(
            "UPDATE workflows SET is_active = NOT is_active, updated_at = NOW()
             WHERE id = $1 RETURNING id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let workflow = match toggled {
            Some(_) => Self::fetch_one(&mut tx, id).await?,
            None => None,
        };
        tx.commit().await?;
        Ok(workflow)
    }
}
