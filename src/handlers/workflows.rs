// src/handlers/workflows.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::workflow::{CreateWorkflowInput, UpdateWorkflowInput, Workflow, WorkflowListQuery},
};

// POST /api/workflows
#[utoipa::path(
    post,
    path = "/api/workflows",
    tag = "Workflows",
    request_body = CreateWorkflowInput,
    responses(
        (status = 201, description = "Workflow criado com suas ações", body = Workflow),
        (status = 400, description = "Dados inválidos ou payload incompleto"),
        (status = 422, description = "Tipo de gatilho, ação ou entidade desconhecido")
    )
)]
pub async fn create_workflow(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateWorkflowInput>,
) -> Result<impl IntoResponse, AppError> {
    let workflow = app_state.workflow_service.create_workflow(payload).await?;
    Ok((StatusCode::CREATED, Json(workflow)))
}

// GET /api/workflows
#[utoipa::path(
    get,
    path = "/api/workflows",
    tag = "Workflows",
    params(WorkflowListQuery),
    responses(
        (status = 200, description = "Workflows (ativos primeiro, depois por nome)", body = Vec<Workflow>),
        (status = 422, description = "Filtro com valor desconhecido")
    )
)]
pub async fn list_workflows(
    State(app_state): State<AppState>,
    Query(query): Query<WorkflowListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let workflows = app_state.workflow_service.list_workflows(query).await?;
    Ok((StatusCode::OK, Json(workflows)))
}

// GET /api/workflows/{id}
#[utoipa::path(
    get,
    path = "/api/workflows/{id}",
    tag = "Workflows",
    params(("id" = i64, Path, description = "ID do workflow")),
    responses(
        (status = 200, description = "Workflow", body = Workflow),
        (status = 404, description = "Workflow não encontrado")
    )
)]
pub async fn get_workflow(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let workflow = app_state.workflow_service.get_workflow(id).await?;
    Ok((StatusCode::OK, Json(workflow)))
}

// PUT /api/workflows/{id}
#[utoipa::path(
    put,
    path = "/api/workflows/{id}",
    tag = "Workflows",
    params(("id" = i64, Path, description = "ID do workflow")),
    request_body = UpdateWorkflowInput,
    responses(
        (status = 200, description = "Workflow atualizado", body = Workflow),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Workflow não encontrado")
    )
)]
pub async fn update_workflow(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateWorkflowInput>,
) -> Result<impl IntoResponse, AppError> {
    let workflow = app_state.workflow_service.update_workflow(id, payload).await?;
    Ok((StatusCode::OK, Json(workflow)))
}

// DELETE /api/workflows/{id}
#[utoipa::path(
    delete,
    path = "/api/workflows/{id}",
    tag = "Workflows",
    params(("id" = i64, Path, description = "ID do workflow")),
    responses(
        (status = 204, description = "Workflow e ações removidos"),
        (status = 404, description = "Workflow não encontrado")
    )
)]
pub async fn delete_workflow(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.workflow_service.delete_workflow(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/workflows/{id}/toggle
#[utoipa::path(
    post,
    path = "/api/workflows/{id}/toggle",
    tag = "Workflows",
    params(("id" = i64, Path, description = "ID do workflow")),
    responses(
        (status = 200, description = "Workflow com is_active invertido", body = Workflow),
        (status = 404, description = "Workflow não encontrado")
    )
)]
pub async fn toggle_workflow(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let workflow = app_state.workflow_service.toggle_workflow(id).await?;
    Ok((StatusCode::OK, Json(workflow)))
}
