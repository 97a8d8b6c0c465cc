// src/handlers/targets.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    models::entity::{EntityRefView, TargetInput},
};

// POST /api/targets/validate
#[utoipa::path(
    post,
    path = "/api/targets/validate",
    tag = "Targets",
    request_body = TargetInput,
    responses(
        (status = 200, description = "Referência válida e existente", body = EntityRefView),
        (status = 400, description = "Tipo não permitido, id ausente ou registro inexistente")
    )
)]
pub async fn validate_target(
    State(app_state): State<AppState>,
    Json(payload): Json<TargetInput>,
) -> Result<impl IntoResponse, AppError> {
    let target = app_state
        .target_service
        .resolve(payload.owner, payload.entity_type.as_deref(), payload.entity_id)
        .await?;

    Ok((StatusCode::OK, Json(EntityRefView::from(target))))
}
