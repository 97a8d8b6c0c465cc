// src/handlers/custom_fields.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{
    common::error::AppError,
    config::AppState,
    models::custom_field::{
        BulkValuesInput, CreateCustomFieldInput, CustomFieldDefinition, CustomFieldValue,
        ListFieldsQuery, OwnerFieldValues, UpdateCustomFieldInput, ValueInput,
    },
};

// =============================================================================
//  ÁREA 1: DEFINIÇÕES DE CAMPO
// =============================================================================

// POST /api/custom-fields
#[utoipa::path(
    post,
    path = "/api/custom-fields",
    tag = "Custom Fields",
    request_body = CreateCustomFieldInput,
    responses(
        (status = 201, description = "Campo personalizado criado", body = CustomFieldDefinition),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Já existe um campo com esse nome"),
        (status = 422, description = "Tipo de campo desconhecido")
    )
)]
pub async fn create_field(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateCustomFieldInput>,
) -> Result<impl IntoResponse, AppError> {
    let field = app_state
        .custom_field_service
        .create_definition(payload)
        .await?;

    Ok((StatusCode::CREATED, Json(field)))
}

// GET /api/custom-fields
#[utoipa::path(
    get,
    path = "/api/custom-fields",
    tag = "Custom Fields",
    params(ListFieldsQuery),
    responses(
        (status = 200, description = "Lista de campos personalizados", body = Vec<CustomFieldDefinition>)
    )
)]
pub async fn list_fields(
    State(app_state): State<AppState>,
    Query(query): Query<ListFieldsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let fields = app_state
        .custom_field_service
        .list_definitions(query.show_all)
        .await?;

    Ok((StatusCode::OK, Json(fields)))
}

// GET /api/custom-fields/{id}
#[utoipa::path(
    get,
    path = "/api/custom-fields/{id}",
    tag = "Custom Fields",
    params(("id" = i64, Path, description = "ID do campo")),
    responses(
        (status = 200, description = "Campo personalizado", body = CustomFieldDefinition),
        (status = 404, description = "Campo não encontrado")
    )
)]
pub async fn get_field(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let field = app_state.custom_field_service.get_definition(id).await?;
    Ok((StatusCode::OK, Json(field)))
}

// PUT /api/custom-fields/{id}
#[utoipa::path(
    put,
    path = "/api/custom-fields/{id}",
    tag = "Custom Fields",
    params(("id" = i64, Path, description = "ID do campo")),
    request_body = UpdateCustomFieldInput,
    responses(
        (status = 200, description = "Campo atualizado", body = CustomFieldDefinition),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Campo não encontrado"),
        (status = 409, description = "Nome duplicado ou troca de tipo com valores gravados")
    )
)]
pub async fn update_field(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCustomFieldInput>,
) -> Result<impl IntoResponse, AppError> {
    let field = app_state
        .custom_field_service
        .update_definition(id, payload)
        .await?;

    Ok((StatusCode::OK, Json(field)))
}

// DELETE /api/custom-fields/{id}
#[utoipa::path(
    delete,
    path = "/api/custom-fields/{id}",
    tag = "Custom Fields",
    params(("id" = i64, Path, description = "ID do campo")),
    responses(
        (status = 200, description = "Campo desativado (com valores) ou removido"),
        (status = 404, description = "Campo não encontrado")
    )
)]
pub async fn delete_field(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = app_state.custom_field_service.remove_definition(id).await?;
    Ok((StatusCode::OK, Json(json!({ "id": id, "outcome": outcome }))))
}

// =============================================================================
//  ÁREA 2: VALORES
// =============================================================================

// GET /api/custom-fields/values/{owner_id}
#[utoipa::path(
    get,
    path = "/api/custom-fields/values/{owner_id}",
    tag = "Custom Field Values",
    params(("owner_id" = i64, Path, description = "ID do cliente dono dos valores")),
    responses(
        (status = 200, description = "Valores indexados pelo nome do campo", body = OwnerFieldValues)
    )
)]
pub async fn get_owner_values(
    State(app_state): State<AppState>,
    Path(owner_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let values = app_state.custom_field_service.get_all(owner_id).await?;
    Ok((StatusCode::OK, Json(values)))
}

// PUT /api/custom-fields/values/{owner_id}
#[utoipa::path(
    put,
    path = "/api/custom-fields/values/{owner_id}",
    tag = "Custom Field Values",
    params(("owner_id" = i64, Path, description = "ID do cliente dono dos valores")),
    request_body = BulkValuesInput,
    responses(
        (status = 200, description = "Valores gravados", body = Vec<CustomFieldValue>),
        (status = 400, description = "Algum valor é inválido; nada foi gravado"),
        (status = 422, description = "Campo desconhecido")
    )
)]
pub async fn upsert_owner_values(
    State(app_state): State<AppState>,
    Path(owner_id): Path<i64>,
    Json(payload): Json<BulkValuesInput>,
) -> Result<impl IntoResponse, AppError> {
    let stored = app_state
        .custom_field_service
        .upsert_values(owner_id, &payload.values)
        .await?;

    Ok((StatusCode::OK, Json(stored)))
}

// DELETE /api/custom-fields/values/{owner_id}
#[utoipa::path(
    delete,
    path = "/api/custom-fields/values/{owner_id}",
    tag = "Custom Field Values",
    params(("owner_id" = i64, Path, description = "ID do cliente dono dos valores")),
    responses(
        (status = 200, description = "Quantidade de valores removidos")
    )
)]
pub async fn delete_owner_values(
    State(app_state): State<AppState>,
    Path(owner_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let removed = app_state
        .custom_field_service
        .delete_owner_values(owner_id)
        .await?;

    Ok((StatusCode::OK, Json(json!({ "owner_id": owner_id, "removed": removed }))))
}

// GET /api/custom-fields/values/{owner_id}/{field_id}
#[utoipa::path(
    get,
    path = "/api/custom-fields/values/{owner_id}/{field_id}",
    tag = "Custom Field Values",
    params(
        ("owner_id" = i64, Path, description = "ID do cliente dono do valor"),
        ("field_id" = i64, Path, description = "ID do campo")
    ),
    responses(
        (status = 200, description = "Valor", body = CustomFieldValue),
        (status = 404, description = "Sem valor para esse par")
    )
)]
pub async fn get_value(
    State(app_state): State<AppState>,
    Path((owner_id, field_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let value = app_state
        .custom_field_service
        .get_one(owner_id, field_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "nenhum valor do campo {} para o dono {}",
                field_id, owner_id
            ))
        })?;

    Ok((StatusCode::OK, Json(value)))
}

// PUT /api/custom-fields/values/{owner_id}/{field_id}
#[utoipa::path(
    put,
    path = "/api/custom-fields/values/{owner_id}/{field_id}",
    tag = "Custom Field Values",
    params(
        ("owner_id" = i64, Path, description = "ID do cliente dono do valor"),
        ("field_id" = i64, Path, description = "ID do campo")
    ),
    request_body = ValueInput,
    responses(
        (status = 200, description = "Valor gravado", body = CustomFieldValue),
        (status = 400, description = "Valor incompatível com o tipo do campo"),
        (status = 422, description = "Campo desconhecido")
    )
)]
pub async fn upsert_value(
    State(app_state): State<AppState>,
    Path((owner_id, field_id)): Path<(i64, i64)>,
    Json(payload): Json<ValueInput>,
) -> Result<impl IntoResponse, AppError> {
    let stored = app_state
        .custom_field_service
        .upsert_value(owner_id, field_id, &payload.value)
        .await?;

    Ok((StatusCode::OK, Json(stored)))
}

// DELETE /api/custom-fields/values/{owner_id}/{field_id}
#[utoipa::path(
    delete,
    path = "/api/custom-fields/values/{owner_id}/{field_id}",
    tag = "Custom Field Values",
    params(
        ("owner_id" = i64, Path, description = "ID do cliente dono do valor"),
        ("field_id" = i64, Path, description = "ID do campo")
    ),
    responses(
        (status = 204, description = "Valor removido"),
        (status = 404, description = "Sem valor para esse par")
    )
)]
pub async fn delete_value(
    State(app_state): State<AppState>,
    Path((owner_id, field_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .custom_field_service
        .delete_value(owner_id, field_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/custom-fields/required/{owner_id}
#[utoipa::path(
    get,
    path = "/api/custom-fields/required/{owner_id}",
    tag = "Custom Field Values",
    params(("owner_id" = i64, Path, description = "ID do cliente")),
    responses(
        (status = 204, description = "Todos os campos obrigatórios têm valor"),
        (status = 400, description = "Lista dos campos obrigatórios sem valor")
    )
)]
pub async fn check_required(
    State(app_state): State<AppState>,
    Path(owner_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .custom_field_service
        .missing_required(owner_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
