// src/lib.rs

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod services;
pub mod validation;

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc};

/// Monta o router completo com o estado já aplicado.
pub fn app(app_state: AppState) -> Router {
    let field_routes = Router::new()
        .route(
            "/",
            post(handlers::custom_fields::create_field).get(handlers::custom_fields::list_fields),
        )
        .route(
            "/{id}",
            get(handlers::custom_fields::get_field)
                .put(handlers::custom_fields::update_field)
                .delete(handlers::custom_fields::delete_field),
        )
        .route(
            "/values/{owner_id}",
            get(handlers::custom_fields::get_owner_values)
                .put(handlers::custom_fields::upsert_owner_values)
                .delete(handlers::custom_fields::delete_owner_values),
        )
        .route(
            "/values/{owner_id}/{field_id}",
            get(handlers::custom_fields::get_value)
                .put(handlers::custom_fields::upsert_value)
                .delete(handlers::custom_fields::delete_value),
        )
        .route(
            "/required/{owner_id}",
            get(handlers::custom_fields::check_required),
        );

    let workflow_routes = Router::new()
        .route(
            "/",
            post(handlers::workflows::create_workflow).get(handlers::workflows::list_workflows),
        )
        .route(
            "/{id}",
            get(handlers::workflows::get_workflow)
                .put(handlers::workflows::update_workflow)
                .delete(handlers::workflows::delete_workflow),
        )
        .route("/{id}/toggle", post(handlers::workflows::toggle_workflow));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/custom-fields", field_routes)
        .nest("/api/workflows", workflow_routes)
        .route("/api/targets/validate", post(handlers::targets::validate_target))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
