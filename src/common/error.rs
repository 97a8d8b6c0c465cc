use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Não encontrado: {0}")]
    NotFound(String),

    // Chave única duplicada (nome de campo) ou mudança proibida em registro em uso
    #[error("Conflito: {0}")]
    Conflict(String),

    #[error("Campo personalizado desconhecido: {0}")]
    UnknownField(i64),

    #[error("Valor desconhecido '{value}' para '{field}'")]
    UnknownDiscriminator { field: &'static str, value: String },

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Atalho para erros de validação de um único campo.
    /// O `code` segue o padrão dos validadores (ex: "required", "invalid_number").
    pub fn field(field: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        let mut errors = validator::ValidationErrors::new();
        let message: String = message.into();
        let mut err = validator::ValidationError::new(code);
        err.message = Some(message.into());
        errors.add(field, err);
        AppError::ValidationError(errors)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::NotFound(ref what) => (StatusCode::NOT_FOUND, what.clone()),
            AppError::Conflict(ref reason) => (StatusCode::CONFLICT, reason.clone()),
            ref e @ (AppError::UnknownField(_) | AppError::UnknownDiscriminator { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }

            // DatabaseError e InternalServerError viram 500.
            // O `tracing` loga a mensagem detalhada; o cliente recebe uma genérica.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

/// Converte violação de chave única do Postgres em `Conflict`.
pub(crate) fn map_unique_violation(e: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::Conflict(message());
        }
    }
    e.into()
}

/// Converte violação de chave estrangeira (dono ou campo inexistente) em `NotFound`.
pub(crate) fn map_foreign_key_violation(e: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_foreign_key_violation() {
            return AppError::NotFound(message());
        }
    }
    e.into()
}
