// src/models/custom_field.rs

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Formato canônico de datas guardadas como texto.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// --- ENUMS ---

// Mapeia o CREATE TYPE custom_field_type do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "custom_field_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Select,
    Checkbox,
}

// --- DEFINIÇÕES (O Molde) ---

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct CustomFieldDefinition {
    #[schema(example = 7)]
    pub id: i64,

    #[schema(example = "Budget")]
    pub name: String,

    pub field_type: FieldType,

    // Apenas informativo: o armazenamento de valores não exige
    pub required: bool,

    // Só tem conteúdo quando field_type = select
    pub options: Vec<String>,

    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dados já validados para inserir uma definição.
#[derive(Debug, Clone)]
pub struct NewCustomFieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub options: Vec<String>,
    pub active: bool,
}

/// Resultado da remoção de uma definição.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RemovalOutcome {
    /// Havia valores apontando para o campo: fica inativo para preservar o histórico.
    Deactivated,
    Deleted,
}

// --- PAYLOADS DE ENTRADA ---

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCustomFieldInput {
    #[validate(length(min = 1, max = 100, message = "O nome deve ter entre 1 e 100 caracteres."))]
    #[schema(example = "Budget")]
    pub name: String,

    #[schema(example = "number")]
    pub field_type: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub options: Option<Vec<String>>,

    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomFieldInput {
    #[validate(length(min = 1, max = 100, message = "O nome deve ter entre 1 e 100 caracteres."))]
    pub name: Option<String>,
    pub field_type: Option<String>,
    pub required: Option<bool>,
    pub options: Option<Vec<String>>,
    pub active: Option<bool>,
}

// --- VALORES (O Dado) ---

/// Valor tipado de um campo personalizado.
/// No banco vai como texto canônico + a tag `value_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Number(Decimal),
    Date(NaiveDate),
    Select(String),
    Checkbox(bool),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Number(_) => FieldType::Number,
            FieldValue::Date(_) => FieldType::Date,
            FieldValue::Select(_) => FieldType::Select,
            FieldValue::Checkbox(_) => FieldType::Checkbox,
        }
    }

    /// Representação textual determinística (a que vai para a coluna `value`).
    pub fn canonical(&self) -> String {
        match self {
            FieldValue::Text(s) | FieldValue::Select(s) => s.clone(),
            FieldValue::Number(n) => n.normalize().to_string(),
            FieldValue::Date(d) => d.format(DATE_FORMAT).to_string(),
            FieldValue::Checkbox(b) => b.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

// JSON natural: número como número, checkbox como bool, o resto como string.
impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FieldValue::Text(s) | FieldValue::Select(s) => serializer.serialize_str(s),
            FieldValue::Number(n) => Serialize::serialize(&n.normalize(), serializer),
            FieldValue::Date(d) => serializer.serialize_str(&d.format(DATE_FORMAT).to_string()),
            FieldValue::Checkbox(b) => serializer.serialize_bool(*b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CustomFieldValue {
    pub id: i64,
    pub owner_id: i64,
    pub field_id: i64,
    #[schema(value_type = Object)]
    pub value: FieldValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Linha crua da tabela custom_field_values.
#[derive(Debug, Clone, FromRow)]
pub struct CustomFieldValueRow {
    pub id: i64,
    pub owner_id: i64,
    pub field_id: i64,
    pub value_type: FieldType,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Todos os valores de um dono, indexados pelo nome do campo.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OwnerFieldValues {
    pub owner_id: i64,
    #[schema(value_type = Object)]
    pub values: std::collections::BTreeMap<String, FieldValue>,
}

/// Corpo de `PUT /api/custom-fields/values/{owner_id}/{field_id}`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ValueInput {
    /// Valor bruto; é convertido conforme o tipo do campo
    #[schema(value_type = Object, example = "1500")]
    pub value: serde_json::Value,
}

/// Corpo de `PUT /api/custom-fields/values/{owner_id}`: `field_id -> valor bruto`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BulkValuesInput {
    #[schema(value_type = Object)]
    pub values: std::collections::BTreeMap<i64, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFieldsQuery {
    /// Inclui campos inativos
    #[serde(default)]
    pub show_all: bool,
}
