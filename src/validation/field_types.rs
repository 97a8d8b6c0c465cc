// src/validation/field_types.rs

use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::{
    common::error::AppError,
    models::custom_field::{CustomFieldDefinition, FieldType, FieldValue, DATE_FORMAT},
    validation::ClosedSet,
};

const SUPPORTED: &[FieldType] = &[
    FieldType::Text,
    FieldType::Number,
    FieldType::Date,
    FieldType::Select,
    FieldType::Checkbox,
];

impl ClosedSet for FieldType {
    const FIELD: &'static str = "field_type";

    fn variants() -> &'static [Self] {
        SUPPORTED
    }

    fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
        }
    }
}

pub fn supported_types() -> &'static [FieldType] {
    SUPPORTED
}

/// Só `select` carrega lista de opções.
pub fn requires_options(field_type: FieldType) -> bool {
    matches!(field_type, FieldType::Select)
}

/// Normaliza a lista de opções de um select: apara espaços e exige
/// ao menos uma opção, sem vazias nem repetidas.
pub fn normalize_options(options: &[String]) -> Result<Vec<String>, AppError> {
    if options.is_empty() {
        return Err(AppError::field(
            "options",
            "required",
            "campos select precisam de ao menos uma opção",
        ));
    }

    let mut normalized: Vec<String> = Vec::with_capacity(options.len());
    for option in options {
        let option = option.trim();
        if option.is_empty() {
            return Err(AppError::field("options", "empty_option", "as opções não podem ser vazias"));
        }
        if normalized.iter().any(|o| o == option) {
            return Err(AppError::field(
                "options",
                "duplicate_option",
                format!("a opção '{}' está repetida", option),
            ));
        }
        normalized.push(option.to_string());
    }
    Ok(normalized)
}

/// Converte o valor bruto para o tipo do campo.
/// O erro sempre vem no campo `value`, com código por tipo.
pub fn coerce_value(definition: &CustomFieldDefinition, raw: &Value) -> Result<FieldValue, AppError> {
    let coerced = match definition.field_type {
        FieldType::Text => match raw {
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Number(n) => Some(FieldValue::Text(n.to_string())),
            Value::Bool(b) => Some(FieldValue::Text(b.to_string())),
            _ => None,
        },
        FieldType::Number => match raw {
            Value::Number(n) => parse_decimal(&n.to_string()),
            Value::String(s) => parse_decimal(s),
            _ => None,
        }
        .map(FieldValue::Number),
        FieldType::Date => match raw {
            Value::String(s) => parse_date(s),
            _ => None,
        }
        .map(FieldValue::Date),
        FieldType::Checkbox => match raw {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            Value::String(s) => parse_bool(s),
            _ => None,
        }
        .map(FieldValue::Checkbox),
        FieldType::Select => {
            let chosen = match raw {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            };
            chosen
                .filter(|c| definition.options.iter().any(|o| o == c))
                .map(FieldValue::Select)
        }
    };

    coerced.ok_or_else(|| {
        let code = match definition.field_type {
            FieldType::Text => "invalid_text",
            FieldType::Number => "invalid_number",
            FieldType::Date => "invalid_date_format", // Espera YYYY-MM-DD
            FieldType::Checkbox => "invalid_boolean",
            FieldType::Select => "invalid_option",
        };
        AppError::field(
            "value",
            code,
            format!(
                "o valor {} não é um {} válido para o campo '{}'",
                raw,
                definition.field_type.as_str(),
                definition.name
            ),
        )
    })
}

/// Reconstrói o valor a partir da forma canônica guardada no banco.
pub fn parse_canonical(field_type: FieldType, text: &str) -> Option<FieldValue> {
    match field_type {
        FieldType::Text => Some(FieldValue::Text(text.to_string())),
        FieldType::Select => Some(FieldValue::Select(text.to_string())),
        FieldType::Number => Decimal::from_str(text).ok().map(FieldValue::Number),
        FieldType::Date => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .ok()
            .map(FieldValue::Date),
        FieldType::Checkbox => match text {
            "true" => Some(FieldValue::Checkbox(true)),
            "false" => Some(FieldValue::Checkbox(false)),
            _ => None,
        },
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
        .map(|d| d.normalize())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
