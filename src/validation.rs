// src/validation.rs
//
// Regras de validação do núcleo: tipos de campo, referências polimórficas
// e payloads cujo formato depende de um discriminador.

pub mod field_types;
pub mod payload;
pub mod polymorphic;

use crate::common::error::AppError;

/// Enumeração fechada que chega como texto na borda.
pub trait ClosedSet: Sized + Copy + 'static {
    /// Nome do campo de entrada (usado no erro).
    const FIELD: &'static str;

    fn variants() -> &'static [Self];

    fn as_str(&self) -> &'static str;

    fn parse(raw: &str) -> Result<Self, AppError> {
        Self::variants()
            .iter()
            .copied()
            .find(|v| v.as_str() == raw)
            .ok_or_else(|| AppError::UnknownDiscriminator {
                field: Self::FIELD,
                value: raw.to_string(),
            })
    }
}
