// src/services/custom_field_service.rs

use std::{collections::BTreeMap, sync::Arc};

use anyhow::anyhow;
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    common::error::AppError,
    db::{custom_field_repo::name_taken, CustomFieldRepository},
    models::custom_field::{
        CreateCustomFieldInput, CustomFieldDefinition, CustomFieldValue, FieldType, FieldValue,
        NewCustomFieldDefinition, OwnerFieldValues, RemovalOutcome, UpdateCustomFieldInput,
    },
    validation::{
        field_types::{coerce_value, normalize_options, requires_options},
        ClosedSet,
    },
};

#[derive(Clone)]
pub struct CustomFieldService {
    repo: Arc<dyn CustomFieldRepository>,
}

impl CustomFieldService {
    pub fn new(repo: Arc<dyn CustomFieldRepository>) -> Self {
        Self { repo }
    }

    // =========================================================================
    //  DEFINIÇÕES DE CAMPOS (O Molde)
    // =========================================================================

    pub async fn create_definition(
        &self,
        mut input: CreateCustomFieldInput,
    ) -> Result<CustomFieldDefinition, AppError> {
        // O limite de tamanho vale para o nome já aparado
        input.name = input.name.trim().to_string();
        input.validate()?;

        let name = input.name;
        let field_type = FieldType::parse(&input.field_type)?;
        let options = options_for(field_type, input.options.as_deref().unwrap_or_default())?;

        if self.repo.find_definition_by_name(&name).await?.is_some() {
            return Err(AppError::Conflict(name_taken(&name)));
        }

        let definition = self
            .repo
            .insert_definition(&NewCustomFieldDefinition {
                name,
                field_type,
                required: input.required,
                options,
                active: input.active,
            })
            .await?;

        tracing::info!(
            "Campo personalizado criado: id={} name={} type={}",
            definition.id,
            definition.name,
            definition.field_type.as_str()
        );
        Ok(definition)
    }

    pub async fn get_definition(&self, id: i64) -> Result<CustomFieldDefinition, AppError> {
        self.repo
            .get_definition(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("campo personalizado {} não encontrado", id)))
    }

    pub async fn list_definitions(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<CustomFieldDefinition>, AppError> {
        let definitions = self.repo.list_definitions(include_inactive).await?;
        tracing::debug!(
            "Listando {} campos (include_inactive={})",
            definitions.len(),
            include_inactive
        );
        Ok(definitions)
    }

    pub async fn update_definition(
        &self,
        id: i64,
        mut input: UpdateCustomFieldInput,
    ) -> Result<CustomFieldDefinition, AppError> {
        input.name = input.name.map(|n| n.trim().to_string());
        input.validate()?;
        let mut definition = self.get_definition(id).await?;

        if let Some(name) = input.name {
            if name != definition.name {
                if let Some(other) = self.repo.find_definition_by_name(&name).await? {
                    if other.id != id {
                        return Err(AppError::Conflict(name_taken(&name)));
                    }
                }
                definition.name = name;
            }
        }

        // Com valores já gravados, o repositório recusa a troca de tipo
        if let Some(raw) = input.field_type.as_deref() {
            definition.field_type = FieldType::parse(raw)?;
        }

        if let Some(required) = input.required {
            definition.required = required;
        }
        if let Some(active) = input.active {
            definition.active = active;
        }

        let options = input.options.unwrap_or_else(|| definition.options.clone());
        definition.options = options_for(definition.field_type, &options)?;

        let updated = self
            .repo
            .update_definition(&definition)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("campo personalizado {} não encontrado", id)))?;

        tracing::info!("Campo personalizado atualizado: id={}", updated.id);
        Ok(updated)
    }

    /// Campo com histórico fica inativo; sem histórico, é apagado.
    pub async fn remove_definition(&self, id: i64) -> Result<RemovalOutcome, AppError> {
        let outcome = self
            .repo
            .deactivate_or_delete(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("campo personalizado {} não encontrado", id)))?;

        match outcome {
            RemovalOutcome::Deactivated => {
                tracing::info!("Campo {} desativado (possui valores)", id)
            }
            RemovalOutcome::Deleted => tracing::info!("Campo {} removido", id),
        }
        Ok(outcome)
    }

    // =========================================================================
    //  VALORES (O Dado)
    // =========================================================================

    pub async fn upsert_value(
        &self,
        owner_id: i64,
        field_id: i64,
        raw: &Value,
    ) -> Result<CustomFieldValue, AppError> {
        check_owner(owner_id)?;
        let definition = self.writable_definition(field_id).await?;
        let value = coerce_value(&definition, raw)?;

        self.repo
            .upsert_values(owner_id, &[(field_id, value)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::InternalServerError(anyhow!("upsert não retornou nenhuma linha")))
    }

    /// Grava vários valores de uma vez. Tudo é validado antes de qualquer escrita.
    pub async fn upsert_values(
        &self,
        owner_id: i64,
        raw_values: &BTreeMap<i64, Value>,
    ) -> Result<Vec<CustomFieldValue>, AppError> {
        check_owner(owner_id)?;

        let mut batch = Vec::with_capacity(raw_values.len());
        for (field_id, raw) in raw_values {
            let definition = self.writable_definition(*field_id).await?;
            batch.push((*field_id, coerce_value(&definition, raw)?));
        }

        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let stored = self.repo.upsert_values(owner_id, &batch).await?;
        tracing::debug!("{} valores gravados para o dono {}", stored.len(), owner_id);
        Ok(stored)
    }

    /// Leitura best-effort: valores cujo campo sumiu são ignorados.
    pub async fn get_all(&self, owner_id: i64) -> Result<OwnerFieldValues, AppError> {
        let definitions = self.repo.list_definitions(true).await?;
        let values = self.repo.list_values(owner_id).await?;

        Ok(OwnerFieldValues {
            owner_id,
            values: join_values(&definitions, values),
        })
    }

    pub async fn get_one(
        &self,
        owner_id: i64,
        field_id: i64,
    ) -> Result<Option<CustomFieldValue>, AppError> {
        self.repo.get_value(owner_id, field_id).await
    }

    pub async fn delete_value(&self, owner_id: i64, field_id: i64) -> Result<(), AppError> {
        if !self.repo.delete_value(owner_id, field_id).await? {
            return Err(AppError::NotFound(format!(
                "nenhum valor do campo {} para o dono {}",
                field_id, owner_id
            )));
        }
        Ok(())
    }

    /// Chamado quando o registro dono é apagado.
    pub async fn delete_owner_values(&self, owner_id: i64) -> Result<u64, AppError> {
        let removed = self.repo.delete_owner_values(owner_id).await?;
        tracing::info!("{} valores removidos do dono {}", removed, owner_id);
        Ok(removed)
    }

    /// Campos ativos e obrigatórios ainda sem valor para o dono.
    pub async fn missing_required(&self, owner_id: i64) -> Result<(), AppError> {
        let definitions = self.repo.list_definitions(false).await?;
        let values = self.repo.list_values(owner_id).await?;

        let mut errors = ValidationErrors::new();
        for definition in definitions.iter().filter(|d| d.required) {
            if values.iter().any(|v| v.field_id == definition.id) {
                continue;
            }
            let mut err = ValidationError::new("required");
            err.message = Some(format!("o campo '{}' é obrigatório", definition.name).into());
            err.add_param("field_id".into(), &definition.id);
            errors.add("values", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(errors))
        }
    }

    async fn writable_definition(&self, field_id: i64) -> Result<CustomFieldDefinition, AppError> {
        let definition = self
            .repo
            .get_definition(field_id)
            .await?
            .ok_or(AppError::UnknownField(field_id))?;

        if !definition.active {
            return Err(AppError::field(
                "field_id",
                "inactive_field",
                format!("o campo '{}' está inativo", definition.name),
            ));
        }
        Ok(definition)
    }
}

fn check_owner(owner_id: i64) -> Result<(), AppError> {
    if owner_id <= 0 {
        return Err(AppError::field("owner_id", "range", "o id do dono deve ser positivo"));
    }
    Ok(())
}

// Select exige opções; os outros tipos descartam o que vier.
fn options_for(field_type: FieldType, options: &[String]) -> Result<Vec<String>, AppError> {
    if requires_options(field_type) {
        normalize_options(options)
    } else {
        Ok(Vec::new())
    }
}

/// Indexa os valores pelo nome do campo, pulando linhas sem definição.
pub fn join_values(
    definitions: &[CustomFieldDefinition],
    values: Vec<CustomFieldValue>,
) -> BTreeMap<String, FieldValue> {
    let names: BTreeMap<i64, &str> = definitions
        .iter()
        .map(|d| (d.id, d.name.as_str()))
        .collect();

    let mut joined = BTreeMap::new();
    for value in values {
        match names.get(&value.field_id) {
            Some(name) => {
                joined.insert(name.to_string(), value.value);
            }
            None => tracing::warn!(
                "Valor {} aponta para o campo {} que não existe mais; ignorado",
                value.id,
                value.field_id
            ),
        }
    }
    joined
}
