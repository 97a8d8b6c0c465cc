// src/db/custom_field_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::{map_foreign_key_violation, map_unique_violation, AppError},
    models::custom_field::{
        CustomFieldDefinition, CustomFieldValue, CustomFieldValueRow, FieldType, FieldValue,
        NewCustomFieldDefinition, RemovalOutcome,
    },
    validation::{field_types::parse_canonical, ClosedSet},
};

/// Persistência de definições de campo e dos valores (tabela EAV).
#[async_trait]
pub trait CustomFieldRepository: Send + Sync {
    // =========================================================================
    //  DEFINIÇÕES DE CAMPOS (O Molde)
    // =========================================================================

    /// Falha com `Conflict` se o nome já existir.
    async fn insert_definition(
        &self,
        new: &NewCustomFieldDefinition,
    ) -> Result<CustomFieldDefinition, AppError>;

    async fn get_definition(&self, id: i64) -> Result<Option<CustomFieldDefinition>, AppError>;

    async fn find_definition_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CustomFieldDefinition>, AppError>;

    /// Grava todos os campos editáveis da definição. `None` se o id sumiu.
    /// Troca de tipo com valores já gravados falha com `Conflict`; a checagem
    /// e a escrita acontecem na mesma transação.
    async fn update_definition(
        &self,
        definition: &CustomFieldDefinition,
    ) -> Result<Option<CustomFieldDefinition>, AppError>;

    /// Ordem de inserção.
    async fn list_definitions(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<CustomFieldDefinition>, AppError>;

    /// Desativa se houver valores apontando para o campo, senão apaga.
    /// Checagem e escrita acontecem na mesma transação. `None` se o id não existe.
    async fn deactivate_or_delete(&self, id: i64) -> Result<Option<RemovalOutcome>, AppError>;

    // =========================================================================
    //  VALORES (O Dado)
    // =========================================================================

    /// Upsert por (owner_id, field_id), tudo ou nada.
    /// Cada valor é conferido contra a definição atual: campo inexistente vira
    /// `UnknownField`, inativo vira erro de validação e tipo divergente vira `Conflict`.
    async fn upsert_values(
        &self,
        owner_id: i64,
        values: &[(i64, FieldValue)],
    ) -> Result<Vec<CustomFieldValue>, AppError>;

    async fn get_value(
        &self,
        owner_id: i64,
        field_id: i64,
    ) -> Result<Option<CustomFieldValue>, AppError>;

    async fn list_values(&self, owner_id: i64) -> Result<Vec<CustomFieldValue>, AppError>;

    async fn delete_value(&self, owner_id: i64, field_id: i64) -> Result<bool, AppError>;

    /// Remove todas as linhas de um dono. Retorna quantas foram apagadas.
    async fn delete_owner_values(&self, owner_id: i64) -> Result<u64, AppError>;
}

impl TryFrom<CustomFieldValueRow> for CustomFieldValue {
    type Error = AppError;

    fn try_from(row: CustomFieldValueRow) -> Result<Self, Self::Error> {
        let value = parse_canonical(row.value_type, &row.value).ok_or_else(|| {
            AppError::InternalServerError(anyhow::anyhow!(
                "linha {} de custom_field_values guarda '{}', que não é um {:?} válido",
                row.id,
                row.value,
                row.value_type
            ))
        })?;

        Ok(CustomFieldValue {
            id: row.id,
            owner_id: row.owner_id,
            field_id: row.field_id,
            value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) fn name_taken(name: &str) -> String {
    format!("já existe um campo chamado '{}'", name)
}

pub(crate) fn type_locked(field_id: i64) -> AppError {
    AppError::Conflict(format!(
        "o campo {} já possui valores gravados; o tipo não pode mudar",
        field_id
    ))
}

/// Confere um valor contra o estado atual da definição (tipo e se está ativa).
pub(crate) fn check_writable(
    field_id: i64,
    current: Option<(FieldType, bool)>,
    value: &FieldValue,
) -> Result<(), AppError> {
    let (field_type, active) = current.ok_or(AppError::UnknownField(field_id))?;
    if !active {
        return Err(AppError::field(
            "field_id",
            "inactive_field",
            format!("o campo {} está inativo", field_id),
        ));
    }
    if field_type != value.field_type() {
        return Err(AppError::Conflict(format!(
            "o campo {} agora é do tipo {}; o valor enviado é {}",
            field_id,
            field_type.as_str(),
            value.field_type().as_str()
        )));
    }
    Ok(())
}

const DEFINITION_COLUMNS: &str =
    "id, name, field_type, required, options, active, created_at, updated_at";

const VALUE_COLUMNS: &str = "id, owner_id, field_id, value_type, value, created_at, updated_at";

#[derive(Clone)]
pub struct PgCustomFieldRepository {
    pool: PgPool,
}

impl PgCustomFieldRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomFieldRepository for PgCustomFieldRepository {
    async fn insert_definition(
        &self,
        new: &NewCustomFieldDefinition,
    ) -> Result<CustomFieldDefinition, AppError> {
        let sql = format!(
            "INSERT INTO custom_fields (name, field_type, required, options, active)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {DEFINITION_COLUMNS}"
        );

        sqlx::query_as::<_, CustomFieldDefinition>(&sql)
            .bind(&new.name)
            .bind(new.field_type)
            .bind(new.required)
            .bind(&new.options)
            .bind(new.active)
            .fetch_one(&self.pool)
            .await
            // Tratamento de erro de nome duplicado
            .map_err(|e| map_unique_violation(e, || name_taken(&new.name)))
    }

    async fn get_definition(&self, id: i64) -> Result<Option<CustomFieldDefinition>, AppError> {
        let sql = format!("SELECT {DEFINITION_COLUMNS} FROM custom_fields WHERE id = $1");
        let definition = sqlx::query_as::<_, CustomFieldDefinition>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(definition)
    }

    async fn find_definition_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CustomFieldDefinition>, AppError> {
        let sql = format!("SELECT {DEFINITION_COLUMNS} FROM custom_fields WHERE name = $1");
        let definition = sqlx::query_as::<_, CustomFieldDefinition>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(definition)
    }

    async fn update_definition(
        &self,
        definition: &CustomFieldDefinition,
    ) -> Result<Option<CustomFieldDefinition>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Trava a linha: nenhum valor novo entra enquanto o tipo é decidido
        let current: Option<FieldType> =
            sqlx::query_scalar("SELECT field_type FROM custom_fields WHERE id = $1 FOR UPDATE")
                .bind(definition.id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(current) = current else {
            return Ok(None);
        };

        if current != definition.field_type {
            let referenced: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM custom_field_values WHERE field_id = $1)",
            )
            .bind(definition.id)
            .fetch_one(&mut *tx)
            .await?;
            if referenced {
                return Err(type_locked(definition.id));
            }
        }

        let sql = format!(
            "UPDATE custom_fields
             SET name = $2, field_type = $3, required = $4, options = $5, active = $6,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {DEFINITION_COLUMNS}"
        );

        let updated = sqlx::query_as::<_, CustomFieldDefinition>(&sql)
            .bind(definition.id)
            .bind(&definition.name)
            .bind(definition.field_type)
            .bind(definition.required)
            .bind(&definition.options)
            .bind(definition.active)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, || name_taken(&definition.name)))?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn list_definitions(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<CustomFieldDefinition>, AppError> {
        let sql = format!(
            "SELECT {DEFINITION_COLUMNS} FROM custom_fields
             WHERE active OR $1
             ORDER BY id ASC"
        );
        let fields = sqlx::query_as::<_, CustomFieldDefinition>(&sql)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;
        Ok(fields)
    }

    async fn deactivate_or_delete(&self, id: i64) -> Result<Option<RemovalOutcome>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Trava a linha para que ninguém grave valores no meio da decisão
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM custom_fields WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM custom_field_values WHERE field_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let outcome = if referenced {
            sqlx::query("UPDATE custom_fields SET active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            RemovalOutcome::Deactivated
        } else {
            sqlx::query("DELETE FROM custom_fields WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            RemovalOutcome::Deleted
        };

        tx.commit().await?;
        Ok(Some(outcome))
    }

    async fn upsert_values(
        &self,
        owner_id: i64,
        values: &[(i64, FieldValue)],
    ) -> Result<Vec<CustomFieldValue>, AppError> {
        let sql = format!(
            "INSERT INTO custom_field_values (owner_id, field_id, value_type, value)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (owner_id, field_id)
             DO UPDATE SET
                 value_type = EXCLUDED.value_type,
                 value = EXCLUDED.value,
                 updated_at = NOW()
             RETURNING {VALUE_COLUMNS}"
        );

        // Se qualquer linha falhar, o drop da transação faz o rollback
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(values.len());

        for (field_id, value) in values {
            // FOR SHARE segura uma troca de tipo concorrente até o commit
            let current: Option<(FieldType, bool)> = sqlx::query_as(
                "SELECT field_type, active FROM custom_fields WHERE id = $1 FOR SHARE",
            )
            .bind(field_id)
            .fetch_optional(&mut *tx)
            .await?;
            check_writable(*field_id, current, value)?;

            let row = sqlx::query_as::<_, CustomFieldValueRow>(&sql)
                .bind(owner_id)
                .bind(field_id)
                .bind(value.field_type())
                .bind(value.canonical())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    map_foreign_key_violation(e, || {
                        format!("dono {} ou campo {} não existe", owner_id, field_id)
                    })
                })?;
            stored.push(CustomFieldValue::try_from(row)?);
        }

        tx.commit().await?;
        Ok(stored)
    }

    async fn get_value(
        &self,
        owner_id: i64,
        field_id: i64,
    ) -> Result<Option<CustomFieldValue>, AppError> {
        let sql = format!(
            "SELECT {VALUE_COLUMNS} FROM custom_field_values WHERE owner_id = $1 AND field_id = $2"
        );
        sqlx::query_as::<_, CustomFieldValueRow>(&sql)
            .bind(owner_id)
            .bind(field_id)
            .fetch_optional(&self.pool)
            .await?
            .map(CustomFieldValue::try_from)
            .transpose()
    }

    async fn list_values(&self, owner_id: i64) -> Result<Vec<CustomFieldValue>, AppError> {
        let sql = format!(
            "SELECT {VALUE_COLUMNS} FROM custom_field_values WHERE owner_id = $1 ORDER BY field_id"
        );
        let rows = sqlx::query_as::<_, CustomFieldValueRow>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(CustomFieldValue::try_from).collect()
    }

    async fn delete_value(&self, owner_id: i64, field_id: i64) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM custom_field_values WHERE owner_id = $1 AND field_id = $2")
                .bind(owner_id)
                .bind(field_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_owner_values(&self, owner_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM custom_field_values WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
