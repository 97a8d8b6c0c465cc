// src/validation/polymorphic.rs

use crate::{
    common::error::AppError,
    models::entity::{EntityKind, PolymorphicRef, NO_ENTITY},
    validation::ClosedSet,
};

/// Mensagem estável: os clientes tratam este texto.
pub const ENTITY_ID_REQUIRED: &str = "entity id is required when an entity type is provided";

impl ClosedSet for EntityKind {
    const FIELD: &'static str = "entity_type";

    fn variants() -> &'static [Self] {
        &[
            EntityKind::Customer,
            EntityKind::Lead,
            EntityKind::Deal,
            EntityKind::Task,
            EntityKind::Communication,
            EntityKind::Workflow,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Customer => "customer",
            EntityKind::Lead => "lead",
            EntityKind::Deal => "deal",
            EntityKind::Task => "task",
            EntityKind::Communication => "communication",
            EntityKind::Workflow => "workflow",
        }
    }
}

/// Valida o par `entity_type` / `entity_id`.
///
/// Sem tipo (ou `none`) o id é ignorado. Com tipo, ele precisa estar em
/// `allowed` e o id precisa existir e ser positivo. Não há chave estrangeira
/// para proteger o par, então esta checagem roda antes de qualquer escrita.
pub fn validate_ref(
    kind: Option<&str>,
    id: Option<i64>,
    allowed: &[EntityKind],
) -> Result<PolymorphicRef, AppError> {
    let kind = match kind {
        None => return Ok(PolymorphicRef::Detached),
        Some(k) if k == NO_ENTITY => return Ok(PolymorphicRef::Detached),
        Some(k) => k,
    };

    let parsed = EntityKind::parse(kind)
        .ok()
        .filter(|k| allowed.contains(k))
        .ok_or_else(|| {
            let expected: Vec<&str> = allowed.iter().map(|k| k.as_str()).collect();
            AppError::field(
                "entity_type",
                "invalid_entity_type",
                format!(
                    "o tipo de entidade '{}' não é permitido aqui (esperado um de: {}, {})",
                    kind,
                    expected.join(", "),
                    NO_ENTITY
                ),
            )
        })?;

    match id {
        Some(id) if id > 0 => Ok(PolymorphicRef::Entity { kind: parsed, id }),
        _ => Err(AppError::field("entity_id", "required", ENTITY_ID_REQUIRED)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entity::TargetOwner;

    fn task_kinds() -> &'static [EntityKind] {
        TargetOwner::Task.allowed_kinds()
    }

    fn message_for(err: AppError, field: &str) -> String {
        match err {
            AppError::ValidationError(errors) => errors.field_errors()[field][0]
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_default(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn none_ignores_the_id() {
        for id in [None, Some(-5), Some(0), Some(12)] {
            assert_eq!(
                validate_ref(Some("none"), id, task_kinds()).unwrap(),
                PolymorphicRef::Detached
            );
            assert_eq!(validate_ref(None, id, task_kinds()).unwrap(), PolymorphicRef::Detached);
        }
    }

    #[test]
    fn a_kind_requires_a_positive_id() {
        for id in [None, Some(0), Some(-1)] {
            let err = validate_ref(Some("customer"), id, task_kinds()).unwrap_err();
            assert_eq!(message_for(err, "entity_id"), ENTITY_ID_REQUIRED);
        }
        assert_eq!(
            validate_ref(Some("deal"), Some(9), task_kinds()).unwrap(),
            PolymorphicRef::Entity { kind: EntityKind::Deal, id: 9 }
        );
    }

    #[test]
    fn kind_must_belong_to_the_owner_set() {
        // Tarefas não podem apontar para workflows
        let err = validate_ref(Some("workflow"), Some(1), task_kinds()).unwrap_err();
        assert!(message_for(err, "entity_type").contains("não é permitido"));

        let doc = validate_ref(Some("workflow"), Some(1), TargetOwner::Document.allowed_kinds());
        assert!(doc.is_ok());

        assert!(validate_ref(Some("planet"), Some(1), TargetOwner::Document.allowed_kinds()).is_err());
    }
}
