// src/services/target_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::EntityLookup,
    models::entity::{PolymorphicRef, TargetOwner},
    validation::{polymorphic::validate_ref, ClosedSet},
};

/// Confere referências polimórficas contra os registros que existem de fato.
#[derive(Clone)]
pub struct TargetService {
    lookup: Arc<dyn EntityLookup>,
}

impl TargetService {
    pub fn new(lookup: Arc<dyn EntityLookup>) -> Self {
        Self { lookup }
    }

    pub async fn resolve(
        &self,
        owner: TargetOwner,
        entity_type: Option<&str>,
        entity_id: Option<i64>,
    ) -> Result<PolymorphicRef, AppError> {
        let target = validate_ref(entity_type, entity_id, owner.allowed_kinds())?;

        if let PolymorphicRef::Entity { kind, id } = target {
            if !self.lookup.exists(kind, id).await? {
                return Err(AppError::field(
                    "entity_id",
                    "not_found",
                    format!("{} {} não existe", kind.as_str(), id),
                ));
            }
        }

        tracing::debug!("Alvo resolvido para {:?}: {:?}", owner, target);
        Ok(target)
    }
}
