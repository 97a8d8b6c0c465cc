// tests/app.rs

use crm_core::{
    config::{AppState, StorageBackend},
    db::MemoryStore,
    models::entity::{EntityKind, TargetOwner},
};
use serde_json::json;

#[tokio::test]
async fn router_builds_over_memory_store() {
    // Conflito de rotas no axum vira panic na montagem
    let _router = crm_core::app(AppState::in_memory());
}

#[tokio::test]
async fn services_share_one_store() {
    let store = MemoryStore::new();
    store.register_entity(EntityKind::Customer, 42).await;
    let state = AppState::with_store(store);

    let target = state
        .target_service
        .resolve(TargetOwner::Task, Some("customer"), Some(42))
        .await
        .unwrap();
    assert_eq!(target.id(), Some(42));

    let budget = state
        .custom_field_service
        .create_definition(crm_core::models::custom_field::CreateCustomFieldInput {
            name: "Budget".into(),
            field_type: "number".into(),
            required: false,
            options: None,
            active: true,
        })
        .await
        .unwrap();
    state
        .custom_field_service
        .upsert_value(42, budget.id, &json!(1500))
        .await
        .unwrap();
    assert_eq!(state.custom_field_service.get_all(42).await.unwrap().values.len(), 1);
}

#[test]
fn storage_backend_parses() {
    assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
    assert_eq!(" Postgres ".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
    assert!("sqlite".parse::<StorageBackend>().is_err());
}
