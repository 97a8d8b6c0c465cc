// tests/custom_fields.rs

use std::{collections::BTreeMap, sync::Arc};

use crm_core::{
    common::error::AppError,
    db::{CustomFieldRepository, MemoryStore},
    models::custom_field::{
        CreateCustomFieldInput, FieldType, FieldValue, NewCustomFieldDefinition, RemovalOutcome,
        UpdateCustomFieldInput,
    },
    services::CustomFieldService,
};
use rust_decimal::Decimal;
use serde_json::json;

fn service() -> CustomFieldService {
    CustomFieldService::new(Arc::new(MemoryStore::new()))
}

fn field(name: &str, field_type: &str) -> CreateCustomFieldInput {
    CreateCustomFieldInput {
        name: name.to_string(),
        field_type: field_type.to_string(),
        required: false,
        options: None,
        active: true,
    }
}

fn select(name: &str, options: &[&str]) -> CreateCustomFieldInput {
    CreateCustomFieldInput {
        options: Some(options.iter().map(|o| o.to_string()).collect()),
        ..field(name, "select")
    }
}

fn invalid_fields(err: AppError) -> Vec<String> {
    match err {
        AppError::ValidationError(errors) => {
            let mut keys: Vec<String> = errors.field_errors().keys().map(|k| k.to_string()).collect();
            keys.sort();
            keys
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn budget_scenario() {
    let svc = service();

    let budget = svc.create_definition(field("Budget", "number")).await.unwrap();
    assert_eq!(budget.field_type, FieldType::Number);
    assert!(budget.active);

    let err = svc.create_definition(field("Budget", "text")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    svc.upsert_value(42, budget.id, &json!("1500")).await.unwrap();

    let all = svc.get_all(42).await.unwrap();
    assert_eq!(all.owner_id, 42);
    assert_eq!(all.values.len(), 1);
    assert_eq!(all.values["Budget"], FieldValue::Number(Decimal::from(1500)));
}

#[tokio::test]
async fn upsert_keeps_a_single_row_per_owner_and_field() {
    let svc = service();
    let origin = svc.create_definition(field("Origem", "text")).await.unwrap();

    let first = svc.upsert_value(7, origin.id, &json!("site")).await.unwrap();
    let second = svc.upsert_value(7, origin.id, &json!("indicação")).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.value, FieldValue::Text("indicação".into()));

    let stored = svc.get_one(7, origin.id).await.unwrap().unwrap();
    assert_eq!(stored.value, FieldValue::Text("indicação".into()));
    assert_eq!(svc.get_all(7).await.unwrap().values.len(), 1);
}

#[tokio::test]
async fn values_are_coerced_to_the_field_type() {
    let svc = service();
    let since = svc.create_definition(field("Cliente desde", "date")).await.unwrap();
    let vip = svc.create_definition(field("VIP", "checkbox")).await.unwrap();
    let amount = svc.create_definition(field("Limite", "number")).await.unwrap();

    let date = svc.upsert_value(1, since.id, &json!("2024-03-05")).await.unwrap();
    assert_eq!(date.value.canonical(), "2024-03-05");

    let flag = svc.upsert_value(1, vip.id, &json!("yes")).await.unwrap();
    assert_eq!(flag.value, FieldValue::Checkbox(true));

    let number = svc.upsert_value(1, amount.id, &json!("1500.50")).await.unwrap();
    assert_eq!(number.value.canonical(), "1500.5");

    let err = svc.upsert_value(1, since.id, &json!("05/03/2024")).await.unwrap_err();
    assert_eq!(invalid_fields(err), vec!["value"]);

    let err = svc.upsert_value(1, amount.id, &json!("abc")).await.unwrap_err();
    assert_eq!(invalid_fields(err), vec!["value"]);
}

#[tokio::test]
async fn unknown_field_is_reported() {
    let svc = service();
    let err = svc.upsert_value(1, 999, &json!("x")).await.unwrap_err();
    assert!(matches!(err, AppError::UnknownField(999)), "got {err:?}");
}

#[tokio::test]
async fn unknown_field_type_is_rejected() {
    let svc = service();
    let err = svc.create_definition(field("Cor", "color")).await.unwrap_err();
    match err {
        AppError::UnknownDiscriminator { field, value } => {
            assert_eq!(field, "field_type");
            assert_eq!(value, "color");
        }
        other => panic!("expected unknown discriminator, got {other:?}"),
    }
}

#[tokio::test]
async fn name_length_is_checked() {
    let svc = service();

    let err = svc.create_definition(field("", "text")).await.unwrap_err();
    assert_eq!(invalid_fields(err), vec!["name"]);

    let err = svc.create_definition(field("   ", "text")).await.unwrap_err();
    assert_eq!(invalid_fields(err), vec!["name"]);

    let long = "x".repeat(101);
    let err = svc.create_definition(field(&long, "text")).await.unwrap_err();
    assert_eq!(invalid_fields(err), vec!["name"]);

    let trimmed = svc.create_definition(field("  Setor  ", "text")).await.unwrap();
    assert_eq!(trimmed.name, "Setor");
}

#[tokio::test]
async fn padding_does_not_count_towards_the_name_limit() {
    let svc = service();

    let padded = format!(" {}", "x".repeat(100));
    let def = svc.create_definition(field(&padded, "text")).await.unwrap();
    assert_eq!(def.name.len(), 100);

    let other = svc.create_definition(field("Outro", "text")).await.unwrap();
    let renamed = svc
        .update_definition(
            other.id,
            UpdateCustomFieldInput {
                name: Some(format!("{}   ", "y".repeat(100))),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "y".repeat(100));

    let err = svc
        .update_definition(
            other.id,
            UpdateCustomFieldInput {
                name: Some("    ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(invalid_fields(err), vec!["name"]);
}

#[tokio::test]
async fn select_needs_options_and_values_must_be_one_of_them() {
    let svc = service();

    let err = svc.create_definition(field("Porte", "select")).await.unwrap_err();
    assert_eq!(invalid_fields(err), vec!["options"]);

    let size = svc
        .create_definition(select("Porte", &["P", " M ", "G"]))
        .await
        .unwrap();
    assert_eq!(size.options, vec!["P", "M", "G"]);

    svc.upsert_value(3, size.id, &json!("M")).await.unwrap();

    let err = svc.upsert_value(3, size.id, &json!("XG")).await.unwrap_err();
    assert_eq!(invalid_fields(err), vec!["value"]);
}

#[tokio::test]
async fn options_are_discarded_for_other_types() {
    let svc = service();
    let input = CreateCustomFieldInput {
        options: Some(vec!["a".into(), "b".into()]),
        ..field("Observação", "text")
    };
    let def = svc.create_definition(input).await.unwrap();
    assert!(def.options.is_empty());
}

#[tokio::test]
async fn get_of_unknown_definition_is_not_found() {
    let svc = service();
    let err = svc.get_definition(123).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn unreferenced_definition_is_hard_deleted() {
    let svc = service();
    let def = svc.create_definition(field("Temporário", "text")).await.unwrap();

    let outcome = svc.remove_definition(def.id).await.unwrap();
    assert_eq!(outcome, RemovalOutcome::Deleted);

    let err = svc.get_definition(def.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn referenced_definition_is_only_deactivated() {
    let svc = service();
    let def = svc.create_definition(field("Segmento", "text")).await.unwrap();
    svc.upsert_value(10, def.id, &json!("varejo")).await.unwrap();

    let outcome = svc.remove_definition(def.id).await.unwrap();
    assert_eq!(outcome, RemovalOutcome::Deactivated);

    let kept = svc.get_definition(def.id).await.unwrap();
    assert!(!kept.active);

    assert!(svc.list_definitions(false).await.unwrap().is_empty());
    assert_eq!(svc.list_definitions(true).await.unwrap().len(), 1);

    // O histórico continua legível
    let all = svc.get_all(10).await.unwrap();
    assert_eq!(all.values["Segmento"], FieldValue::Text("varejo".into()));

    // Mas não aceita novos valores
    let err = svc.upsert_value(11, def.id, &json!("atacado")).await.unwrap_err();
    assert_eq!(invalid_fields(err), vec!["field_id"]);
}

#[tokio::test]
async fn removing_unknown_definition_is_not_found() {
    let svc = service();
    let err = svc.remove_definition(77).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn deleting_owner_values_leaves_definitions_alone() {
    let svc = service();
    let a = svc.create_definition(field("A", "text")).await.unwrap();
    let b = svc.create_definition(field("B", "number")).await.unwrap();

    svc.upsert_value(5, a.id, &json!("x")).await.unwrap();
    svc.upsert_value(5, b.id, &json!(2)).await.unwrap();
    svc.upsert_value(6, a.id, &json!("y")).await.unwrap();

    assert_eq!(svc.delete_owner_values(5).await.unwrap(), 2);

    assert!(svc.get_all(5).await.unwrap().values.is_empty());
    assert_eq!(svc.get_all(6).await.unwrap().values.len(), 1);
    assert_eq!(svc.list_definitions(false).await.unwrap().len(), 2);
}

#[tokio::test]
async fn single_value_delete() {
    let svc = service();
    let a = svc.create_definition(field("A", "text")).await.unwrap();
    svc.upsert_value(5, a.id, &json!("x")).await.unwrap();

    svc.delete_value(5, a.id).await.unwrap();
    assert!(svc.get_one(5, a.id).await.unwrap().is_none());

    let err = svc.delete_value(5, a.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn bulk_upsert_is_all_or_nothing() {
    let svc = service();
    let name = svc.create_definition(field("Apelido", "text")).await.unwrap();
    let score = svc.create_definition(field("Score", "number")).await.unwrap();

    let mut batch = BTreeMap::new();
    batch.insert(name.id, json!("Zé"));
    batch.insert(score.id, json!("muito"));

    let err = svc.upsert_values(9, &batch).await.unwrap_err();
    assert_eq!(invalid_fields(err), vec!["value"]);
    assert!(svc.get_all(9).await.unwrap().values.is_empty());

    batch.insert(score.id, json!(88));
    let stored = svc.upsert_values(9, &batch).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(svc.get_all(9).await.unwrap().values.len(), 2);
}

#[tokio::test]
async fn bulk_upsert_with_unknown_field_writes_nothing() {
    let svc = service();
    let name = svc.create_definition(field("Apelido", "text")).await.unwrap();

    let mut batch = BTreeMap::new();
    batch.insert(name.id, json!("Zé"));
    batch.insert(4242, json!("?"));

    let err = svc.upsert_values(9, &batch).await.unwrap_err();
    assert!(matches!(err, AppError::UnknownField(4242)), "got {err:?}");
    assert!(svc.get_one(9, name.id).await.unwrap().is_none());
}

#[tokio::test]
async fn rename_to_existing_name_conflicts() {
    let svc = service();
    svc.create_definition(field("Cidade", "text")).await.unwrap();
    let other = svc.create_definition(field("Estado", "text")).await.unwrap();

    let err = svc
        .update_definition(
            other.id,
            UpdateCustomFieldInput {
                name: Some("Cidade".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    // Renomear para o próprio nome não é conflito
    let same = svc
        .update_definition(
            other.id,
            UpdateCustomFieldInput {
                name: Some("Estado".into()),
                required: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(same.required);
}

#[tokio::test]
async fn type_change_is_blocked_once_values_exist() {
    let svc = service();
    let def = svc.create_definition(field("Código", "text")).await.unwrap();

    let changed = svc
        .update_definition(
            def.id,
            UpdateCustomFieldInput {
                field_type: Some("number".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(changed.field_type, FieldType::Number);

    svc.upsert_value(1, def.id, &json!(10)).await.unwrap();

    let err = svc
        .update_definition(
            def.id,
            UpdateCustomFieldInput {
                field_type: Some("text".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn switching_to_select_requires_options_and_away_clears_them() {
    let svc = service();
    let def = svc.create_definition(field("Canal", "text")).await.unwrap();

    let err = svc
        .update_definition(
            def.id,
            UpdateCustomFieldInput {
                field_type: Some("select".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(invalid_fields(err), vec!["options"]);

    let as_select = svc
        .update_definition(
            def.id,
            UpdateCustomFieldInput {
                field_type: Some("select".into()),
                options: Some(vec!["email".into(), "telefone".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(as_select.options, vec!["email", "telefone"]);

    let back = svc
        .update_definition(
            def.id,
            UpdateCustomFieldInput {
                field_type: Some("text".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(back.options.is_empty());
}

#[tokio::test]
async fn inactive_definitions_can_be_reactivated() {
    let svc = service();
    let input = CreateCustomFieldInput {
        active: false,
        ..field("Rascunho", "text")
    };
    let def = svc.create_definition(input).await.unwrap();
    assert!(!def.active);

    let err = svc.upsert_value(1, def.id, &json!("x")).await.unwrap_err();
    assert_eq!(invalid_fields(err), vec!["field_id"]);

    svc.update_definition(
        def.id,
        UpdateCustomFieldInput {
            active: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    svc.upsert_value(1, def.id, &json!("x")).await.unwrap();
}

#[tokio::test]
async fn missing_required_lists_active_required_fields_without_value() {
    let svc = service();
    let cpf = svc
        .create_definition(CreateCustomFieldInput {
            required: true,
            ..field("CPF", "text")
        })
        .await
        .unwrap();
    svc.create_definition(CreateCustomFieldInput {
        required: true,
        ..field("Telefone", "text")
    })
    .await
    .unwrap();
    svc.create_definition(field("Apelido", "text")).await.unwrap();

    let err = svc.missing_required(1).await.unwrap_err();
    match err {
        AppError::ValidationError(errors) => {
            let fields = errors.field_errors();
            assert_eq!(fields["values"].len(), 2);
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    svc.upsert_value(1, cpf.id, &json!("123")).await.unwrap();
    let err = svc.missing_required(1).await.unwrap_err();
    match err {
        AppError::ValidationError(errors) => {
            let fields = errors.field_errors();
            let messages: Vec<String> = fields["values"]
                .iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .collect();
            assert_eq!(messages, vec!["o campo 'Telefone' é obrigatório"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn owner_id_must_be_positive() {
    let svc = service();
    let def = svc.create_definition(field("A", "text")).await.unwrap();
    let err = svc.upsert_value(0, def.id, &json!("x")).await.unwrap_err();
    assert_eq!(invalid_fields(err), vec!["owner_id"]);
}

#[tokio::test]
async fn values_serialize_as_native_json() {
    let svc = service();
    let budget = svc.create_definition(field("Budget", "number")).await.unwrap();
    let vip = svc.create_definition(field("VIP", "checkbox")).await.unwrap();
    let since = svc.create_definition(field("Cliente desde", "date")).await.unwrap();
    let size = svc.create_definition(select("Porte", &["P", "M"])).await.unwrap();
    let origin = svc.create_definition(field("Origem", "text")).await.unwrap();

    let raw = BTreeMap::from([
        (budget.id, json!("1500.50")),
        (vip.id, json!(true)),
        (since.id, json!("2024-03-05")),
        (size.id, json!("M")),
        (origin.id, json!("site")),
    ]);
    let stored = svc.upsert_values(9, &raw).await.unwrap();

    let all = serde_json::to_value(svc.get_all(9).await.unwrap()).unwrap();
    assert_eq!(all["owner_id"], json!(9));
    let values = &all["values"];
    assert!(values["Budget"].is_number(), "got {}", values["Budget"]);
    assert_eq!(values["Budget"].as_f64(), Some(1500.5));
    assert_eq!(values["VIP"], json!(true));
    assert_eq!(values["Cliente desde"], json!("2024-03-05"));
    assert_eq!(values["Porte"], json!("M"));
    assert_eq!(values["Origem"], json!("site"));

    let single = stored.iter().find(|v| v.field_id == budget.id).unwrap();
    let single = serde_json::to_value(single).unwrap();
    assert_eq!(single["value"].as_f64(), Some(1500.5));
}

fn definition(name: &str, field_type: FieldType) -> NewCustomFieldDefinition {
    NewCustomFieldDefinition {
        name: name.to_string(),
        field_type,
        required: false,
        options: vec![],
        active: true,
    }
}

#[tokio::test]
async fn store_refuses_type_change_once_values_exist() {
    let store = MemoryStore::new();
    let mut def = store
        .insert_definition(&definition("Código", FieldType::Text))
        .await
        .unwrap();

    // Sem valores a troca passa
    def.field_type = FieldType::Number;
    let def = store.update_definition(&def).await.unwrap().unwrap();
    assert_eq!(def.field_type, FieldType::Number);

    store
        .upsert_values(1, &[(def.id, FieldValue::Number(Decimal::new(10, 0)))])
        .await
        .unwrap();

    let mut changed = def.clone();
    changed.field_type = FieldType::Text;
    let err = store.update_definition(&changed).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    let mut renamed = def.clone();
    renamed.name = "Código interno".into();
    let renamed = store.update_definition(&renamed).await.unwrap().unwrap();
    assert_eq!(renamed.field_type, FieldType::Number);
}

#[tokio::test]
async fn store_rejects_values_coerced_against_a_stale_definition() {
    let store = MemoryStore::new();
    let mut def = store
        .insert_definition(&definition("Código", FieldType::Text))
        .await
        .unwrap();

    // Valor coerido como texto, mas o campo virou número antes da gravação
    let stale = FieldValue::Text("abc".into());
    def.field_type = FieldType::Number;
    store.update_definition(&def).await.unwrap().unwrap();

    let err = store.upsert_values(1, &[(def.id, stale)]).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
    assert!(store.list_values(1).await.unwrap().is_empty());

    def.active = false;
    store.update_definition(&def).await.unwrap().unwrap();
    let err = store
        .upsert_values(1, &[(def.id, FieldValue::Number(Decimal::ONE))])
        .await
        .unwrap_err();
    assert_eq!(invalid_fields(err), vec!["field_id"]);
}
