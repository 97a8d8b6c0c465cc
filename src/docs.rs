// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CRM Core",
        description = "Campos personalizados, referências polimórficas e workflows"
    ),
    paths(
        // --- Custom Fields ---
        handlers::custom_fields::create_field,
        handlers::custom_fields::list_fields,
        handlers::custom_fields::get_field,
        handlers::custom_fields::update_field,
        handlers::custom_fields::delete_field,

        // --- Custom Field Values ---
        handlers::custom_fields::get_owner_values,
        handlers::custom_fields::upsert_owner_values,
        handlers::custom_fields::delete_owner_values,
        handlers::custom_fields::get_value,
        handlers::custom_fields::upsert_value,
        handlers::custom_fields::delete_value,
        handlers::custom_fields::check_required,

        // --- Workflows ---
        handlers::workflows::create_workflow,
        handlers::workflows::list_workflows,
        handlers::workflows::get_workflow,
        handlers::workflows::update_workflow,
        handlers::workflows::delete_workflow,
        handlers::workflows::toggle_workflow,

        // --- Targets ---
        handlers::targets::validate_target,
    ),
    components(
        schemas(
            // --- Custom Fields ---
            models::custom_field::FieldType,
            models::custom_field::CustomFieldDefinition,
            models::custom_field::CustomFieldValue,
            models::custom_field::OwnerFieldValues,
            models::custom_field::RemovalOutcome,
            models::custom_field::CreateCustomFieldInput,
            models::custom_field::UpdateCustomFieldInput,
            models::custom_field::ValueInput,
            models::custom_field::BulkValuesInput,

            // --- Workflows ---
            models::workflow::WorkflowEntityType,
            models::workflow::TriggerType,
            models::workflow::ActionType,
            models::workflow::Workflow,
            models::workflow::WorkflowAction,
            models::workflow::CreateWorkflowInput,
            models::workflow::UpdateWorkflowInput,
            models::workflow::WorkflowActionInput,

            // --- Targets ---
            models::entity::EntityKind,
            models::entity::TargetOwner,
            models::entity::TargetInput,
            models::entity::EntityRefView,
        )
    ),
    tags(
        (name = "Custom Fields", description = "Definição de campos personalizados"),
        (name = "Custom Field Values", description = "Valores dos campos por cliente"),
        (name = "Workflows", description = "Gatilhos e ações de automação (só definição)"),
        (name = "Targets", description = "Validação de referências polimórficas")
    )
)]
pub struct ApiDoc;
