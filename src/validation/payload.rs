// src/validation/payload.rs
//
// Payloads livres cujo formato depende de um discriminador irmão
// (action_type -> action_data, trigger_type -> trigger_data).

use serde_json::Value;

use crate::{
    common::error::AppError,
    models::workflow::{ActionType, Payload, TriggerType, WorkflowEntityType},
    validation::ClosedSet,
};

/// O que um valor de discriminador exige do payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Nada é exigido (passa direto).
    Nothing,
    /// Todas as chaves precisam estar presentes.
    AllOf(&'static [&'static str]),
    /// De cada grupo, pelo menos uma chave precisa estar presente.
    AnyOf(&'static [&'static [&'static str]]),
}

/// Enumeração cujo valor decide o formato de um payload.
pub trait Discriminator: ClosedSet {
    /// Campo de erro para o payload associado (ex: "action_data").
    const PAYLOAD_FIELD: &'static str;

    fn requirement(&self) -> Requirement;
}

/// Validador genérico: checa presença das chaves exigidas.
/// Sem discriminador (atualização parcial sem tipo) a validação passa.
pub fn validate_payload<D: Discriminator>(discriminator: Option<D>, payload: &Payload) -> Result<(), AppError> {
    let Some(discriminator) = discriminator else {
        return Ok(());
    };
    check_requirement(
        D::PAYLOAD_FIELD,
        discriminator.as_str(),
        discriminator.requirement(),
        payload,
    )
}

/// Checagem por tabela, também usada para formatos ainda sem variante tipada.
pub fn check_requirement(
    field: &'static str,
    label: &str,
    requirement: Requirement,
    payload: &Payload,
) -> Result<(), AppError> {
    match requirement {
        Requirement::Nothing => Ok(()),
        Requirement::AllOf(keys) => {
            let missing: Vec<&str> = keys
                .iter()
                .copied()
                .filter(|k| !payload.contains_key(*k))
                .collect();
            if missing.is_empty() {
                return Ok(());
            }
            Err(AppError::field(
                field,
                "missing_keys",
                format!("{} para '{}'", describe_all(&missing), label),
            ))
        }
        Requirement::AnyOf(groups) => {
            for group in groups {
                if !group.iter().any(|k| payload.contains_key(*k)) {
                    return Err(AppError::field(
                        field,
                        "missing_keys",
                        format!("uma das chaves {} é obrigatória para '{}'", describe_any(group), label),
                    ));
                }
            }
            Ok(())
        }
    }
}

fn quoted(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| format!("'{}'", k)).collect()
}

fn describe_all(keys: &[&str]) -> String {
    match keys {
        [single] => format!("a chave '{}' é obrigatória", single),
        _ => format!("as chaves {} são obrigatórias", quoted(keys).join(" e ")),
    }
}

fn describe_any(keys: &[&str]) -> String {
    quoted(keys).join(" ou ")
}

// =============================================================================
//  ENUMS DO WORKFLOW
// =============================================================================

impl ClosedSet for WorkflowEntityType {
    const FIELD: &'static str = "entity_type";

    fn variants() -> &'static [Self] {
        &[
            WorkflowEntityType::Customer,
            WorkflowEntityType::Lead,
            WorkflowEntityType::Deal,
            WorkflowEntityType::Task,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            WorkflowEntityType::Customer => "customer",
            WorkflowEntityType::Lead => "lead",
            WorkflowEntityType::Deal => "deal",
            WorkflowEntityType::Task => "task",
        }
    }
}

impl ClosedSet for TriggerType {
    const FIELD: &'static str = "trigger_type";

    fn variants() -> &'static [Self] {
        &[
            TriggerType::OnCreate,
            TriggerType::OnUpdate,
            TriggerType::OnStatusChange,
            TriggerType::Scheduled,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            TriggerType::OnCreate => "on_create",
            TriggerType::OnUpdate => "on_update",
            TriggerType::OnStatusChange => "on_status_change",
            TriggerType::Scheduled => "scheduled",
        }
    }
}

impl Discriminator for TriggerType {
    const PAYLOAD_FIELD: &'static str = "trigger_data";

    fn requirement(&self) -> Requirement {
        match self {
            TriggerType::OnStatusChange => Requirement::AnyOf(&[&["from_status", "to_status"]]),
            TriggerType::Scheduled => Requirement::AllOf(&["frequency"]),
            TriggerType::OnCreate | TriggerType::OnUpdate => Requirement::Nothing,
        }
    }
}

impl ClosedSet for ActionType {
    const FIELD: &'static str = "action_type";

    fn variants() -> &'static [Self] {
        &[
            ActionType::UpdateField,
            ActionType::CreateTask,
            ActionType::SendEmail,
            ActionType::AssignUser,
            ActionType::ChangeStatus,
            ActionType::CreateNotification,
            ActionType::Webhook,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            ActionType::UpdateField => "update_field",
            ActionType::CreateTask => "create_task",
            ActionType::SendEmail => "send_email",
            ActionType::AssignUser => "assign_user",
            ActionType::ChangeStatus => "change_status",
            ActionType::CreateNotification => "create_notification",
            ActionType::Webhook => "webhook",
        }
    }
}

impl Discriminator for ActionType {
    const PAYLOAD_FIELD: &'static str = "action_data";

    fn requirement(&self) -> Requirement {
        match self {
            ActionType::UpdateField => Requirement::AllOf(&["field", "value"]),
            ActionType::CreateTask => Requirement::AllOf(&["title"]),
            ActionType::SendEmail => Requirement::AllOf(&["template", "subject"]),
            ActionType::AssignUser => Requirement::AnyOf(&[&["user_id", "role"]]),
            ActionType::Webhook => Requirement::AllOf(&["url"]),
            ActionType::ChangeStatus | ActionType::CreateNotification => Requirement::Nothing,
        }
    }
}

// =============================================================================
//  PAYLOADS TIPADOS
// =============================================================================

/// Quem recebe uma ação `assign_user`.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignee {
    User(Value),
    Role(Value),
}

/// Forma tipada de `action_data`. Só é construída depois da checagem de chaves,
/// então cada variante tem garantidos os campos que a tabela exige.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionPayload {
    UpdateField { field: Value, value: Value },
    CreateTask { title: Value },
    SendEmail { template: Value, subject: Value },
    AssignUser(Assignee),
    ChangeStatus,
    CreateNotification,
    Webhook { url: Value },
}

impl ActionPayload {
    pub fn from_data(action_type: ActionType, data: &Payload) -> Result<Self, AppError> {
        validate_payload(Some(action_type), data)?;

        // Depois da validação as chaves exigidas existem
        let take = |key: &str| data.get(key).cloned().unwrap_or(Value::Null);

        Ok(match action_type {
            ActionType::UpdateField => ActionPayload::UpdateField {
                field: take("field"),
                value: take("value"),
            },
            ActionType::CreateTask => ActionPayload::CreateTask { title: take("title") },
            ActionType::SendEmail => ActionPayload::SendEmail {
                template: take("template"),
                subject: take("subject"),
            },
            ActionType::AssignUser => match data.get("user_id") {
                Some(user) => ActionPayload::AssignUser(Assignee::User(user.clone())),
                None => ActionPayload::AssignUser(Assignee::Role(take("role"))),
            },
            ActionType::ChangeStatus => ActionPayload::ChangeStatus,
            ActionType::CreateNotification => ActionPayload::CreateNotification,
            ActionType::Webhook => ActionPayload::Webhook { url: take("url") },
        })
    }

    pub fn action_type(&self) -> ActionType {
        match self {
            ActionPayload::UpdateField { .. } => ActionType::UpdateField,
            ActionPayload::CreateTask { .. } => ActionType::CreateTask,
            ActionPayload::SendEmail { .. } => ActionType::SendEmail,
            ActionPayload::AssignUser(_) => ActionType::AssignUser,
            ActionPayload::ChangeStatus => ActionType::ChangeStatus,
            ActionPayload::CreateNotification => ActionType::CreateNotification,
            ActionPayload::Webhook { .. } => ActionType::Webhook,
        }
    }
}

/// Forma tipada de `trigger_data`.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerPayload {
    OnCreate,
    OnUpdate,
    OnStatusChange {
        from_status: Option<Value>,
        to_status: Option<Value>,
    },
    Scheduled { frequency: Value },
}

impl TriggerPayload {
    pub fn from_data(trigger_type: TriggerType, data: &Payload) -> Result<Self, AppError> {
        validate_payload(Some(trigger_type), data)?;

        Ok(match trigger_type {
            TriggerType::OnCreate => TriggerPayload::OnCreate,
            TriggerType::OnUpdate => TriggerPayload::OnUpdate,
            TriggerType::OnStatusChange => TriggerPayload::OnStatusChange {
                from_status: data.get("from_status").cloned(),
                to_status: data.get("to_status").cloned(),
            },
            TriggerType::Scheduled => TriggerPayload::Scheduled {
                frequency: data.get("frequency").cloned().unwrap_or(Value::Null),
            },
        })
    }

    pub fn trigger_type(&self) -> TriggerType {
        match self {
            TriggerPayload::OnCreate => TriggerType::OnCreate,
            TriggerPayload::OnUpdate => TriggerType::OnUpdate,
            TriggerPayload::OnStatusChange { .. } => TriggerType::OnStatusChange,
            TriggerPayload::Scheduled { .. } => TriggerType::Scheduled,
        }
    }
}
