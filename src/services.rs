pub mod custom_field_service;
pub use custom_field_service::CustomFieldService;
pub mod workflow_service;
pub use workflow_service::WorkflowService;
pub mod target_service;
pub use target_service::TargetService;
