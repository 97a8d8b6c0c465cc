pub mod custom_fields;
pub mod targets;
pub mod workflows;
