pub mod custom_field;
pub mod entity;
pub mod workflow;
