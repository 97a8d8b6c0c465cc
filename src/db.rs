pub mod custom_field_repo;
pub use custom_field_repo::{CustomFieldRepository, PgCustomFieldRepository};
pub mod workflow_repo;
pub use workflow_repo::{PgWorkflowRepository, WorkflowRepository};
pub mod entity_repo;
pub use entity_repo::{EntityLookup, PgEntityLookup};
pub mod memory;
pub use memory::MemoryStore;
