//! Domain layer - records, store capability and retry semantics

pub mod error;
pub mod knowledge;
pub mod retry;
pub mod store;

pub use error::StoreError;
pub use knowledge::{IntegrationPoint, KnowledgeUnit, KnowledgeValidationError};
pub use retry::{OperationOptions, ResilientExecutor, RetryPolicy};
pub use store::{
    Collection, Document, DocumentStore, FieldFilter, INTEGRATION_POINTS, KNOWLEDGE_UNITS,
    StoreDocument,
};
