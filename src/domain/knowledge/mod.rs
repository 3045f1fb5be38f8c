//! Knowledge domain - knowledge units and the links between them

mod integration;
mod unit;
mod validation;

pub use integration::IntegrationPoint;
pub use unit::KnowledgeUnit;
pub use validation::{
    KnowledgeValidationError, MAX_UNIT_ID_LENGTH, normalize_domain, validate_confidence,
    validate_domain, validate_embeddings, validate_knowledge_unit, validate_similarity,
    validate_unit_id,
};
