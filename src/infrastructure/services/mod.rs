//! Infrastructure services

mod knowledge_service;
mod repository;

pub use knowledge_service::{BatchResult, KnowledgeUnitService};
pub use repository::Repository;
