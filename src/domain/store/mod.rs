//! Store domain - document store abstraction and collection handles

mod collection;
mod document;
mod repository;

pub use collection::{Collection, INTEGRATION_POINTS, KNOWLEDGE_UNITS};
pub use document::{Document, FieldFilter, StoreDocument};
pub use repository::DocumentStore;

#[cfg(test)]
pub use repository::mock;
