//! Document store capability

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::StoreError;

use super::document::{Document, FieldFilter};

/// Remote document store addressed by collection name and document id
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Fetches a document, `None` if the id is unknown
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Writes a document under the given id, replacing any previous body
    async fn put(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<(), StoreError>;

    /// Writes a document only if the id is unused, returns false if it already exists
    async fn insert(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<bool, StoreError>;

    /// Deletes a document, returns true if it existed
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Returns documents whose field equals the filter value
    async fn query(
        &self,
        collection: &str,
        filter: &FieldFilter,
    ) -> Result<Vec<Document>, StoreError>;

    /// Number of documents in a collection
    async fn count(&self, collection: &str) -> Result<usize, StoreError>;

    /// Lightweight round trip used to confirm the connection is usable
    async fn probe(&self) -> Result<(), StoreError>;
}
