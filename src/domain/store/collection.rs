//! Collection handle bound to a shared store connection

use std::fmt;
use std::sync::Arc;

use crate::domain::StoreError;

use super::document::{Document, FieldFilter};
use super::repository::DocumentStore;

/// Collection holding knowledge unit records
pub const KNOWLEDGE_UNITS: &str = "knowledge_units";

/// Collection holding integration point records
pub const INTEGRATION_POINTS: &str = "integration_points";

/// Handle to one named collection
///
/// Cloning is cheap and never opens a new connection; all handles share the
/// store they were issued from.
#[derive(Clone)]
pub struct Collection {
    name: Arc<str>,
    store: Arc<dyn DocumentStore>,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .finish()
    }
}

impl Collection {
    pub fn new(name: impl Into<Arc<str>>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        self.store.get(&self.name, id).await
    }

    pub async fn put(&self, id: &str, document: Document) -> Result<(), StoreError> {
        self.store.put(&self.name, id, document).await
    }

    pub async fn insert(&self, id: &str, document: Document) -> Result<bool, StoreError> {
        self.store.insert(&self.name, id, document).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete(&self.name, id).await
    }

    pub async fn query(&self, filter: &FieldFilter) -> Result<Vec<Document>, StoreError> {
        self.store.query(&self.name, filter).await
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        self.store.count(&self.name).await
    }

    /// Returns true if both handles are backed by the same store instance
    pub fn shares_store_with(&self, other: &Collection) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::mock::MockDocumentStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_collection_scopes_calls_by_name() {
        let store: Arc<dyn DocumentStore> = Arc::new(MockDocumentStore::new());
        let units = Collection::new(KNOWLEDGE_UNITS, store.clone());
        let points = Collection::new(INTEGRATION_POINTS, store);

        let mut document = Document::new();
        document.insert("content".to_string(), json!("x"));
        units.put("u-1", document).await.unwrap();

        assert!(units.get("u-1").await.unwrap().is_some());
        assert!(points.get("u-1").await.unwrap().is_none());
        assert!(units.shares_store_with(&points));
    }
}
