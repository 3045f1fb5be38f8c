//! In-memory document store implementation

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::{Document, DocumentStore, FieldFilter, StoreError};

/// Thread-safe in-memory document store
///
/// Useful for testing and development. Data is lost when the process terminates.
/// Documents within a collection are kept ordered by id.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_error(e: impl std::fmt::Display) -> StoreError {
        StoreError::internal(format!("Failed to acquire store lock: {}", e))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().map_err(Self::lock_error)?;

        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().map_err(Self::lock_error)?;

        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn insert(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().map_err(Self::lock_error)?;

        match collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
        {
            Entry::Vacant(slot) => {
                slot.insert(document);
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().map_err(Self::lock_error)?;

        Ok(collections
            .get_mut(collection)
            .is_some_and(|docs| docs.remove(id).is_some()))
    }

    async fn query(
        &self,
        collection: &str,
        filter: &FieldFilter,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().map_err(Self::lock_error)?;

        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let collections = self.collections.read().map_err(Self::lock_error)?;

        Ok(collections.get(collection).map_or(0, BTreeMap::len))
    }

    async fn probe(&self) -> Result<(), StoreError> {
        self.collections.read().map_err(Self::lock_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(domain: &str, content: &str) -> Document {
        let mut document = Document::new();
        document.insert("domain".to_string(), json!(domain));
        document.insert("content".to_string(), json!(content));
        document
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = InMemoryDocumentStore::new();
        store.put("knowledge_units", "1", doc("finance", "a")).await.unwrap();

        let result = store.get("knowledge_units", "1").await.unwrap();
        assert_eq!(result, Some(doc("finance", "a")));
        assert!(store.get("knowledge_units", "2").await.unwrap().is_none());
        assert!(store.get("integration_points", "1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_existing() {
        let store = InMemoryDocumentStore::new();
        store.put("knowledge_units", "1", doc("finance", "a")).await.unwrap();
        store.put("knowledge_units", "1", doc("finance", "b")).await.unwrap();

        let result = store.get("knowledge_units", "1").await.unwrap().unwrap();
        assert_eq!(result.get("content"), Some(&json!("b")));
        assert_eq!(store.count("knowledge_units").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_only_when_absent() {
        let store = InMemoryDocumentStore::new();

        assert!(store.insert("knowledge_units", "1", doc("finance", "a")).await.unwrap());
        assert!(!store.insert("knowledge_units", "1", doc("finance", "b")).await.unwrap());

        let result = store.get("knowledge_units", "1").await.unwrap().unwrap();
        assert_eq!(result.get("content"), Some(&json!("a")));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryDocumentStore::new();
        store.put("knowledge_units", "1", doc("finance", "a")).await.unwrap();

        assert!(store.delete("knowledge_units", "1").await.unwrap());
        assert!(!store.delete("knowledge_units", "1").await.unwrap());
        assert!(!store.delete("unknown", "1").await.unwrap());
    }

    #[tokio::test]
    async fn test_query_by_field() {
        let store = InMemoryDocumentStore::new();
        store.put("knowledge_units", "2", doc("research", "b")).await.unwrap();
        store.put("knowledge_units", "1", doc("research", "a")).await.unwrap();
        store.put("knowledge_units", "3", doc("finance", "c")).await.unwrap();

        let found = store
            .query("knowledge_units", &FieldFilter::equals("domain", "research"))
            .await
            .unwrap();

        let contents: Vec<_> = found.iter().map(|d| d["content"].clone()).collect();
        assert_eq!(contents, vec![json!("a"), json!("b")]);
    }

    #[tokio::test]
    async fn test_count_and_probe() {
        let store = InMemoryDocumentStore::new();
        assert_eq!(store.count("knowledge_units").await.unwrap(), 0);
        assert!(store.probe().await.is_ok());
    }
}
