//! Typed repository issuing every call through the resilient executor

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::Value;

use crate::domain::{
    Collection, FieldFilter, OperationOptions, ResilientExecutor, StoreDocument, StoreError,
};

/// Repository over one collection of typed records
#[derive(Debug, Clone)]
pub struct Repository<E>
where
    E: StoreDocument,
{
    collection: Collection,
    executor: ResilientExecutor,
    _phantom: PhantomData<E>,
}

impl<E> Repository<E>
where
    E: StoreDocument,
{
    pub fn new(collection: Collection, executor: ResilientExecutor) -> Self {
        Self {
            collection,
            executor,
            _phantom: PhantomData,
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    fn options(&self, action: &str) -> OperationOptions {
        OperationOptions::idempotent(format!("{}.{}", self.collection.name(), action))
    }

    pub async fn get(&self, id: &str) -> Result<Option<E>, StoreError> {
        let document = self
            .executor
            .run_on(&self.collection, &self.options("get"), |c| {
                let id = id.to_string();
                async move { c.get(&id).await }
            })
            .await?;

        document.map(E::from_document).transpose()
    }

    /// Writes the record under its own id; repeating the write is harmless
    pub async fn save(&self, entity: &E) -> Result<(), StoreError> {
        let document = entity.to_document()?;
        let id = entity.document_id().to_string();

        self.executor
            .run_on(&self.collection, &self.options("save"), |c| {
                let id = id.clone();
                let document = document.clone();
                async move { c.put(&id, document).await }
            })
            .await
    }

    /// Writes the record only if its id is unused; false means another record holds the id
    ///
    /// A retried attempt that finds the id taken compares the stored body with
    /// its own, since the earlier attempt may have been applied before failing.
    pub async fn insert(&self, entity: &E) -> Result<bool, StoreError> {
        let document = entity.to_document()?;
        let id = entity.document_id().to_string();
        let attempts = AtomicU32::new(0);

        self.executor
            .run_on(&self.collection, &self.options("insert"), |c| {
                let retried = attempts.fetch_add(1, Ordering::SeqCst) > 0;
                let id = id.clone();
                let document = document.clone();
                async move {
                    if c.insert(&id, document.clone()).await? {
                        return Ok(true);
                    }
                    if retried {
                        return Ok(c.get(&id).await?.as_ref() == Some(&document));
                    }
                    Ok(false)
                }
            })
            .await
    }

    /// Deletes the record, returns true if it existed
    ///
    /// Once an attempt has failed, a later attempt that finds nothing reports
    /// true: the failed attempt may have removed the record before its reply was lost.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let attempts = AtomicU32::new(0);

        self.executor
            .run_on(&self.collection, &self.options("delete"), |c| {
                let retried = attempts.fetch_add(1, Ordering::SeqCst) > 0;
                let id = id.to_string();
                async move { Ok(c.delete(&id).await? || retried) }
            })
            .await
    }

    pub async fn find_by(
        &self,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<E>, StoreError> {
        let filter = FieldFilter::equals(field, value);

        let documents = self
            .executor
            .run_on(&self.collection, &self.options("query"), |c| {
                let filter = filter.clone();
                async move { c.query(&filter).await }
            })
            .await?;

        documents.into_iter().map(E::from_document).collect()
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        self.executor
            .run_on(&self.collection, &self.options("count"), |c| async move {
                c.count().await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::domain::store::mock::MockDocumentStore;
    use crate::domain::{DocumentStore, KNOWLEDGE_UNITS, KnowledgeUnit, RetryPolicy};

    fn repository(store: Arc<MockDocumentStore>) -> Repository<KnowledgeUnit> {
        let store: Arc<dyn DocumentStore> = store;
        let executor = ResilientExecutor::new(
            RetryPolicy::new(3).with_base_delay(Duration::from_millis(10)),
        )
        .unwrap();
        Repository::new(Collection::new(KNOWLEDGE_UNITS, store), executor)
    }

    #[tokio::test]
    async fn test_save_then_get() {
        let store = Arc::new(MockDocumentStore::new());
        let repo = repository(store);
        let unit = KnowledgeUnit::new("ku-1", "finance", "Rates rose");

        repo.save(&unit).await.unwrap();

        let loaded = repo.get("ku-1").await.unwrap();
        assert_eq!(loaded, Some(unit));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_retries_transient_failures() {
        let store = Arc::new(MockDocumentStore::new());
        store.fail_next(StoreError::transient("unavailable"));
        store.fail_next(StoreError::transient("throttled"));
        let repo = repository(store.clone());

        repo.save(&KnowledgeUnit::new("ku-1", "finance", "x"))
            .await
            .unwrap();

        assert_eq!(store.calls(), 3);
        assert!(repo.get("ku-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_permission_error_is_not_retried() {
        let store = Arc::new(MockDocumentStore::new());
        store.fail_next(StoreError::permission("read denied"));
        let repo = repository(store.clone());

        let err = repo.get("ku-1").await.unwrap_err();

        assert!(matches!(err, StoreError::Permission { .. }));
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_reports_removal_when_reply_was_lost() {
        let store = Arc::new(MockDocumentStore::new());
        let repo = repository(store.clone());
        repo.save(&KnowledgeUnit::new("ku-1", "finance", "x"))
            .await
            .unwrap();
        store.fail_after_next_write(StoreError::transient("connection reset"));

        assert!(repo.delete("ku-1").await.unwrap());
        assert!(repo.get("ku-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_of_unknown_id_is_false() {
        let repo = repository(Arc::new(MockDocumentStore::new()));

        assert!(!repo.delete("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_refuses_taken_id() {
        let repo = repository(Arc::new(MockDocumentStore::new()));
        let first = KnowledgeUnit::new("ku-1", "finance", "first");

        assert!(repo.insert(&first).await.unwrap());
        assert!(!repo
            .insert(&KnowledgeUnit::new("ku-1", "finance", "second"))
            .await
            .unwrap());
        assert_eq!(repo.get("ku-1").await.unwrap(), Some(first));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_recognizes_own_write_after_lost_reply() {
        let store = Arc::new(MockDocumentStore::new());
        let repo = repository(store.clone());
        store.fail_after_next_write(StoreError::transient("connection reset"));

        assert!(repo
            .insert(&KnowledgeUnit::new("ku-1", "finance", "x"))
            .await
            .unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_by_and_delete() {
        let store = Arc::new(MockDocumentStore::new());
        let repo = repository(store);

        repo.save(&KnowledgeUnit::new("a", "finance", "x")).await.unwrap();
        repo.save(&KnowledgeUnit::new("b", "research", "y")).await.unwrap();

        let finance = repo.find_by("domain", "finance").await.unwrap();
        assert_eq!(finance.len(), 1);
        assert_eq!(finance[0].id(), "a");

        assert!(repo.delete("a").await.unwrap());
        assert!(repo.find_by("domain", "finance").await.unwrap().is_empty());
    }
}
