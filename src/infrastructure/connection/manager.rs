//! Connection manager - owns the one shared store connection

use std::sync::Arc;

use tracing::{error, info};

use super::cell::GLOBAL_CONNECTION;
use crate::config::{self, AppConfig};
use crate::domain::{Collection, DocumentStore, INTEGRATION_POINTS, KNOWLEDGE_UNITS, StoreError};
use crate::infrastructure::store::{DefaultStoreConnector, StoreConnector};

/// Holds the process-wide store handle and issues collection handles off it
pub struct ConnectionManager {
    project_id: String,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl ConnectionManager {
    /// Returns the process-wide manager, connecting on first use
    ///
    /// Concurrent first callers share a single initialization. A failed
    /// initialization is not retained, so a later call starts over.
    pub async fn get_instance() -> Result<Arc<ConnectionManager>, StoreError> {
        let settings = config::settings()?;
        GLOBAL_CONNECTION
            .get_or_init(&settings, &DefaultStoreConnector)
            .await
    }

    /// Performs the handshake and the connectivity probe
    pub async fn initialize(
        config: &AppConfig,
        connector: &dyn StoreConnector,
    ) -> Result<Self, StoreError> {
        let project_id = config.firebase_project_id.clone();
        info!(project_id = %project_id, backend = ?config.store_backend, "Initializing store connection");

        let store = connector.connect(config).await.map_err(|e| match e {
            StoreError::Connection { .. } => e,
            other => StoreError::connection_caused_by(
                "Unexpected failure during store initialization",
                other,
            ),
        })?;

        if let Err(e) = store.probe().await {
            error!(project_id = %project_id, error = %e, "Store connectivity probe failed");
            return Err(StoreError::connection_caused_by(
                "Store connectivity probe failed",
                e,
            ));
        }

        info!(project_id = %project_id, "Store connection ready");
        Ok(Self { project_id, store })
    }

    /// Wraps an already-open store
    pub fn with_store(project_id: impl Into<String>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            project_id: project_id.into(),
            store,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Handle bound to a named collection on the shared connection
    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(name, self.store.clone())
    }

    pub fn knowledge_units(&self) -> Collection {
        self.collection(KNOWLEDGE_UNITS)
    }

    pub fn integration_points(&self) -> Collection {
        self.collection(INTEGRATION_POINTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::mock::MockDocumentStore;
    use crate::infrastructure::store::MockStoreConnector;
    use std::path::PathBuf;

    fn config() -> AppConfig {
        AppConfig::new("acdkn-test", PathBuf::from("unused.json"))
    }

    #[tokio::test]
    async fn test_initialize_probes_store() {
        let mut connector = MockStoreConnector::new();
        connector
            .expect_connect()
            .times(1)
            .returning(|_| Ok(Arc::new(MockDocumentStore::new())));

        let manager = ConnectionManager::initialize(&config(), &connector)
            .await
            .unwrap();

        assert_eq!(manager.project_id(), "acdkn-test");
        assert_eq!(manager.knowledge_units().name(), KNOWLEDGE_UNITS);
        assert_eq!(manager.integration_points().name(), INTEGRATION_POINTS);
    }

    #[tokio::test]
    async fn test_handshake_failure_stays_connection_error() {
        let mut connector = MockStoreConnector::new();
        connector
            .expect_connect()
            .returning(|_| Err(StoreError::connection("handshake refused")));

        let err = ConnectionManager::initialize(&config(), &connector)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Connection error: handshake refused");
    }

    #[tokio::test]
    async fn test_unexpected_failure_is_wrapped() {
        let mut connector = MockStoreConnector::new();
        connector
            .expect_connect()
            .returning(|_| Err(StoreError::internal("credential parser panicked")));

        let err = ConnectionManager::initialize(&config(), &connector)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Connection { source: Some(_), .. }));
        assert!(err.chain().contains("credential parser panicked"));
    }

    #[tokio::test]
    async fn test_probe_failure_fails_initialization() {
        let mut connector = MockStoreConnector::new();
        connector.expect_connect().returning(|_| {
            Ok(Arc::new(
                MockDocumentStore::new().with_probe_error(StoreError::transient("cold")),
            ))
        });

        let err = ConnectionManager::initialize(&config(), &connector)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Connection { .. }));
        assert!(err.chain().contains("cold"));
    }

    // The only test in the crate that installs process settings
    #[tokio::test]
    async fn test_get_instance_returns_the_process_connection() {
        let credentials = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(credentials.path(), r#"{"project_id": "acdkn-global"}"#).unwrap();

        let installed =
            config::install(AppConfig::new("acdkn-global", credentials.path())).unwrap();
        assert!(Arc::ptr_eq(&installed, &config::settings().unwrap()));

        let first = ConnectionManager::get_instance().await.unwrap();
        let second = ConnectionManager::get_instance().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.project_id(), "acdkn-global");
        assert!(config::install(AppConfig::new("acdkn-other", credentials.path())).is_err());
    }

    #[test]
    fn test_collections_share_one_store() {
        let manager =
            ConnectionManager::with_store("acdkn-test", Arc::new(MockDocumentStore::new()));

        let a = manager.collection("knowledge_units");
        let b = manager.integration_points();
        assert!(a.shares_store_with(&b));
    }
}
