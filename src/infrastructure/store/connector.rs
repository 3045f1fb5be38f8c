//! Store handshake - turns validated settings into a live store handle

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use tracing::info;

use super::in_memory::InMemoryDocumentStore;
use super::postgres::{PostgresConfig, PostgresDocumentStore};
use crate::config::{AppConfig, StoreBackend};
use crate::domain::{DocumentStore, StoreError};

/// Opens the single underlying store connection
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, config: &AppConfig) -> Result<Arc<dyn DocumentStore>, StoreError>;
}

/// Service-account style credentials file
#[derive(Debug, Clone, Deserialize)]
pub struct StoreCredentials {
    pub project_id: String,
    #[serde(default)]
    pub client_email: Option<String>,
    /// Required by the postgres backend
    #[serde(default)]
    pub database_url: Option<String>,
}

impl StoreCredentials {
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StoreError::connection_caused_by(
                format!("Failed to read credentials file {}", path.display()),
                e,
            )
        })?;

        serde_json::from_str(&raw).map_err(|e| {
            StoreError::connection_caused_by(
                format!("Malformed credentials file {}", path.display()),
                e,
            )
        })
    }
}

/// Connector selecting the backend named in the configuration
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStoreConnector;

#[async_trait]
impl StoreConnector for DefaultStoreConnector {
    async fn connect(&self, config: &AppConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
        let credentials = StoreCredentials::from_file(&config.firebase_credentials_path)?;

        if credentials.project_id != config.firebase_project_id {
            return Err(StoreError::connection(format!(
                "Credentials belong to project '{}', expected '{}'",
                credentials.project_id, config.firebase_project_id
            )));
        }

        match config.store_backend {
            StoreBackend::Memory => {
                info!(project_id = %config.firebase_project_id, "Using in-memory document store");
                Ok(Arc::new(InMemoryDocumentStore::new()))
            }
            StoreBackend::Postgres => {
                let url = credentials.database_url.ok_or_else(|| {
                    StoreError::connection("Credentials file has no database_url for postgres")
                })?;
                let pool_size =
                    u32::try_from(config.max_concurrent_operations).unwrap_or(u32::MAX);
                let store = PostgresDocumentStore::connect(
                    &PostgresConfig::new(url).with_max_connections(pool_size),
                )
                .await?;

                info!(
                    project_id = %config.firebase_project_id,
                    "Connected to PostgreSQL document store"
                );
                Ok(Arc::new(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn config_with_credentials(body: &str) -> (NamedTempFile, AppConfig) {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), body).unwrap();
        let config = AppConfig::new("acdkn-test", file.path());
        (file, config)
    }

    #[tokio::test]
    async fn test_memory_backend_connects() {
        let (_file, config) = config_with_credentials(r#"{"project_id": "acdkn-test"}"#);

        let store = DefaultStoreConnector.connect(&config).await.unwrap();
        assert!(store.probe().await.is_ok());
    }

    #[tokio::test]
    async fn test_project_mismatch_is_connection_error() {
        let (_file, config) = config_with_credentials(r#"{"project_id": "someone-else"}"#);

        let err = DefaultStoreConnector.connect(&config).await.unwrap_err();
        assert!(matches!(err, StoreError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_malformed_credentials_is_connection_error() {
        let (_file, config) = config_with_credentials("not json");

        let err = DefaultStoreConnector.connect(&config).await.unwrap_err();
        assert!(matches!(err, StoreError::Connection { source: Some(_), .. }));
    }

    #[tokio::test]
    async fn test_postgres_requires_database_url() {
        let (_file, mut config) = config_with_credentials(r#"{"project_id": "acdkn-test"}"#);
        config.store_backend = StoreBackend::Postgres;

        let err = DefaultStoreConnector.connect(&config).await.unwrap_err();
        assert!(err.to_string().contains("database_url"));
    }

    #[test]
    fn test_credentials_optional_fields() {
        let (file, _) = config_with_credentials(
            r#"{"project_id": "p", "client_email": "svc@p.iam", "database_url": "postgres://db/p"}"#,
        );

        let credentials = StoreCredentials::from_file(file.path()).unwrap();
        assert_eq!(credentials.project_id, "p");
        assert_eq!(credentials.client_email.as_deref(), Some("svc@p.iam"));
        assert_eq!(credentials.database_url.as_deref(), Some("postgres://db/p"));
    }
}
