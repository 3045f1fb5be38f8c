//! PostgreSQL document store with connection pooling

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{Document, DocumentStore, FieldFilter, StoreError};

/// Collection names double as table names
static COLLECTION_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,62}$").unwrap());

/// PostgreSQL store configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/acdkn".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }
}

/// Document store keeping each collection in its own JSONB table
pub struct PostgresDocumentStore {
    pool: PgPool,
    ensured: RwLock<HashSet<String>>,
}

impl std::fmt::Debug for PostgresDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDocumentStore")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            ensured: RwLock::new(HashSet::new()),
        }
    }

    /// Opens the connection pool
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::connection_caused_by("Failed to connect to PostgreSQL", e))?;

        Ok(Self::new(pool))
    }

    /// Creates the backing table for a collection on first use
    pub async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        validate_collection_name(collection)?;

        if self.ensured.read().await.contains(collection) {
            return Ok(());
        }

        let mut ensured = self.ensured.write().await;
        if ensured.contains(collection) {
            return Ok(());
        }

        let query = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id VARCHAR(255) PRIMARY KEY,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            collection
        );

        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_sqlx_error("create collection table", e))?;

        debug!(collection, "Collection table ready");
        ensured.insert(collection.to_string());
        Ok(())
    }
}

fn validate_collection_name(collection: &str) -> Result<(), StoreError> {
    if COLLECTION_NAME_PATTERN.is_match(collection) {
        Ok(())
    } else {
        Err(StoreError::validation(format!(
            "Invalid collection name '{}': must be lowercase alphanumeric with underscores",
            collection
        )))
    }
}

fn row_document(row: &sqlx::postgres::PgRow) -> Result<Document, StoreError> {
    let data: serde_json::Value = row
        .try_get("data")
        .map_err(|e| classify_sqlx_error("read document", e))?;

    match data {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(StoreError::internal(format!(
            "Stored document is not an object: {}",
            other
        ))),
    }
}

/// Maps a sqlx failure onto the store error taxonomy
pub fn classify_sqlx_error(context: &str, error: sqlx::Error) -> StoreError {
    let message = format!("Failed to {}: {}", context, error);

    match &error {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::transient(message),
        sqlx::Error::RowNotFound => StoreError::not_found(message),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(code) => classify_sqlstate(code, message),
            None => StoreError::internal(message),
        },
        _ => StoreError::internal(message),
    }
}

fn classify_sqlstate(code: &str, message: String) -> StoreError {
    match code {
        // serialization failure, deadlock, admin shutdown, cannot connect now
        "40001" | "40P01" | "57P01" | "57P02" | "57P03" => StoreError::transient(message),
        "42501" => StoreError::permission(message),
        "23505" => StoreError::conflict(message),
        // connection exception, insufficient resources
        c if c.starts_with("08") || c.starts_with("53") => StoreError::transient(message),
        // data exception, integrity constraint violation
        c if c.starts_with("22") || c.starts_with("23") => StoreError::validation(message),
        c if c.starts_with("28") => StoreError::permission(message),
        _ => StoreError::internal(message),
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.ensure_collection(collection).await?;
        let query = format!("SELECT data FROM {} WHERE id = $1", collection);

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify_sqlx_error("get document", e))?;

        row.as_ref().map(row_document).transpose()
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        self.ensure_collection(collection).await?;
        let query = format!(
            r#"
            INSERT INTO {} (id, data)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
            collection
        );

        sqlx::query(&query)
            .bind(id)
            .bind(serde_json::Value::Object(document))
            .execute(&self.pool)
            .await
            .map_err(|e| classify_sqlx_error("put document", e))?;

        Ok(())
    }

    async fn insert(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<bool, StoreError> {
        self.ensure_collection(collection).await?;
        let query = format!(
            "INSERT INTO {} (id, data) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
            collection
        );

        let result = sqlx::query(&query)
            .bind(id)
            .bind(serde_json::Value::Object(document))
            .execute(&self.pool)
            .await
            .map_err(|e| classify_sqlx_error("insert document", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        self.ensure_collection(collection).await?;
        let query = format!("DELETE FROM {} WHERE id = $1", collection);

        let result = sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_sqlx_error("delete document", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn query(
        &self,
        collection: &str,
        filter: &FieldFilter,
    ) -> Result<Vec<Document>, StoreError> {
        self.ensure_collection(collection).await?;
        let query = format!(
            "SELECT data FROM {} WHERE data -> $1 = $2 ORDER BY created_at",
            collection
        );

        let rows = sqlx::query(&query)
            .bind(&filter.field)
            .bind(&filter.value)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify_sqlx_error("query documents", e))?;

        rows.iter().map(row_document).collect()
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        self.ensure_collection(collection).await?;
        let query = format!("SELECT COUNT(*) AS count FROM {}", collection);

        let row = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify_sqlx_error("count documents", e))?;

        let count: i64 = row
            .try_get("count")
            .map_err(|e| classify_sqlx_error("read count", e))?;
        Ok(count.max(0) as usize)
    }

    async fn probe(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| classify_sqlx_error("probe connection", e))?;

        Ok(())
    }
}
