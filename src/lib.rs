//! ACDKN knowledge store
//!
//! Persistence layer for cross-domain knowledge units:
//! - Layered settings with fail-fast validation
//! - One lazily opened store connection shared by the whole process
//! - Retry with capped exponential backoff for transient store failures
//! - Cached, validated access to knowledge units and integration points

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{
    IntegrationPoint, KnowledgeUnit, OperationOptions, ResilientExecutor, RetryPolicy, StoreError,
};
pub use infrastructure::connection::ConnectionManager;
pub use infrastructure::services::KnowledgeUnitService;
