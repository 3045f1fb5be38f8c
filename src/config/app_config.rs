use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{RetryPolicy, StoreError};

/// Environment variables read without the `ACDKN_` prefix
const UNPREFIXED_ENV_KEYS: [&str; 2] = ["FIREBASE_PROJECT_ID", "FIREBASE_CREDENTIALS_PATH"];

/// Longest cache TTL the cache builder accepts
pub const MAX_CACHE_TTL_SECONDS: u64 = 1_000 * 365 * 24 * 3600;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub firebase_project_id: String,
    pub firebase_credentials_path: PathBuf,
    #[serde(default)]
    pub store_backend: StoreBackend,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_max_knowledge_units")]
    pub max_knowledge_units: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff delay in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay: f64,
    /// Backoff ceiling in seconds
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay: f64,

    #[serde(default = "default_supported_domains")]
    pub supported_domains: Vec<String>,

    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_max_concurrent_operations")]
    pub max_concurrent_operations: usize,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend behind the document store connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_similarity_threshold() -> f64 {
    0.7
}

fn default_max_knowledge_units() -> usize {
    10_000
}

fn default_batch_size() -> usize {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> f64 {
    1.0
}

fn default_retry_max_delay() -> f64 {
    10.0
}

fn default_supported_domains() -> Vec<String> {
    ["healthcare", "finance", "technology", "research"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

fn default_cache_ttl_seconds() -> u64 {
    3600
}

fn default_max_concurrent_operations() -> usize {
    10
}

impl AppConfig {
    /// Builds a configuration with defaults for everything but the connection identity
    pub fn new(project_id: impl Into<String>, credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            firebase_project_id: project_id.into(),
            firebase_credentials_path: credentials_path.into(),
            store_backend: StoreBackend::default(),
            embedding_model: default_embedding_model(),
            similarity_threshold: default_similarity_threshold(),
            max_knowledge_units: default_max_knowledge_units(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            retry_max_delay: default_retry_max_delay(),
            supported_domains: default_supported_domains(),
            cache_ttl_seconds: default_cache_ttl_seconds(),
            max_concurrent_operations: default_max_concurrent_operations(),
            logging: LoggingConfig::default(),
        }
    }

    /// Loads settings from `config/default`, `config/local` and the environment
    ///
    /// `FIREBASE_PROJECT_ID` and `FIREBASE_CREDENTIALS_PATH` are honoured
    /// unprefixed; `ACDKN_*` variables override them and every other key.
    pub fn load() -> Result<Self, StoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        Self::finish(Self::with_environment(builder, std::env::vars()))
    }

    /// Loads settings from an explicit file, environment variables still override it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(true));

        Self::finish(Self::with_environment(builder, std::env::vars()))
    }

    /// Parses settings from an in-memory TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, StoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml));

        Self::finish(builder)
    }

    fn with_environment(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> config::ConfigBuilder<config::builder::DefaultState> {
        let unprefixed: config::Map<String, String> = vars
            .into_iter()
            .filter(|(key, _)| UNPREFIXED_ENV_KEYS.contains(&key.as_str()))
            .collect();

        builder
            .add_source(config::Environment::default().source(Some(unprefixed)))
            .add_source(Self::environment())
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix("ACDKN")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("supported_domains")
            .try_parsing(true)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, StoreError> {
        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| StoreError::configuration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Checks every bounded setting; the first violation names its field
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.firebase_project_id.trim().is_empty() {
            return Err(StoreError::configuration(
                "firebase_project_id must not be empty",
            ));
        }

        validate_credentials_path(&self.firebase_credentials_path)?;

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(StoreError::configuration(format!(
                "similarity_threshold must be between 0 and 1, got {}",
                self.similarity_threshold
            )));
        }

        for (field, value) in [
            ("max_knowledge_units", self.max_knowledge_units),
            ("batch_size", self.batch_size),
            ("max_concurrent_operations", self.max_concurrent_operations),
        ] {
            if value == 0 {
                return Err(StoreError::configuration(format!(
                    "{} must be greater than 0",
                    field
                )));
            }
        }

        self.cache_ttl()?;

        if !(self.retry_delay.is_finite() && self.retry_delay > 0.0) {
            return Err(StoreError::configuration(format!(
                "retry_delay must be greater than 0, got {}",
                self.retry_delay
            )));
        }

        if !self.retry_max_delay.is_finite() {
            return Err(StoreError::configuration(
                "retry_max_delay must be a finite number of seconds",
            ));
        }

        if self.supported_domains.is_empty() {
            return Err(StoreError::configuration(
                "supported_domains must list at least one domain",
            ));
        }

        self.retry_policy().map(|_| ())
    }

    /// Retry policy derived from `max_retries`, `retry_delay` and `retry_max_delay`
    pub fn retry_policy(&self) -> Result<RetryPolicy, StoreError> {
        let policy = RetryPolicy::new(self.max_retries)
            .with_base_delay(seconds_setting("retry_delay", self.retry_delay)?)
            .with_max_delay(seconds_setting("retry_max_delay", self.retry_max_delay)?);

        policy.validate()?;
        Ok(policy)
    }

    /// Cache entry lifetime; must be positive and at most 1000 years
    pub fn cache_ttl(&self) -> Result<Duration, StoreError> {
        if self.cache_ttl_seconds == 0 || self.cache_ttl_seconds > MAX_CACHE_TTL_SECONDS {
            return Err(StoreError::configuration(format!(
                "cache_ttl_seconds must be between 1 and {}, got {}",
                MAX_CACHE_TTL_SECONDS, self.cache_ttl_seconds
            )));
        }

        Ok(Duration::from_secs(self.cache_ttl_seconds))
    }
}

fn seconds_setting(field: &str, value: f64) -> Result<Duration, StoreError> {
    Duration::try_from_secs_f64(value.max(0.0)).map_err(|e| {
        StoreError::configuration(format!(
            "{} is not a usable number of seconds ({}): {}",
            field, value, e
        ))
    })
}

/// The credentials file must exist and be readable before anything connects
fn validate_credentials_path(path: &Path) -> Result<(), StoreError> {
    if path.as_os_str().is_empty() {
        return Err(StoreError::configuration(
            "firebase_credentials_path must not be empty",
        ));
    }

    if !path.is_file() {
        return Err(StoreError::configuration(format!(
            "firebase_credentials_path: credentials file not found: {}",
            path.display()
        )));
    }

    File::open(path).map_err(|e| {
        StoreError::configuration(format!(
            "firebase_credentials_path: credentials file not readable: {}: {}",
            path.display(),
            e
        ))
    })?;

    Ok(())
}
