//! Process-wide configuration

mod app_config;

pub use app_config::{AppConfig, LogFormat, LoggingConfig, MAX_CACHE_TTL_SECONDS, StoreBackend};

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::domain::StoreError;

static SETTINGS: OnceCell<Arc<AppConfig>> = OnceCell::new();

/// Installs the process settings; fails if settings were already installed
pub fn install(config: AppConfig) -> Result<Arc<AppConfig>, StoreError> {
    config.validate()?;

    let config = Arc::new(config);
    SETTINGS
        .set(config.clone())
        .map_err(|_| StoreError::configuration("settings are already initialized"))?;

    Ok(config)
}

/// Returns the process settings, loading them on first access
pub fn settings() -> Result<Arc<AppConfig>, StoreError> {
    SETTINGS
        .get_or_try_init(|| AppConfig::load().map(Arc::new))
        .cloned()
}
