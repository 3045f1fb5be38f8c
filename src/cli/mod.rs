//! Command-line interface for the knowledge store
//!
//! Subcommands:
//! - `check`: connect, probe and print collection counts
//! - `get` / `delete`: single knowledge unit access
//! - `list`: knowledge units of one domain

pub mod check;
pub mod units;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use tracing::warn;

use crate::config::{self, AppConfig, StoreBackend};
use crate::infrastructure::connection::ConnectionManager;
use crate::infrastructure::logging;
use crate::infrastructure::services::KnowledgeUnitService;

/// ACDKN knowledge store - inspect and maintain stored knowledge units
#[derive(Parser)]
#[command(name = "acdkn")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Settings file; defaults to config/default and config/local plus ACDKN_* variables
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Connect to the store and report collection sizes
    Check,

    /// Print one knowledge unit as JSON
    Get { id: String },

    /// Delete one knowledge unit
    Delete { id: String },

    /// List the knowledge units of a domain
    List {
        #[arg(long)]
        domain: String,
    },
}

/// Settings, connection and service shared by every subcommand
pub struct Session {
    pub config: Arc<AppConfig>,
    pub connection: Arc<ConnectionManager>,
    pub units: KnowledgeUnitService,
}

/// Loads settings, installs logging and opens the shared connection
pub async fn bootstrap(config_path: Option<&Path>) -> anyhow::Result<Session> {
    dotenvy::dotenv().ok();

    let loaded = match config_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
    .context("Failed to load settings")?;

    let config = config::install(loaded)?;
    logging::init_logging(&config.logging);

    if let Some(notice) = backend_notice(&config) {
        warn!("{}", notice);
    }

    let connection = ConnectionManager::get_instance()
        .await
        .context("Failed to connect to the knowledge store")?;
    let units = KnowledgeUnitService::new(&connection, config.clone())?;

    Ok(Session {
        config,
        connection,
        units,
    })
}

/// Warning for backends whose data does not outlive the process
pub fn backend_notice(config: &AppConfig) -> Option<&'static str> {
    match config.store_backend {
        StoreBackend::Memory => Some(
            "store_backend is 'memory': every acdkn run starts with an empty store; \
             set store_backend = \"postgres\" to work with persisted knowledge units",
        ),
        StoreBackend::Postgres => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_is_flagged() {
        let mut config = AppConfig::new("acdkn-test", "credentials.json");

        let notice = backend_notice(&config).unwrap();
        assert!(notice.contains("empty store"));

        config.store_backend = StoreBackend::Postgres;
        assert!(backend_notice(&config).is_none());
    }

    #[test]
    fn test_cli_parses_global_config_flag() {
        let cli = Cli::try_parse_from([
            "acdkn", "list", "--domain", "finance", "--config", "acdkn.toml",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some(Path::new("acdkn.toml")));
        assert!(matches!(cli.command, Command::List { domain } if domain == "finance"));
    }
}
