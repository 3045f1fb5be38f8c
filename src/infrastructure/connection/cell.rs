//! Single-flight cell guarding connection initialization

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::OnceCell;
use tracing::error;

use super::manager::ConnectionManager;
use crate::config::AppConfig;
use crate::domain::StoreError;
use crate::infrastructure::store::StoreConnector;

/// Cell backing [`ConnectionManager::get_instance`]
pub(super) static GLOBAL_CONNECTION: ConnectionCell = ConnectionCell::new();

/// Lifecycle of the shared connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    /// Last attempt failed; the next call retries
    Failed,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Initializing,
            2 => Self::Ready,
            3 => Self::Failed,
            _ => Self::Uninitialized,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::Initializing => 1,
            Self::Ready => 2,
            Self::Failed => 3,
        }
    }
}

/// Lazily initialized connection shared by every caller
#[derive(Debug)]
pub struct ConnectionCell {
    cell: OnceCell<Arc<ConnectionManager>>,
    state: AtomicU8,
}

impl Default for ConnectionCell {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
            state: AtomicU8::new(0),
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// The manager, if initialization already succeeded
    pub fn get(&self) -> Option<Arc<ConnectionManager>> {
        self.cell.get().cloned()
    }

    /// Returns the shared manager, running initialization at most once at a time
    pub async fn get_or_init(
        &self,
        config: &AppConfig,
        connector: &dyn StoreConnector,
    ) -> Result<Arc<ConnectionManager>, StoreError> {
        if let Some(manager) = self.cell.get() {
            return Ok(manager.clone());
        }

        self.cell
            .get_or_try_init(|| async {
                self.set_state(ConnectionState::Initializing);

                match ConnectionManager::initialize(config, connector).await {
                    Ok(manager) => {
                        self.set_state(ConnectionState::Ready);
                        Ok(Arc::new(manager))
                    }
                    Err(e) => {
                        self.set_state(ConnectionState::Failed);
                        error!(cause = %e.chain(), "Store connection initialization failed");
                        Err(e)
                    }
                }
            })
            .await
            .cloned()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}
