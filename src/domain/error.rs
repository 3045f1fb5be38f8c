use std::error::Error as StdError;

use thiserror::Error;

type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

/// Errors surfaced by the store access layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxedCause>,
    },

    /// Temporary unavailability or throttling reported by the store
    #[error("Transient store error: {message}")]
    Transient { message: String },

    #[error("Operation failed after {attempts} attempt(s): {source}")]
    OperationExhausted {
        attempts: u32,
        #[source]
        source: Box<StoreError>,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Permission denied: {message}")]
    Permission { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Operation cancelled: {message}")]
    Cancelled { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl StoreError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Connection failure that keeps the underlying cause for diagnostics
    pub fn connection_caused_by(
        message: impl Into<String>,
        cause: impl Into<BoxedCause>,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(cause.into()),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn exhausted(attempts: u32, last: StoreError) -> Self {
        Self::OperationExhausted {
            attempts,
            source: Box::new(last),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Only transient store failures are eligible for retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Renders the error and every nested cause, outermost first
    pub fn chain(&self) -> String {
        let mut rendered = self.to_string();
        let mut cause = self.source();

        while let Some(inner) = cause {
            rendered.push_str(" <- ");
            rendered.push_str(&inner.to_string());
            cause = inner.source();
        }

        rendered
    }
}
