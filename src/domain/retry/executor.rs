//! Resilient operation executor - bounded retry with exponential backoff

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::RetryPolicy;
use crate::domain::StoreError;
use crate::domain::store::Collection;

/// Per-call execution options
#[derive(Debug, Clone)]
pub struct OperationOptions {
    /// Label used in log records
    pub label: String,
    /// Whether repeating the operation is safe
    pub idempotent: bool,
    /// Checked before each backoff sleep
    pub cancellation: Option<CancellationToken>,
}

impl OperationOptions {
    /// Options for an operation that may be repeated safely
    pub fn idempotent(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            idempotent: true,
            cancellation: None,
        }
    }

    /// Options for an operation that must run at most once
    pub fn non_idempotent(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            idempotent: false,
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Runs single remote operations under a [`RetryPolicy`]
///
/// Holds no shared mutable state; one executor can serve any number of
/// concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct ResilientExecutor {
    policy: RetryPolicy,
}

impl ResilientExecutor {
    pub fn new(policy: RetryPolicy) -> Result<Self, StoreError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Executes a unit of work against a collection handle
    pub async fn run_on<T, F, Fut>(
        &self,
        collection: &Collection,
        options: &OperationOptions,
        mut operation: F,
    ) -> Result<T, StoreError>
    where
        F: FnMut(Collection) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        self.execute(options, || operation(collection.clone())).await
    }

    /// Executes an operation, retrying only transient failures
    pub async fn execute<T, F, Fut>(
        &self,
        options: &OperationOptions,
        mut operation: F,
    ) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let max_attempts = self.policy.attempts_for(options.idempotent);
        let mut attempt = 1;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        warn!(
                            operation = %options.label,
                            attempts = attempt,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                warn!(
                    operation = %options.label,
                    attempt,
                    error = %error,
                    "Operation failed with non-retryable error"
                );
                return Err(error);
            }

            if attempt >= max_attempts {
                let exhausted = StoreError::exhausted(attempt, error);
                error!(
                    operation = %options.label,
                    attempts = attempt,
                    idempotent = options.idempotent,
                    cause = %exhausted.chain(),
                    "Operation exhausted its retry budget"
                );
                return Err(exhausted);
            }

            let delay = self.policy.delay_after_attempt(attempt);
            debug!(
                operation = %options.label,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient failure, backing off"
            );

            match &options.cancellation {
                Some(token) => {
                    if token.is_cancelled() {
                        return Err(self.cancelled(options, attempt));
                    }

                    tokio::select! {
                        _ = token.cancelled() => return Err(self.cancelled(options, attempt)),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }

            attempt += 1;
        }
    }

    fn cancelled(&self, options: &OperationOptions, attempt: u32) -> StoreError {
        warn!(
            operation = %options.label,
            attempts = attempt,
            "Retry sequence cancelled by caller"
        );
        StoreError::cancelled(format!(
            "'{}' abandoned after {} attempt(s)",
            options.label, attempt
        ))
    }
}
