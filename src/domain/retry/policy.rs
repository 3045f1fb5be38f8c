//! Retry policy with capped exponential backoff

use std::time::Duration;

use crate::domain::StoreError;

/// Bounded-attempt retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included
    pub max_attempts: u32,
    /// Wait after the first failed attempt
    pub base_delay: Duration,
    /// Ceiling for any single wait
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.max_attempts == 0 {
            return Err(StoreError::configuration(
                "max_retries must be greater than 0",
            ));
        }

        if self.base_delay.is_zero() {
            return Err(StoreError::configuration(
                "retry_delay must be greater than 0",
            ));
        }

        if self.max_delay < self.base_delay {
            return Err(StoreError::configuration(format!(
                "retry_max_delay ({:?}) must not be below retry_delay ({:?})",
                self.max_delay, self.base_delay
            )));
        }

        Ok(())
    }

    /// Wait that follows failed attempt `attempt` (1-indexed):
    /// `min(max_delay, base_delay * 2^(attempt - 1))`
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);

        2u32.checked_pow(exponent)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Attempts granted to an operation; non-idempotent work runs once
    pub fn attempts_for(&self, idempotent: bool) -> u32 {
        if idempotent { self.max_attempts } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(10));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_delay_doubles_then_caps() {
        let policy = RetryPolicy::new(8)
            .with_base_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(10));

        assert_eq!(policy.delay_after_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after_attempt(4), Duration::from_secs(8));
        assert_eq!(policy.delay_after_attempt(5), Duration::from_secs(10)); // Capped
        assert_eq!(policy.delay_after_attempt(64), Duration::from_secs(10));
    }

    #[test]
    fn test_fractional_base_delay() {
        let policy = RetryPolicy::default().with_base_delay(Duration::from_millis(250));

        assert_eq!(policy.delay_after_attempt(1), Duration::from_millis(250));
        assert_eq!(policy.delay_after_attempt(3), Duration::from_millis(1000));
    }

    #[test]
    fn test_non_idempotent_collapses_to_single_attempt() {
        let policy = RetryPolicy::new(5);

        assert_eq!(policy.attempts_for(true), 5);
        assert_eq!(policy.attempts_for(false), 1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(RetryPolicy::new(0).validate().is_err());
        assert!(
            RetryPolicy::default()
                .with_base_delay(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            RetryPolicy::default()
                .with_base_delay(Duration::from_secs(5))
                .with_max_delay(Duration::from_secs(2))
                .validate()
                .is_err()
        );
    }
}
