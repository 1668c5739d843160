use crate::backoff::{Backoff, ExponentialBackoff, FixedBackoff, JitteredBackoff, LinearBackoff};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether an error is worth another attempt.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Default attempt cap for connection policies.
pub const CONNECTION_MAX_ATTEMPTS: u32 = 5;
/// Default first delay for connection policies.
pub const CONNECTION_INITIAL_DELAY: Duration = Duration::from_secs(2);
/// Default attempt cap for operation policies.
pub const OPERATION_MAX_ATTEMPTS: u32 = 3;
/// Default delay unit for operation policies.
pub const OPERATION_DELAY_UNIT: Duration = Duration::from_secs(1);

/// Errors raised while building a [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    /// `max_attempts` was zero.
    #[error("max_attempts must be at least 1 (got {0})")]
    InvalidMaxAttempts(u32),

    /// The jitter factor was outside `0.0..=1.0`.
    #[error("jitter factor must be within 0.0..=1.0 (got {0})")]
    InvalidJitter(f64),
}

/// Immutable retry configuration: an attempt cap, a backoff function, and
/// an optional filter for retryable errors.
///
/// `max_attempts` counts every attempt, including the first, so a policy
/// with `max_attempts = 3` performs at most two retries and at most two
/// waits.
pub struct RetryPolicy<E> {
    max_attempts: u32,
    backoff: Arc<dyn Backoff>,
    retry_predicate: Option<RetryPredicate<E>>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: Arc::clone(&self.backoff),
            retry_predicate: self.retry_predicate.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("filtered", &self.retry_predicate.is_some())
            .finish()
    }
}

impl<E> RetryPolicy<E> {
    /// Creates a new builder.
    pub fn builder() -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::new()
    }

    /// Connection policy: 5 attempts, exponential backoff of `2^n` seconds.
    pub fn connection() -> Self {
        Self {
            max_attempts: CONNECTION_MAX_ATTEMPTS,
            backoff: Arc::new(ExponentialBackoff::new(CONNECTION_INITIAL_DELAY)),
            retry_predicate: None,
        }
    }

    /// Operation policy: 3 attempts, linear backoff of `n` seconds.
    pub fn operation() -> Self {
        Self {
            max_attempts: OPERATION_MAX_ATTEMPTS,
            backoff: Arc::new(LinearBackoff::new(OPERATION_DELAY_UNIT)),
            retry_predicate: None,
        }
    }

    /// Returns a copy of this policy with a different attempt cap.
    pub fn with_max_attempts(&self, max_attempts: u32) -> Result<Self, PolicyError> {
        if max_attempts == 0 {
            return Err(PolicyError::InvalidMaxAttempts(max_attempts));
        }
        let mut policy = self.clone();
        policy.max_attempts = max_attempts;
        Ok(policy)
    }

    /// Total number of attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `retry` (1-indexed).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff.delay(retry)
    }

    /// Returns true if `error` may be retried. Without a predicate every
    /// error is retryable.
    pub fn should_retry(&self, error: &E) -> bool {
        match &self.retry_predicate {
            Some(predicate) => predicate(error),
            None => true,
        }
    }

    /// Worst-case time spent waiting when every attempt fails.
    pub fn worst_case_wait(&self) -> Duration {
        (1..self.max_attempts)
            .map(|retry| self.delay_for(retry))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

impl<E> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self::operation()
    }
}

/// Builder for [`RetryPolicy`].
pub struct RetryPolicyBuilder<E> {
    max_attempts: u32,
    backoff: Option<Arc<dyn Backoff>>,
    jitter: Option<f64>,
    retry_predicate: Option<RetryPredicate<E>>,
}

impl<E> Default for RetryPolicyBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RetryPolicyBuilder<E> {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - max_attempts: 3
    /// - backoff: linear with a 1 second unit
    /// - jitter: none
    /// - every error is retried
    pub fn new() -> Self {
        Self {
            max_attempts: OPERATION_MAX_ATTEMPTS,
            backoff: None,
            jitter: None,
            retry_predicate: None,
        }
    }

    /// Sets the total number of attempts, including the first.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Waits the same duration before every retry.
    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.backoff = Some(Arc::new(FixedBackoff::new(delay)));
        self
    }

    /// Waits `n * unit` before retry `n`.
    pub fn linear_backoff(mut self, unit: Duration) -> Self {
        self.backoff = Some(Arc::new(LinearBackoff::new(unit)));
        self
    }

    /// Waits `initial * 2^(n-1)` before retry `n`.
    pub fn exponential_backoff(mut self, initial: Duration) -> Self {
        self.backoff = Some(Arc::new(ExponentialBackoff::new(initial)));
        self
    }

    /// Uses a custom backoff function.
    pub fn backoff<B>(mut self, backoff: B) -> Self
    where
        B: Backoff + 'static,
    {
        self.backoff = Some(Arc::new(backoff));
        self
    }

    /// Randomizes every delay by up to `factor` in either direction.
    pub fn jitter(mut self, factor: f64) -> Self {
        self.jitter = Some(factor);
        self
    }

    /// Only errors for which `predicate` returns true are retried; any other
    /// error ends the call on its first occurrence.
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Validates and builds the policy.
    pub fn build(self) -> Result<RetryPolicy<E>, PolicyError> {
        if self.max_attempts == 0 {
            return Err(PolicyError::InvalidMaxAttempts(self.max_attempts));
        }

        let backoff = self
            .backoff
            .unwrap_or_else(|| Arc::new(LinearBackoff::new(OPERATION_DELAY_UNIT)));

        let backoff: Arc<dyn Backoff> = match self.jitter {
            None => backoff,
            Some(factor) if (0.0..=1.0).contains(&factor) => {
                Arc::new(JitteredBackoff::new(backoff, factor))
            }
            Some(factor) => return Err(PolicyError::InvalidJitter(factor)),
        };

        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            backoff,
            retry_predicate: self.retry_predicate,
        })
    }
}
