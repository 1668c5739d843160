use crate::events::RetryEvent;
use crate::policy::RetryPolicy;
use holdfast_core::events::{EventListener, EventListeners, FnListener};
use holdfast_core::sleep::{Sleeper, TokioSleeper};
#[cfg(feature = "metrics")]
use metrics::counter;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Terminal failure of a retried call.
///
/// Both variants carry the last underlying error untouched.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Every permitted attempt failed.
    #[error("gave up after {attempts} attempt(s): {source}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Error returned by the last attempt.
        source: E,
    },

    /// An attempt failed with an error the policy does not retry.
    #[error("attempt {attempt} failed with a non-retryable error: {source}")]
    NotRetried {
        /// The attempt that failed.
        attempt: u32,
        /// Error returned by that attempt.
        source: E,
    },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::NotRetried { attempt, .. } => *attempt,
        }
    }

    /// Returns true if the policy's attempt cap was reached.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// Borrows the last underlying error.
    pub fn cause(&self) -> &E {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::NotRetried { source, .. } => source,
        }
    }

    /// Returns the last underlying error unchanged.
    pub fn into_cause(self) -> E {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::NotRetried { source, .. } => source,
        }
    }
}

/// Runs an async operation under a [`RetryPolicy`].
///
/// Attempts are strictly sequential: attempt `n + 1` starts only after
/// attempt `n` failed and its backoff wait completed. Every failure is
/// reported to the listeners before the wait starts.
pub struct Retrier<E> {
    policy: RetryPolicy<E>,
    name: String,
    sleeper: Arc<dyn Sleeper>,
    listeners: EventListeners<RetryEvent>,
}

impl<E> Clone for Retrier<E> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            name: self.name.clone(),
            sleeper: Arc::clone(&self.sleeper),
            listeners: self.listeners.clone(),
        }
    }
}

impl<E> fmt::Debug for Retrier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrier")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E> Retrier<E> {
    /// Creates a retrier with the tokio sleeper and no listeners.
    pub fn new(policy: RetryPolicy<E>) -> Self {
        Self::builder(policy).build()
    }

    /// Creates a builder around `policy`.
    pub fn builder(policy: RetryPolicy<E>) -> RetrierBuilder<E> {
        RetrierBuilder::new(policy)
    }

    /// The policy driving this retrier.
    pub fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }

    /// The name used in events, logs, and metric labels.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs `attempt_fn` until it succeeds, fails with a non-retryable
    /// error, or the policy's attempt cap is reached.
    ///
    /// `attempt_fn` receives the 1-indexed attempt number.
    pub async fn run<T, F, Fut>(&self, mut attempt_fn: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempt: u32 = 1;

        loop {
            match attempt_fn(attempt).await {
                Ok(value) => {
                    self.record_success(attempt);
                    return Ok(value);
                }
                Err(error) => {
                    if !self.policy.should_retry(&error) {
                        self.record_not_retried(attempt, &error);
                        return Err(RetryError::NotRetried {
                            attempt,
                            source: error,
                        });
                    }

                    if attempt >= self.policy.max_attempts() {
                        self.record_exhausted(attempt, &error);
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            source: error,
                        });
                    }

                    let delay = self.policy.delay_for(attempt);
                    self.record_retry(attempt, delay, &error);

                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn record_success(&self, attempts: u32) {
        #[cfg(feature = "tracing")]
        if attempts > 1 {
            tracing::info!(retry = %self.name, attempts, "succeeded after retrying");
        }

        self.listeners.emit(&RetryEvent::Success {
            source: self.name.clone(),
            timestamp: Instant::now(),
            attempts,
        });

        #[cfg(feature = "metrics")]
        counter!("holdfast_retry_calls_total", "retry" => self.name.clone(), "outcome" => "success")
            .increment(1);
    }

    fn record_retry(&self, attempt: u32, delay: Duration, error: &E)
    where
        E: fmt::Display,
    {
        self.listeners.emit(&RetryEvent::Retry {
            source: self.name.clone(),
            timestamp: Instant::now(),
            attempt,
            delay,
            cause: error.to_string(),
        });

        #[cfg(feature = "tracing")]
        tracing::warn!(
            retry = %self.name,
            attempt,
            max_attempts = self.policy.max_attempts(),
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "attempt failed, backing off"
        );

        #[cfg(feature = "metrics")]
        counter!("holdfast_retry_attempts_total", "retry" => self.name.clone()).increment(1);
    }

    fn record_exhausted(&self, attempts: u32, error: &E)
    where
        E: fmt::Display,
    {
        self.listeners.emit(&RetryEvent::Exhausted {
            source: self.name.clone(),
            timestamp: Instant::now(),
            attempts,
            cause: error.to_string(),
        });

        #[cfg(feature = "tracing")]
        tracing::error!(retry = %self.name, attempts, error = %error, "retries exhausted");

        #[cfg(feature = "metrics")]
        counter!("holdfast_retry_calls_total", "retry" => self.name.clone(), "outcome" => "exhausted")
            .increment(1);
    }

    fn record_not_retried(&self, attempt: u32, error: &E)
    where
        E: fmt::Display,
    {
        self.listeners.emit(&RetryEvent::NotRetried {
            source: self.name.clone(),
            timestamp: Instant::now(),
            attempt,
            cause: error.to_string(),
        });

        #[cfg(feature = "tracing")]
        tracing::warn!(retry = %self.name, attempt, error = %error, "error is not retryable");

        #[cfg(feature = "metrics")]
        counter!("holdfast_retry_calls_total", "retry" => self.name.clone(), "outcome" => "not_retried")
            .increment(1);
    }
}

/// Builder for [`Retrier`].
pub struct RetrierBuilder<E> {
    policy: RetryPolicy<E>,
    name: String,
    sleeper: Arc<dyn Sleeper>,
    listeners: EventListeners<RetryEvent>,
}

impl<E> RetrierBuilder<E> {
    fn new(policy: RetryPolicy<E>) -> Self {
        Self {
            policy,
            name: "<unnamed>".to_string(),
            sleeper: Arc::new(TokioSleeper),
            listeners: EventListeners::new(),
        }
    }

    /// Replaces the policy.
    pub fn policy(mut self, policy: RetryPolicy<E>) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the name used in events, logs, and metric labels.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the sleeper used for backoff waits.
    pub fn sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Replaces the sleeper with an already shared one.
    pub fn shared_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Registers a listener for every retry event.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<RetryEvent> + 'static,
    {
        self.listeners.add(listener);
        self
    }

    /// Appends every listener from an existing collection.
    pub fn listeners(mut self, listeners: &EventListeners<RetryEvent>) -> Self {
        for listener in listeners.iter() {
            self.listeners.add_shared(Arc::clone(listener));
        }
        self
    }

    /// Registers a callback invoked after each failed attempt that will be
    /// retried, with the failed attempt number and the upcoming delay.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked on success with the number of attempts
    /// it took.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when every attempt failed.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Builds the retrier.
    pub fn build(self) -> Retrier<E> {
        Retrier {
            policy: self.policy,
            name: self.name,
            sleeper: self.sleeper,
            listeners: self.listeners,
        }
    }
}
