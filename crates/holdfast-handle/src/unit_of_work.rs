//! Retried units of work.

use crate::endpoint::{Endpoint, Work};
use crate::error::OperationError;
use crate::events::HandleEvent;
use crate::handle::Handle;
use futures::future::BoxFuture;
use holdfast_core::events::{EventListener, EventListeners};
use holdfast_core::sleep::Sleeper;
use holdfast_retry::{Retrier, RetrierBuilder, RetryError, RetryEvent, RetryPolicy};
#[cfg(feature = "metrics")]
use metrics::counter;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs operations against a handle, retrying failures with linear backoff.
///
/// Each attempt goes through [`Endpoint::unit_of_work`], so an endpoint
/// with native transactions rolls a failed attempt back before the next
/// one starts. Beyond that the executor only calls the operation again:
/// operations must be safe to repeat.
///
/// With the default policy the waits are 1 s and 2 s across three attempts.
pub struct UnitOfWork<E: Endpoint> {
    retrier: Retrier<E::Error>,
}

impl<E: Endpoint> UnitOfWork<E> {
    /// Creates an executor with the default operation policy.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder starting from the default operation policy.
    pub fn builder() -> UnitOfWorkBuilder<E> {
        UnitOfWorkBuilder::new()
    }

    /// The policy driving operation attempts.
    pub fn policy(&self) -> &RetryPolicy<E::Error> {
        self.retrier.policy()
    }

    /// Runs `op` against the handle's endpoint until it succeeds or the
    /// policy gives up.
    ///
    /// Refuses to start once shutdown has begun. A call that is backing off
    /// when shutdown begins runs no further attempt and fails with
    /// [`OperationError::ShuttingDown`]; an attempt already running is
    /// allowed to finish before the endpoint is released.
    pub async fn run_with_retry<T, F>(
        &self,
        handle: &Handle<E>,
        op: F,
    ) -> Result<T, OperationError<E::Error>>
    where
        T: Send,
        F: for<'h> Fn(&'h E) -> BoxFuture<'h, Result<T, E::Error>> + Send + Sync,
    {
        if !handle.is_accepting() {
            return Err(Self::refused(handle));
        }

        let op = &op;
        let result = self
            .retrier
            .run(|attempt| async move {
                let Some(_entered) = handle.enter().await else {
                    return Ok(None);
                };

                #[cfg(feature = "tracing")]
                if handle.is_verbose() {
                    tracing::debug!(handle = %handle.name(), attempt, "running unit of work");
                }
                #[cfg(not(feature = "tracing"))]
                let _ = attempt;

                let work: Work<'_, E, T> = Box::new(move |endpoint| op(endpoint));
                handle.endpoint().unit_of_work(work).await.map(Some)
            })
            .await;

        match result {
            Ok(Some(value)) => {
                #[cfg(feature = "metrics")]
                counter!("holdfast_operations_total", "handle" => handle.name().to_string(), "outcome" => "success")
                    .increment(1);

                Ok(value)
            }
            Ok(None) => Err(Self::refused(handle)),
            Err(err) => {
                handle.emit(HandleEvent::OperationFailed {
                    source: handle.name().to_string(),
                    timestamp: Instant::now(),
                    attempts: err.attempts(),
                    cause: err.cause().to_string(),
                });

                #[cfg(feature = "metrics")]
                counter!("holdfast_operations_total", "handle" => handle.name().to_string(), "outcome" => "failed")
                    .increment(1);

                Err(match err {
                    RetryError::Exhausted { attempts, source } => {
                        OperationError::Exhausted { attempts, source }
                    }
                    RetryError::NotRetried { attempt, source } => {
                        OperationError::NotRetryable { attempt, source }
                    }
                })
            }
        }
    }

    fn refused(handle: &Handle<E>) -> OperationError<E::Error> {
        handle.emit(HandleEvent::OperationRejected {
            source: handle.name().to_string(),
            timestamp: Instant::now(),
        });

        #[cfg(feature = "tracing")]
        tracing::warn!(handle = %handle.name(), "operation refused, handle is shutting down");

        #[cfg(feature = "metrics")]
        counter!("holdfast_operations_total", "handle" => handle.name().to_string(), "outcome" => "rejected")
            .increment(1);

        OperationError::ShuttingDown
    }
}

impl<E: Endpoint> Default for UnitOfWork<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Endpoint> Clone for UnitOfWork<E> {
    fn clone(&self) -> Self {
        Self {
            retrier: self.retrier.clone(),
        }
    }
}

impl<E: Endpoint> fmt::Debug for UnitOfWork<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("retrier", &self.retrier)
            .finish()
    }
}

/// Builder for [`UnitOfWork`].
pub struct UnitOfWorkBuilder<E: Endpoint> {
    inner: RetrierBuilder<E::Error>,
}

impl<E: Endpoint> UnitOfWorkBuilder<E> {
    fn new() -> Self {
        Self {
            inner: Retrier::builder(RetryPolicy::operation()).name("unit_of_work"),
        }
    }

    /// Replaces the operation policy.
    pub fn policy(mut self, policy: RetryPolicy<E::Error>) -> Self {
        self.inner = self.inner.policy(policy);
        self
    }

    /// Sets the name used for retry events and metric labels.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.inner = self.inner.name(name);
        self
    }

    /// Replaces the sleeper used for backoff waits.
    pub fn sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.inner = self.inner.sleeper(sleeper);
        self
    }

    /// Replaces the sleeper with an already shared one.
    pub fn shared_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.inner = self.inner.shared_sleeper(sleeper);
        self
    }

    /// Registers a listener for every retry event.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<RetryEvent> + 'static,
    {
        self.inner = self.inner.listener(listener);
        self
    }

    /// Appends every listener from an existing collection.
    pub fn listeners(mut self, listeners: &EventListeners<RetryEvent>) -> Self {
        self.inner = self.inner.listeners(listeners);
        self
    }

    /// Registers a callback invoked after each failed attempt that will be
    /// retried.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.inner = self.inner.on_retry(f);
        self
    }

    /// Builds the executor.
    pub fn build(self) -> UnitOfWork<E> {
        UnitOfWork {
            retrier: self.inner.build(),
        }
    }
}
