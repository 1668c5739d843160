//! Retrying connect.

use crate::endpoint::Endpoint;
use crate::error::{ConnectError, ConnectionExhaustedError};
use crate::events::HandleEvent;
use crate::handle::Handle;
use crate::state::HandleState;
use holdfast_core::events::{EventListener, EventListeners};
use holdfast_core::sleep::Sleeper;
use holdfast_retry::{Retrier, RetrierBuilder, RetryError, RetryEvent, RetryPolicy};
#[cfg(feature = "metrics")]
use metrics::counter;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Opens a handle's connection, backing off exponentially between failed
/// attempts.
///
/// With the default policy the waits are 2 s, 4 s, 8 s and 16 s, so a
/// connect that never succeeds gives up after five attempts and 30 s.
pub struct Connector<E: Endpoint> {
    retrier: Retrier<E::Error>,
}

impl<E: Endpoint> Connector<E> {
    /// Creates a connector with the default connection policy.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder starting from the default connection policy.
    pub fn builder() -> ConnectorBuilder<E> {
        ConnectorBuilder::new()
    }

    /// The policy driving connection attempts.
    pub fn policy(&self) -> &RetryPolicy<E::Error> {
        self.retrier.policy()
    }

    /// Opens the handle's connection.
    ///
    /// A handle that is already connected is left alone. A handle that is
    /// closed or shutting down is refused without an attempt, and a connect
    /// overtaken by shutdown stops before its next attempt.
    pub async fn connect(&self, handle: &Handle<E>) -> Result<(), ConnectError<E::Error>> {
        if !handle.is_accepting() {
            return Err(Self::refused(handle));
        }
        if handle.state() == HandleState::Connected {
            return Ok(());
        }

        let mut last_attempt = 0;
        let result = self
            .retrier
            .run(|attempt| {
                last_attempt = attempt;

                async move {
                    let Some(_entered) = handle.enter().await else {
                        return Ok(false);
                    };

                    #[cfg(feature = "tracing")]
                    if handle.is_verbose() {
                        tracing::debug!(
                            handle = %handle.name(),
                            target = %handle.config().target,
                            attempt,
                            "opening connection"
                        );
                    }
                    #[cfg(not(feature = "tracing"))]
                    let _ = attempt;

                    handle.endpoint().open().await.map(|()| true)
                }
            })
            .await;

        match result {
            Ok(true) => {
                handle.transition(HandleState::Connected);
                // Shutdown may have started once the attempt let go of the
                // gate; it closes what was just opened.
                if !handle.is_accepting() {
                    return Err(Self::refused(handle));
                }

                handle.emit(HandleEvent::Connected {
                    source: handle.name().to_string(),
                    timestamp: Instant::now(),
                    attempts: last_attempt,
                });

                #[cfg(feature = "tracing")]
                tracing::info!(handle = %handle.name(), attempts = last_attempt, "connected");

                #[cfg(feature = "metrics")]
                counter!("holdfast_connects_total", "handle" => handle.name().to_string(), "outcome" => "connected")
                    .increment(1);

                Ok(())
            }
            Ok(false) => Err(Self::refused(handle)),
            Err(err) => {
                handle.transition(HandleState::Failed);
                handle.emit(HandleEvent::ConnectFailed {
                    source: handle.name().to_string(),
                    timestamp: Instant::now(),
                    attempts: err.attempts(),
                    cause: err.cause().to_string(),
                });

                #[cfg(feature = "metrics")]
                counter!("holdfast_connects_total", "handle" => handle.name().to_string(), "outcome" => "failed")
                    .increment(1);

                Err(match err {
                    RetryError::Exhausted { attempts, source } => {
                        ConnectionExhaustedError { attempts, source }.into()
                    }
                    RetryError::NotRetried { attempt, source } => {
                        ConnectError::NotRetryable { attempt, source }
                    }
                })
            }
        }
    }

    fn refused(handle: &Handle<E>) -> ConnectError<E::Error> {
        #[cfg(feature = "tracing")]
        tracing::warn!(handle = %handle.name(), "connect refused, handle is shutting down");

        #[cfg(feature = "metrics")]
        counter!("holdfast_connects_total", "handle" => handle.name().to_string(), "outcome" => "closed")
            .increment(1);

        #[cfg(not(any(feature = "tracing", feature = "metrics")))]
        let _ = handle;

        ConnectError::Closed
    }
}

impl<E: Endpoint> Default for Connector<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Endpoint> Clone for Connector<E> {
    fn clone(&self) -> Self {
        Self {
            retrier: self.retrier.clone(),
        }
    }
}

impl<E: Endpoint> fmt::Debug for Connector<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("retrier", &self.retrier)
            .finish()
    }
}

/// Builder for [`Connector`].
pub struct ConnectorBuilder<E: Endpoint> {
    inner: RetrierBuilder<E::Error>,
}

impl<E: Endpoint> ConnectorBuilder<E> {
    fn new() -> Self {
        Self {
            inner: Retrier::builder(RetryPolicy::connection()).name("connect"),
        }
    }

    /// Replaces the connection policy.
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

    /// Builds the connector.
    pub fn build(self) -> Connector<E> {
        Connector {
            retrier: self.inner.build(),
        }
    }
}
