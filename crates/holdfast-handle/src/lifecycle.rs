//! Shutdown and termination signal handling.
//!
//! [`Lifecycle::shutdown`] is the only path that closes a handle. It is
//! idempotent: the first call releases the handle, later calls observe it
//! closed. [`Lifecycle::register_shutdown_hook`] wires it to SIGINT and
//! SIGTERM; nothing is registered until the composition root asks for it.

use crate::endpoint::Endpoint;
use crate::error::ShutdownFailure;
use crate::events::HandleEvent;
use crate::handle::HandleCache;
use crate::state::HandleState;
#[cfg(feature = "metrics")]
use metrics::counter;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Exit code passed to the exit function once shutdown completes.
pub const EXIT_CODE: i32 = 0;

/// What a call to [`Lifecycle::shutdown`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// No handle had been built; nothing to release.
    NoHandle,
    /// The handle was released by this call.
    Released,
    /// The handle was already closed.
    AlreadyClosed,
}

impl ShutdownOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            ShutdownOutcome::NoHandle => "no_handle",
            ShutdownOutcome::Released => "released",
            ShutdownOutcome::AlreadyClosed => "already_closed",
        }
    }
}

/// A termination signal delivered by the process supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => f.write_str("SIGINT"),
            Signal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Waits for SIGINT or SIGTERM. Only Ctrl-C is watched on non-unix targets.
///
/// A signal source that cannot be installed is logged and never fires.
pub async fn wait_for_signal() -> Signal {
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Signal::Interrupt,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_err, "failed to install Ctrl-C handler");
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => match stream.recv().await {
                Some(()) => Signal::Terminate,
                None => std::future::pending().await,
            },
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_err, "failed to install SIGTERM handler");
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Signal>();

    tokio::select! {
        signal = interrupt => signal,
        signal = terminate => signal,
    }
}

/// Releases the cached handle at process end.
pub struct Lifecycle<E: Endpoint> {
    cache: Arc<HandleCache<E>>,
}

impl<E: Endpoint> Lifecycle<E> {
    /// Creates the lifecycle for `cache`.
    pub fn new(cache: Arc<HandleCache<E>>) -> Self {
        Self { cache }
    }

    /// The cache whose handle this lifecycle releases.
    pub fn cache(&self) -> &Arc<HandleCache<E>> {
        &self.cache
    }

    /// Returns true once shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.cache.is_sealed()
    }

    /// Releases the handle if one was built.
    ///
    /// New operations and connect attempts are refused from the moment this
    /// is called. An attempt already running against the endpoint finishes
    /// first; a retry waiting out its backoff is abandoned. The endpoint's
    /// close is awaited; if it fails the handle is still marked
    /// closed and the failure is returned for reporting. Concurrent and
    /// repeated calls release the handle at most once.
    pub async fn shutdown(&self) -> Result<ShutdownOutcome, ShutdownFailure<E::Error>> {
        self.cache.seal();

        let Some(handle) = self.cache.peek() else {
            #[cfg(feature = "tracing")]
            tracing::info!(handle = %self.cache.config().name, "shutdown: no handle to release");
            self.record_outcome(ShutdownOutcome::NoHandle.as_str());
            return Ok(ShutdownOutcome::NoHandle);
        };

        handle.stop_accepting();
        let _release = handle.exclusive().await;

        if handle.state() == HandleState::Closed {
            #[cfg(feature = "tracing")]
            tracing::debug!(handle = %handle.name(), "shutdown: handle already closed");
            self.record_outcome(ShutdownOutcome::AlreadyClosed.as_str());
            return Ok(ShutdownOutcome::AlreadyClosed);
        }

        #[cfg(feature = "tracing")]
        tracing::info!(handle = %handle.name(), "shutdown: releasing handle");

        handle.emit(HandleEvent::ShutdownStarted {
            source: handle.name().to_string(),
            timestamp: Instant::now(),
        });

        let closed = handle.endpoint().close().await;
        handle.transition(HandleState::Closed);

        match closed {
            Ok(()) => {
                handle.emit(HandleEvent::Released {
                    source: handle.name().to_string(),
                    timestamp: Instant::now(),
                });

                #[cfg(feature = "tracing")]
                tracing::info!(handle = %handle.name(), "shutdown: handle released");

                self.record_outcome(ShutdownOutcome::Released.as_str());
                Ok(ShutdownOutcome::Released)
            }
            Err(source) => {
                handle.emit(HandleEvent::ReleaseFailed {
                    source: handle.name().to_string(),
                    timestamp: Instant::now(),
                    cause: source.to_string(),
                });

                #[cfg(feature = "tracing")]
                tracing::error!(handle = %handle.name(), error = %source, "shutdown: failed to release handle");

                self.record_outcome("failed");
                Err(ShutdownFailure {
                    handle: handle.name().to_string(),
                    source,
                })
            }
        }
    }

    /// Spawns a task that waits for SIGINT or SIGTERM, runs
    /// [`shutdown`](Self::shutdown), then calls `exit` with
    /// [`EXIT_CODE`].
    ///
    /// Production callers pass `|code| std::process::exit(code)`. Must be
    /// called from within a tokio runtime.
    pub fn register_shutdown_hook<X>(self: &Arc<Self>, exit: X) -> JoinHandle<()>
    where
        X: FnOnce(i32) + Send + 'static,
    {
        self.register_shutdown_hook_on(wait_for_signal(), exit)
    }

    /// Like [`register_shutdown_hook`](Self::register_shutdown_hook), with
    /// the signal source supplied by the caller.
    pub fn register_shutdown_hook_on<S, X>(self: &Arc<Self>, signal: S, exit: X) -> JoinHandle<()>
    where
        S: Future<Output = Signal> + Send + 'static,
        X: FnOnce(i32) + Send + 'static,
    {
        let lifecycle = Arc::clone(self);

        #[cfg(feature = "tracing")]
        tracing::debug!(handle = %lifecycle.cache.config().name, "shutdown hook registered");

        tokio::spawn(async move {
            let _signal = signal.await;

            #[cfg(feature = "tracing")]
            tracing::info!(signal = %_signal, "termination signal received");

            // A release failure was already reported; exit regardless.
            let _ = lifecycle.shutdown().await;
            exit(EXIT_CODE);
        })
    }

    fn record_outcome(&self, _outcome: &'static str) {
        #[cfg(feature = "metrics")]
        counter!("holdfast_shutdowns_total", "handle" => self.cache.config().name.clone(), "outcome" => _outcome)
            .increment(1);
    }
}

impl<E: Endpoint> fmt::Debug for Lifecycle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("cache", &self.cache)
            .finish()
    }
}
