//! The shared handle and the cache that builds it lazily.

use crate::endpoint::Endpoint;
use crate::events::HandleEvent;
use crate::state::{HandleState, StateCell};
use holdfast_core::config::HandleConfig;
use holdfast_core::events::{EventListener, EventListeners};
#[cfg(feature = "metrics")]
use metrics::gauge;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A process-wide handle to an external dependency.
///
/// Handles are only ever reached through an `Arc` handed out by
/// [`HandleCache::get_handle`]. Nothing outside this crate can close one;
/// only [`Lifecycle::shutdown`](crate::Lifecycle::shutdown) does, once.
pub struct Handle<E: Endpoint> {
    endpoint: E,
    config: HandleConfig,
    created_at: Instant,
    state: StateCell,
    accepting: AtomicBool,
    gate: RwLock<()>,
    listeners: EventListeners<HandleEvent>,
}

impl<E: Endpoint> Handle<E> {
    fn new(endpoint: E, config: HandleConfig, listeners: EventListeners<HandleEvent>) -> Self {
        Self {
            endpoint,
            config,
            created_at: Instant::now(),
            state: StateCell::new(HandleState::Unconnected),
            accepting: AtomicBool::new(true),
            gate: RwLock::new(()),
            listeners,
        }
    }

    /// The underlying endpoint.
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// The configuration the handle was built from.
    pub fn config(&self) -> &HandleConfig {
        &self.config
    }

    /// The handle name used in events, logs, and metric labels.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// When the handle object was built.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Current connection state.
    pub fn state(&self) -> HandleState {
        self.state.get()
    }

    /// Returns true when every attempt should be logged.
    pub fn is_verbose(&self) -> bool {
        self.config.is_verbose()
    }

    /// Returns false once shutdown has begun.
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Moves to `next` and reports the change. Ignored once closed.
    pub(crate) fn transition(&self, next: HandleState) {
        let Some(from) = self.state.transition(next) else {
            return;
        };
        if from == next {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(handle = %self.name(), from = %from, to = %next, "handle state changed");

        #[cfg(feature = "metrics")]
        gauge!("holdfast_handle_state", "handle" => self.config.name.clone())
            .set(f64::from(next.encode()));

        self.emit(HandleEvent::StateTransition {
            source: self.config.name.clone(),
            timestamp: Instant::now(),
            from,
            to: next,
        });
    }

    /// Stops accepting new work. Returns true for the caller that flipped
    /// the flag.
    pub(crate) fn stop_accepting(&self) -> bool {
        self.accepting
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Admits one attempt against the endpoint, or `None` once shutdown has
    /// begun. Release waits for every admitted attempt to finish.
    pub(crate) async fn enter(&self) -> Option<RwLockReadGuard<'_, ()>> {
        let entered = self.gate.read().await;
        self.is_accepting().then_some(entered)
    }

    /// Excludes every attempt while the endpoint is released.
    pub(crate) async fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().await
    }

    pub(crate) fn emit(&self, event: HandleEvent) {
        self.listeners.emit(&event);
    }
}

impl<E: Endpoint> fmt::Debug for Handle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("name", &self.config.name)
            .field("state", &self.state.get())
            .field("accepting", &self.is_accepting())
            .finish_non_exhaustive()
    }
}

type Factory<E> = Box<dyn Fn(&HandleConfig) -> E + Send + Sync>;

/// Builds the handle on first use and hands out the same `Arc` afterwards.
///
/// The factory only builds a client object; it must not open a
/// connection. Concurrent first calls run it exactly once.
///
/// # Examples
///
/// ```
/// use futures::future::{BoxFuture, FutureExt};
/// use holdfast_core::HandleConfig;
/// use holdfast_handle::{Endpoint, HandleCache};
/// use std::sync::Arc;
///
/// struct Client;
///
/// impl Endpoint for Client {
///     type Error = std::io::Error;
///
///     fn open(&self) -> BoxFuture<'_, Result<(), Self::Error>> {
///         async { Ok(()) }.boxed()
///     }
///
///     fn close(&self) -> BoxFuture<'_, Result<(), Self::Error>> {
///         async { Ok(()) }.boxed()
///     }
/// }
///
/// let cache = HandleCache::new(HandleConfig::new("postgres://db/app"), |_| Client);
/// assert!(!cache.is_initialized());
///
/// let first = cache.get_handle();
/// let second = cache.get_handle();
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
pub struct HandleCache<E: Endpoint> {
    config: HandleConfig,
    factory: Factory<E>,
    cell: OnceLock<Arc<Handle<E>>>,
    sealed: AtomicBool,
    listeners: EventListeners<HandleEvent>,
}

impl<E: Endpoint> HandleCache<E> {
    /// Creates an empty cache. Nothing is built until
    /// [`get_handle`](Self::get_handle) is called.
    pub fn new<F>(config: HandleConfig, factory: F) -> Self
    where
        F: Fn(&HandleConfig) -> E + Send + Sync + 'static,
    {
        Self {
            config,
            factory: Box::new(factory),
            cell: OnceLock::new(),
            sealed: AtomicBool::new(false),
            listeners: EventListeners::new(),
        }
    }

    /// Registers a listener for handle events.
    pub fn with_listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<HandleEvent> + 'static,
    {
        self.listeners.add(listener);
        self
    }

    /// Appends every listener from an existing collection.
    pub fn with_listeners(mut self, listeners: &EventListeners<HandleEvent>) -> Self {
        for listener in listeners.iter() {
            self.listeners.add_shared(Arc::clone(listener));
        }
        self
    }

    /// The configuration handles are built from.
    pub fn config(&self) -> &HandleConfig {
        &self.config
    }

    /// Returns the handle, building it on the first call.
    pub fn get_handle(&self) -> Arc<Handle<E>> {
        let handle = self.cell.get_or_init(|| {
            let endpoint = (self.factory)(&self.config);
            let handle = Handle::new(endpoint, self.config.clone(), self.listeners.clone());

            #[cfg(feature = "tracing")]
            tracing::info!(
                handle = %self.config.name,
                target = %self.config.target,
                environment = %self.config.environment,
                "handle constructed"
            );

            handle.emit(HandleEvent::Constructed {
                source: self.config.name.clone(),
                timestamp: Instant::now(),
            });

            if self.is_sealed() {
                handle.stop_accepting();
                handle.transition(HandleState::Closed);
            }

            Arc::new(handle)
        });
        Arc::clone(handle)
    }

    /// Returns the handle only if it was already built.
    pub fn peek(&self) -> Option<Arc<Handle<E>>> {
        self.cell.get().map(Arc::clone)
    }

    /// Returns true once the handle was built.
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Returns true once shutdown has begun.
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Marks the cache as shut down. A handle built afterwards starts closed.
    pub(crate) fn seal(&self) -> bool {
        self.sealed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl<E: Endpoint> fmt::Debug for HandleCache<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleCache")
            .field("config", &self.config)
            .field("handle", &self.cell.get())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}
