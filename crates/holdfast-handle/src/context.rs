//! The application context owning one handle and its policies.

use crate::connector::{Connector, ConnectorBuilder};
use crate::endpoint::Endpoint;
use crate::error::{ConnectError, OperationError, ShutdownFailure};
use crate::events::HandleEvent;
use crate::handle::{Handle, HandleCache};
use crate::lifecycle::{Lifecycle, ShutdownOutcome};
use crate::unit_of_work::{UnitOfWork, UnitOfWorkBuilder};
use futures::future::BoxFuture;
use holdfast_core::config::HandleConfig;
use holdfast_core::events::{EventListener, EventListeners};
use holdfast_core::sleep::Sleeper;
use holdfast_retry::{RetryEvent, RetryPolicy};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Owns the handle cache, the connector, the unit-of-work executor, and the
/// lifecycle for one external dependency.
///
/// Build one in the composition root and pass it by reference (usually as
/// `Arc<Context<E>>`) to whatever needs the dependency.
///
/// # Examples
///
/// ```
/// use futures::future::{BoxFuture, FutureExt};
/// use holdfast_core::{HandleConfig, InstantSleeper};
/// use holdfast_handle::{Context, Endpoint, ShutdownOutcome};
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
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let context = Context::builder(HandleConfig::new("postgres://db/app"), |_| Client)
///     .sleeper(InstantSleeper)
///     .build();
///
/// context.connect().await.unwrap();
/// let answer = context
///     .run_with_retry(|_: &Client| async { Ok(42) }.boxed())
///     .await
///     .unwrap();
/// assert_eq!(answer, 42);
///
/// assert_eq!(context.shutdown().await.unwrap(), ShutdownOutcome::Released);
/// # }
/// ```
pub struct Context<E: Endpoint> {
    cache: Arc<HandleCache<E>>,
    connector: Connector<E>,
    unit_of_work: UnitOfWork<E>,
    lifecycle: Arc<Lifecycle<E>>,
}

impl<E: Endpoint> Context<E> {
    /// Creates a context with default policies.
    pub fn new<F>(config: HandleConfig, factory: F) -> Self
    where
        F: Fn(&HandleConfig) -> E + Send + Sync + 'static,
    {
        Self::builder(config, factory).build()
    }

    /// Creates a builder.
    pub fn builder<F>(config: HandleConfig, factory: F) -> ContextBuilder<E>
    where
        F: Fn(&HandleConfig) -> E + Send + Sync + 'static,
    {
        ContextBuilder::new(HandleCache::new(config, factory))
    }

    /// Returns the handle, building it on first use. Does not connect.
    pub fn handle(&self) -> Arc<Handle<E>> {
        self.cache.get_handle()
    }

    /// Returns the handle and opens its connection, retrying with the
    /// connection policy.
    pub async fn connect(&self) -> Result<Arc<Handle<E>>, ConnectError<E::Error>> {
        let handle = self.cache.get_handle();
        self.connector.connect(&handle).await?;
        Ok(handle)
    }

    /// Runs `op` against the handle with the operation policy.
    pub async fn run_with_retry<T, F>(&self, op: F) -> Result<T, OperationError<E::Error>>
    where
        T: Send,
        F: for<'h> Fn(&'h E) -> BoxFuture<'h, Result<T, E::Error>> + Send + Sync,
    {
        let handle = self.cache.get_handle();
        self.unit_of_work.run_with_retry(&handle, op).await
    }

    /// Releases the handle. See [`Lifecycle::shutdown`].
    pub async fn shutdown(&self) -> Result<ShutdownOutcome, ShutdownFailure<E::Error>> {
        self.lifecycle.shutdown().await
    }

    /// Registers the signal-driven shutdown hook. See
    /// [`Lifecycle::register_shutdown_hook`].
    pub fn register_shutdown_hook<X>(&self, exit: X) -> JoinHandle<()>
    where
        X: FnOnce(i32) + Send + 'static,
    {
        self.lifecycle.register_shutdown_hook(exit)
    }

    /// The handle cache.
    pub fn cache(&self) -> &Arc<HandleCache<E>> {
        &self.cache
    }

    /// The connector.
    pub fn connector(&self) -> &Connector<E> {
        &self.connector
    }

    /// The unit-of-work executor.
    pub fn unit_of_work(&self) -> &UnitOfWork<E> {
        &self.unit_of_work
    }

    /// The lifecycle.
    pub fn lifecycle(&self) -> &Arc<Lifecycle<E>> {
        &self.lifecycle
    }
}

impl<E: Endpoint> fmt::Debug for Context<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cache", &self.cache)
            .field("connector", &self.connector)
            .field("unit_of_work", &self.unit_of_work)
            .finish()
    }
}

/// Builder for [`Context`].
pub struct ContextBuilder<E: Endpoint> {
    cache: HandleCache<E>,
    connector: ConnectorBuilder<E>,
    unit_of_work: UnitOfWorkBuilder<E>,
    handle_listeners: EventListeners<HandleEvent>,
}

impl<E: Endpoint> ContextBuilder<E> {
    fn new(cache: HandleCache<E>) -> Self {
        let name = cache.config().name.clone();
        Self {
            cache,
            connector: Connector::builder().name(format!("{}-connect", name)),
            unit_of_work: UnitOfWork::builder().name(format!("{}-unit-of-work", name)),
            handle_listeners: EventListeners::new(),
        }
    }

    /// Replaces the connection policy (default: 5 attempts, 2 s doubling).
    pub fn connection_policy(mut self, policy: RetryPolicy<E::Error>) -> Self {
        self.connector = self.connector.policy(policy);
        self
    }

    /// Replaces the operation policy (default: 3 attempts, 1 s linear).
    pub fn operation_policy(mut self, policy: RetryPolicy<E::Error>) -> Self {
        self.unit_of_work = self.unit_of_work.policy(policy);
        self
    }

    /// Replaces the sleeper used for every backoff wait.
    pub fn sleeper<S>(self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.shared_sleeper(Arc::new(sleeper))
    }

    /// Replaces the sleeper with an already shared one.
    pub fn shared_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.connector = self.connector.shared_sleeper(Arc::clone(&sleeper));
        self.unit_of_work = self.unit_of_work.shared_sleeper(sleeper);
        self
    }

    /// Registers a listener for handle events.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<HandleEvent> + 'static,
    {
        self.handle_listeners.add(listener);
        self
    }

    /// Registers a listener for connect and operation retry events.
    pub fn retry_listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener<RetryEvent> + 'static,
    {
        let mut shared = EventListeners::new();
        shared.add(listener);
        self.connector = self.connector.listeners(&shared);
        self.unit_of_work = self.unit_of_work.listeners(&shared);
        self
    }

    /// Builds the context.
    pub fn build(self) -> Context<E> {
        let cache = Arc::new(self.cache.with_listeners(&self.handle_listeners));
        Context {
            lifecycle: Arc::new(Lifecycle::new(Arc::clone(&cache))),
            cache,
            connector: self.connector.build(),
            unit_of_work: self.unit_of_work.build(),
        }
    }
}
