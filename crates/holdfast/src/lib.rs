//! Resilient shared handles to external dependencies.
//!
//! `holdfast` keeps one handle per dependency for the life of a process and
//! wraps every interaction with it in a bounded retry loop:
//!
//! - **Handle cache**: the handle is built on first use, never at import
//!   time, and every caller receives the same `Arc`.
//! - **Connect**: opening the connection is retried with exponential
//!   backoff (2 s, 4 s, 8 s, 16 s over five attempts by default).
//! - **Unit of work**: operations are retried with linear backoff (1 s,
//!   2 s over three attempts by default), each attempt delegated through
//!   the endpoint's transactional boundary.
//! - **Lifecycle**: shutdown releases the handle exactly once, on demand or
//!   on SIGINT/SIGTERM once the hook is registered.
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! holdfast = { version = "0.1", features = ["tracing"] }
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::future::{BoxFuture, FutureExt};
//! use holdfast::{Context, Endpoint, HandleConfig};
//! use std::sync::Arc;
//!
//! struct Database;
//!
//! impl Endpoint for Database {
//!     type Error = std::io::Error;
//!
//!     fn open(&self) -> BoxFuture<'_, Result<(), Self::Error>> {
//!         async { Ok(()) }.boxed()
//!     }
//!
//!     fn close(&self) -> BoxFuture<'_, Result<(), Self::Error>> {
//!         async { Ok(()) }.boxed()
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HandleConfig::from_env()?;
//! let context = Arc::new(Context::new(config, |_| Database));
//! context.register_shutdown_hook(|code| std::process::exit(code));
//!
//! context.connect().await?;
//! context
//!     .run_with_retry(|_db: &Database| async { Ok(()) }.boxed())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Individual Crates
//!
//! - `holdfast-core` (events, injectable sleep, configuration)
//! - `holdfast-retry` (policies, backoff, retry loop, Tower layer)
//! - `holdfast-handle` (handle cache, connector, unit of work, lifecycle)

pub use holdfast_core as core;
pub use holdfast_handle as handle;
pub use holdfast_retry as retry;

pub use holdfast_core::{
    ConfigError, Environment, EventListener, EventLog, FnListener, HandleConfig, InstantSleeper,
    RecordingSleeper, Sleeper, TokioSleeper,
};
pub use holdfast_handle::{
    ConnectError, ConnectionExhaustedError, Connector, Context, ContextBuilder, Endpoint, Handle,
    HandleCache, HandleEvent, HandleState, Lifecycle, OperationError, ShutdownFailure,
    ShutdownOutcome, Signal, UnitOfWork,
};
pub use holdfast_retry::{Retrier, RetryError, RetryEvent, RetryLayer, RetryPolicy};
