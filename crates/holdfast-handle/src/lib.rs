//! Shared resource handles that survive a flaky dependency.
//!
//! A handle wraps one external dependency (a database, a broker) for the
//! whole process:
//!
//! - [`HandleCache`] builds the handle lazily and hands out the same `Arc`
//!   to every caller.
//! - [`Connector`] opens the connection, retrying with exponential backoff
//!   (2 s, 4 s, 8 s, ... over five attempts by default) and returning
//!   [`ConnectionExhaustedError`] when it gives up.
//! - [`UnitOfWork`] runs operations against the handle, retrying with
//!   linear backoff (1 s, 2 s over three attempts by default). Each attempt
//!   goes through the endpoint's transactional boundary.
//! - [`Lifecycle`] releases the handle exactly once, on demand or on
//!   SIGINT/SIGTERM once [`Lifecycle::register_shutdown_hook`] was called.
//!
//! [`Context`] bundles the four for a composition root.
//!
//! # Feature flags
//!
//! - `tracing`: log attempts, failures, and shutdown through `tracing`.
//!   Handles built in the `development` environment also log every attempt
//!   at debug level.
//! - `metrics`: record connect, operation, and shutdown outcomes and the
//!   handle state gauge through `metrics`.

pub mod connector;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod handle;
pub mod lifecycle;
pub mod state;
pub mod unit_of_work;

pub use connector::{Connector, ConnectorBuilder};
pub use context::{Context, ContextBuilder};
pub use endpoint::{Endpoint, Work};
pub use error::{ConnectError, ConnectionExhaustedError, OperationError, ShutdownFailure};
pub use events::HandleEvent;
pub use handle::{Handle, HandleCache};
pub use lifecycle::{wait_for_signal, Lifecycle, ShutdownOutcome, Signal, EXIT_CODE};
pub use state::HandleState;
pub use unit_of_work::{UnitOfWork, UnitOfWorkBuilder};
