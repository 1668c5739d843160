//! Core infrastructure for holdfast.
//!
//! This crate provides the pieces shared by the retry and handle crates:
//! - Event system for observability
//! - Injectable sleep capability so backoff waits can be simulated
//! - Environment-style configuration for resource handles

pub mod config;
pub mod events;
pub mod sleep;

pub use config::{ConfigError, Environment, HandleConfig};
#[cfg(feature = "tracing")]
pub use events::TracingListener;
pub use events::{
    EventListener, EventListeners, EventLog, FnListener, HoldfastEvent, SharedEventListener,
};
pub use sleep::{InstantSleeper, RecordingSleeper, Sleeper, TokioSleeper};
