//! Retry tests.
//!
//! Test organization:
//! - policy.rs: presets, builder validation, and backoff shapes
//! - retrier.rs: the sequential retry loop and its listeners
//! - layer.rs: the Tower middleware

mod layer;
mod retrier;
