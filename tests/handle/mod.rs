//! Handle tests.
//!
//! Test organization:
//! - cache.rs: lazy construction and identity of the shared handle
//! - connector.rs: exponential connect retries and exhaustion
//! - unit_of_work.rs: linear operation retries and transactional attempts
//! - lifecycle.rs: idempotent shutdown and the signal hook
//! - context.rs: the composition-root bundle end to end

mod cache;
