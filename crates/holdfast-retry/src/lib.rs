//! Bounded retries with pluggable backoff.
//!
//! This crate provides the retry machinery shared by the holdfast connector
//! and unit-of-work executor, and exposes it as Tower middleware as well.
//!
//! # Features
//!
//! - **Backoff functions**: fixed, linear, exponential (with optional cap),
//!   jittered, and closure-based
//! - **Immutable policies**: an attempt cap validated at build time, a
//!   backoff, and an optional retryable-error filter
//! - **Sequential retry loop**: [`Retrier`] waits through an injectable
//!   [`Sleeper`](holdfast_core::Sleeper) and reports every failure
//! - **Tower integration**: [`RetryLayer`] applies a retrier to any service
//!
//! # Examples
//!
//! ```
//! use holdfast_core::RecordingSleeper;
//! use holdfast_retry::{Retrier, RetryPolicy};
//! use std::time::Duration;
//!
//! # tokio_test_block_on(async {
//! let sleeper = RecordingSleeper::new();
//! let retrier = Retrier::builder(RetryPolicy::operation())
//!     .name("orders")
//!     .sleeper(sleeper.clone())
//!     .on_retry(|attempt, delay| println!("attempt {} failed, waiting {:?}", attempt, delay))
//!     .build();
//!
//! let value = retrier
//!     .run(|attempt| async move {
//!         if attempt < 2 { Err("deadlock detected") } else { Ok(attempt) }
//!     })
//!     .await
//!     .unwrap();
//!
//! assert_eq!(value, 2);
//! assert_eq!(sleeper.delays(), vec![Duration::from_secs(1)]);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

mod backoff;
mod events;
mod layer;
mod policy;
mod retrier;

pub use backoff::{
    Backoff, ExponentialBackoff, FixedBackoff, FnBackoff, JitteredBackoff, LinearBackoff,
};
pub use events::RetryEvent;
pub use layer::{Retry, RetryLayer};
pub use policy::{
    PolicyError, RetryPolicy, RetryPolicyBuilder, RetryPredicate, CONNECTION_INITIAL_DELAY,
    CONNECTION_MAX_ATTEMPTS, OPERATION_DELAY_UNIT, OPERATION_MAX_ATTEMPTS,
};
pub use retrier::{Retrier, RetrierBuilder, RetryError};
