//! Property-based tests for holdfast.
//!
//! Run with: cargo test --test property_tests

pub mod backoff;
pub mod connector;
