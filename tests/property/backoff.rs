//! Property tests for backoff functions.
//!
//! Invariants tested:
//! - Exponential delays never decrease from one retry to the next
//! - The connection preset is `2^n` seconds
//! - Jittered delays stay within the configured spread

use holdfast::retry::{Backoff, ExponentialBackoff, JitteredBackoff, RetryPolicy};
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: exponential backoff is monotonically non-decreasing
    #[test]
    fn exponential_is_monotonic(
        initial_ms in 0u64..10_000,
        multiplier in 0.0f64..5.0,
        retry in 1u32..200,
    ) {
        let backoff = ExponentialBackoff::new(Duration::from_millis(initial_ms))
            .multiplier(multiplier);

        prop_assert!(backoff.delay(retry) <= backoff.delay(retry + 1));
    }

    /// Property: the connection preset waits 2^n seconds before retry n
    #[test]
    fn connection_preset_is_powers_of_two(retry in 1u32..=30) {
        let policy = RetryPolicy::<()>::connection();

        prop_assert_eq!(policy.delay_for(retry), Duration::from_secs(1u64 << retry));
    }

    /// Property: the operation preset waits n seconds before retry n
    #[test]
    fn operation_preset_is_linear(retry in 1u32..=1_000) {
        let policy = RetryPolicy::<()>::operation();

        prop_assert_eq!(policy.delay_for(retry), Duration::from_secs(u64::from(retry)));
    }

    /// Property: jitter never leaves [base * (1 - f), base * (1 + f)]
    #[test]
    fn jitter_stays_in_bounds(
        base_ms in 1u64..60_000,
        factor in 0.0f64..=1.0,
    ) {
        let inner = ExponentialBackoff::new(Duration::from_millis(base_ms));
        let backoff = JitteredBackoff::new(inner, factor);
        let base = base_ms as f64 / 1000.0;

        let delay = backoff.delay(1).as_secs_f64();

        // Float rounding slack.
        prop_assert!(delay >= base * (1.0 - factor) - 1e-9);
        prop_assert!(delay <= base * (1.0 + factor) + 1e-9);
    }
}
