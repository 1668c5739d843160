//! Property tests for the connector.
//!
//! Invariants tested:
//! - Failing on attempts 1..n-1 then succeeding takes exactly n-1 waits,
//!   doubling from 2 seconds
//! - Failing on every attempt gives up after exactly n attempts and n-1 waits
//! - Never more than max_attempts opens

use crate::common::{config, DbError, FakeDb};
use holdfast::retry::RetryPolicy;
use holdfast::{ConnectError, Connector, HandleCache, HandleConfig, RecordingSleeper};
use proptest::prelude::*;
use std::time::Duration;
use tokio::runtime::Runtime;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: success on the last permitted attempt after n-1 doubling waits
    #[test]
    fn succeeds_on_last_attempt(max_attempts in 1u32..=10) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let sleeper = RecordingSleeper::new();
            let connector = Connector::builder()
                .policy(RetryPolicy::<DbError>::connection().with_max_attempts(max_attempts).unwrap())
                .sleeper(sleeper.clone())
                .build();
            let cache = HandleCache::new(config("prop"), move |_: &HandleConfig| {
                FakeDb::new("db").failing_opens(max_attempts - 1)
            });
            let handle = cache.get_handle();

            connector.connect(&handle).await.unwrap();

            let delays = sleeper.delays();
            assert_eq!(delays.len() as u32, max_attempts - 1);
            if let Some(first) = delays.first() {
                assert_eq!(*first, Duration::from_secs(2));
            }
            assert!(delays.windows(2).all(|w| w[1] == w[0] * 2));
        });
    }

    /// Property: permanent failure means n attempts and n-1 waits, never n waits
    #[test]
    fn permanent_failure_exhausts(max_attempts in 1u32..=10) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let sleeper = RecordingSleeper::new();
            let connector = Connector::builder()
                .policy(RetryPolicy::<DbError>::connection().with_max_attempts(max_attempts).unwrap())
                .sleeper(sleeper.clone())
                .build();
            let cache = HandleCache::new(config("prop"), |_: &HandleConfig| {
                FakeDb::new("db").unreachable()
            });
            let handle = cache.get_handle();

            let err = connector.connect(&handle).await.unwrap_err();

            match err {
                ConnectError::Exhausted(exhausted) => assert_eq!(exhausted.attempts, max_attempts),
                other => panic!("expected exhaustion, got {:?}", other),
            }
            assert_eq!(sleeper.waits() as u32, max_attempts - 1);
            assert_eq!(handle.endpoint().opens(), max_attempts);
        });
    }

    /// Property: opens never exceed the cap, whatever the failure count
    #[test]
    fn opens_bounded_by_cap(max_attempts in 1u32..=8, failures in 0u32..=12) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let connector = Connector::builder()
                .policy(RetryPolicy::<DbError>::connection().with_max_attempts(max_attempts).unwrap())
                .sleeper(RecordingSleeper::new())
                .build();
            let cache = HandleCache::new(config("prop"), move |_: &HandleConfig| {
                FakeDb::new("db").failing_opens(failures)
            });
            let handle = cache.get_handle();

            let result = connector.connect(&handle).await;

            assert!(handle.endpoint().opens() <= max_attempts);
            assert_eq!(result.is_ok(), failures < max_attempts);
        });
    }
}
