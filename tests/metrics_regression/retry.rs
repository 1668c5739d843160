//! Retrier metrics regression tests

use super::helpers::*;
use holdfast::retry::{Retrier, RetryPolicy};
use holdfast::RecordingSleeper;
use serial_test::serial;
use std::sync::atomic::{AtomicU32, Ordering};

#[tokio::test]
#[serial]
async fn retry_success_metrics() {
    init_recorder();

    let retrier = Retrier::builder(RetryPolicy::<&'static str>::operation())
        .name("metrics_retry_success")
        .sleeper(RecordingSleeper::new())
        .build();
    let calls = AtomicU32::new(0);

    let _ = retrier
        .run(|_| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    Err("deadlock detected")
                } else {
                    Ok(())
                }
            }
        })
        .await;

    assert_counter_exists("holdfast_retry_calls_total");
    assert_metric_has_label("holdfast_retry_calls_total", "retry", "metrics_retry_success");
    assert_metric_has_label("holdfast_retry_calls_total", "outcome", "success");

    assert_counter_exists("holdfast_retry_attempts_total");
    assert_metric_has_label("holdfast_retry_attempts_total", "retry", "metrics_retry_success");
}

#[tokio::test]
#[serial]
async fn retry_exhausted_metrics() {
    init_recorder();

    let retrier = Retrier::builder(RetryPolicy::<&'static str>::operation())
        .name("metrics_retry_exhausted")
        .sleeper(RecordingSleeper::new())
        .build();

    let _ = retrier.run(|_| async { Err::<(), _>("timeout") }).await;

    assert_metric_has_label("holdfast_retry_calls_total", "retry", "metrics_retry_exhausted");
    assert_metric_has_label("holdfast_retry_calls_total", "outcome", "exhausted");
}

#[tokio::test]
#[serial]
async fn retry_not_retried_metrics() {
    init_recorder();

    let policy = RetryPolicy::builder()
        .retry_on(|_: &&'static str| false)
        .build()
        .unwrap();
    let retrier = Retrier::builder(policy)
        .name("metrics_retry_not_retried")
        .sleeper(RecordingSleeper::new())
        .build();

    let _ = retrier.run(|_| async { Err::<(), _>("syntax error") }).await;

    assert_metric_has_label("holdfast_retry_calls_total", "outcome", "not_retried");
}
