//! Retry as Tower middleware.

use holdfast::retry::{Retrier, RetryLayer, RetryPolicy};
use holdfast::RecordingSleeper;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::{Layer, ServiceBuilder, ServiceExt};

#[derive(Debug, Clone, PartialEq)]
struct QueryError(&'static str);

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

#[tokio::test]
async fn retries_until_the_service_answers() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let sleeper = RecordingSleeper::new();
    let retrier = Retrier::builder(RetryPolicy::operation())
        .sleeper(sleeper.clone())
        .build();

    let service = ServiceBuilder::new()
        .layer(RetryLayer::new(retrier))
        .service(tower::service_fn(move |query: String| {
            let attempt = c.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(QueryError("deadlock detected"))
                } else {
                    Ok(format!("rows for {}", query))
                }
            }
        }));

    let response = service.oneshot("SELECT 1".to_string()).await.unwrap();

    assert_eq!(response, "rows for SELECT 1");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(1)]);
}

#[tokio::test]
async fn final_error_is_returned_unwrapped() {
    let retrier = Retrier::builder(RetryPolicy::operation())
        .sleeper(RecordingSleeper::new())
        .build();
    let service = RetryLayer::new(retrier).layer(tower::service_fn(|_: u32| async {
        Err::<(), _>(QueryError("relation does not exist"))
    }));

    let err = service.oneshot(7).await.unwrap_err();

    assert_eq!(err, QueryError("relation does not exist"));
}

#[tokio::test]
async fn each_request_gets_a_fresh_attempt_budget() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let layer = RetryLayer::new(
        Retrier::builder(RetryPolicy::operation().with_max_attempts(2).unwrap())
            .sleeper(RecordingSleeper::new())
            .build(),
    );
    let service = layer.layer(tower::service_fn(move |_: ()| {
        c.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(QueryError("timeout")) }
    }));

    let _ = service.clone().oneshot(()).await;
    let _ = service.oneshot(()).await;

    assert_eq!(calls.load(Ordering::SeqCst), 4);
}
