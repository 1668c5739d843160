//! The sequential retry loop.

use holdfast::core::FnListener;
use holdfast::retry::{Retrier, RetryError, RetryEvent, RetryPolicy};
use holdfast::{EventLog, InstantSleeper, RecordingSleeper};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn attempts_never_overlap() {
    let in_flight = Arc::new(AtomicU32::new(0));
    let overlaps = Arc::new(AtomicU32::new(0));
    let retrier = Retrier::builder(RetryPolicy::<String>::connection())
        .sleeper(InstantSleeper)
        .build();

    let result = retrier
        .run(|attempt| {
            let in_flight = Arc::clone(&in_flight);
            let overlaps = Arc::clone(&overlaps);
            async move {
                if in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                if attempt < 5 {
                    Err(format!("refused #{}", attempt))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), 5);
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failure_is_reported_before_the_wait_starts() {
    let timeline = Arc::new(Mutex::new(Vec::new()));
    let t = Arc::clone(&timeline);
    let sleeper = RecordingSleeper::new();
    let s = sleeper.clone();

    let retrier = Retrier::builder(RetryPolicy::<String>::operation())
        .sleeper(sleeper.clone())
        .listener(FnListener::new(move |event: &RetryEvent| {
            if let RetryEvent::Retry { attempt, .. } = event {
                // Waits recorded so far, seen when the failure is reported.
                t.lock().unwrap().push((*attempt, s.waits()));
            }
        }))
        .build();

    let _ = retrier
        .run(|attempt| async move { Err::<(), _>(format!("deadlock #{}", attempt)) })
        .await;

    assert_eq!(*timeline.lock().unwrap(), vec![(1, 0), (2, 1)]);
    assert_eq!(sleeper.waits(), 2);
}

#[tokio::test]
async fn panicking_listener_does_not_break_the_loop() {
    let log = EventLog::new();
    let retrier = Retrier::builder(RetryPolicy::<String>::operation())
        .sleeper(InstantSleeper)
        .listener(FnListener::new(|_: &RetryEvent| panic!("listener bug")))
        .listener(log.clone())
        .build();

    let value = retrier
        .run(|attempt| async move {
            if attempt == 1 {
                Err("lock timeout".to_string())
            } else {
                Ok("committed")
            }
        })
        .await
        .unwrap();

    assert_eq!(value, "committed");
    assert_eq!(log.count("retry"), 1);
    assert_eq!(log.count("success"), 1);
}

#[tokio::test]
async fn exhausted_error_carries_the_last_cause() {
    let exhausted = Arc::new(AtomicU32::new(0));
    let e = Arc::clone(&exhausted);
    let retrier = Retrier::builder(RetryPolicy::<String>::operation())
        .name("ledger")
        .sleeper(InstantSleeper)
        .on_exhausted(move |attempts| {
            e.store(attempts, Ordering::SeqCst);
        })
        .build();

    let err = retrier
        .run(|attempt| async move { Err::<(), _>(format!("failure #{}", attempt)) })
        .await
        .unwrap_err();

    assert_eq!(exhausted.load(Ordering::SeqCst), 3);
    assert_eq!(err.to_string(), "gave up after 3 attempt(s): failure #3");
    match err {
        RetryError::Exhausted { attempts, source } => {
            assert_eq!(attempts, 3);
            assert_eq!(source, "failure #3");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn success_callback_reports_attempts_used() {
    let used = Arc::new(AtomicU32::new(0));
    let u = Arc::clone(&used);
    let sleeper = RecordingSleeper::new();
    let retrier = Retrier::builder(RetryPolicy::<String>::connection())
        .sleeper(sleeper.clone())
        .on_success(move |attempts| {
            u.store(attempts, Ordering::SeqCst);
        })
        .build();

    retrier
        .run(|attempt| async move {
            if attempt < 3 {
                Err("refused".to_string())
            } else {
                Ok(())
            }
        })
        .await
        .unwrap();

    assert_eq!(used.load(Ordering::SeqCst), 3);
    assert_eq!(sleeper.total(), Duration::from_secs(6));
}
