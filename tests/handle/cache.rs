//! Handle cache tests.

use crate::common::{config, FakeDb};
use holdfast::{Environment, HandleCache, HandleConfig, HandleState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn consecutive_calls_return_the_same_handle() {
    let cache = HandleCache::new(config("orders"), |config: &HandleConfig| {
        FakeDb::new(config.target.clone())
    });

    let first = cache.get_handle();
    let second = cache.get_handle();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.endpoint().url, "postgres://localhost/orders");
}

#[test]
fn construction_never_connects() {
    let cache = HandleCache::new(config("orders"), |config: &HandleConfig| {
        FakeDb::new(config.target.clone())
    });

    let handle = cache.get_handle();

    assert_eq!(handle.endpoint().opens(), 0);
    assert_eq!(handle.state(), HandleState::Unconnected);
}

#[test]
fn nothing_is_built_until_asked() {
    let built = Arc::new(AtomicUsize::new(0));
    let b = Arc::clone(&built);
    let cache = HandleCache::new(config("orders"), move |config: &HandleConfig| {
        b.fetch_add(1, Ordering::SeqCst);
        FakeDb::new(config.target.clone())
    });

    assert!(!cache.is_initialized());
    assert!(cache.peek().is_none());
    assert_eq!(built.load(Ordering::SeqCst), 0);

    let handle = cache.get_handle();
    assert!(Arc::ptr_eq(&handle, &cache.peek().unwrap()));
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tasks_share_one_handle() {
    let built = Arc::new(AtomicUsize::new(0));
    let b = Arc::clone(&built);
    let cache = Arc::new(HandleCache::new(config("orders"), move |config: &HandleConfig| {
        b.fetch_add(1, Ordering::SeqCst);
        FakeDb::new(config.target.clone())
    }));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get_handle() })
        })
        .collect();

    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.unwrap());
    }

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
}

#[test]
fn development_environment_makes_the_handle_verbose() {
    let vars: HashMap<&str, &str> = [
        ("DATABASE_URL", "postgres://db:5432/app"),
        ("DATABASE_CREDENTIALS", "app:hunter2"),
        ("APP_ENV", "development"),
    ]
    .into_iter()
    .collect();
    let config = HandleConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

    let cache = HandleCache::new(config, |config: &HandleConfig| {
        FakeDb::new(config.target.clone())
    });
    let handle = cache.get_handle();

    assert!(handle.is_verbose());
    assert_eq!(handle.config().environment, Environment::Development);
    assert_eq!(handle.config().credentials, "app:hunter2");
}

#[test]
fn production_is_quiet() {
    let cache = HandleCache::new(
        config("orders").environment(Environment::parse("staging")),
        |config: &HandleConfig| FakeDb::new(config.target.clone()),
    );

    assert!(!cache.get_handle().is_verbose());
}
