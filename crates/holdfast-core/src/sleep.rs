//! Injectable backoff waits.
//!
//! Retry loops never call a timer directly; they ask a [`Sleeper`] to wait.
//! Production code uses [`TokioSleeper`], tests substitute [`InstantSleeper`]
//! or [`RecordingSleeper`] to skip wall-clock waits and observe the delays
//! that would have been taken.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A capability that suspends the caller for a given duration.
pub trait Sleeper: Send + Sync {
    /// Returns a future that completes once `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Sleeps on the tokio timer. Honors `tokio::time::pause`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed()
    }
}

/// Completes every wait immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _duration: Duration) -> BoxFuture<'static, ()> {
        futures::future::ready(()).boxed()
    }
}

/// Completes every wait immediately and remembers the requested durations.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    /// Creates a sleeper with an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every requested delay, in request order.
    pub fn delays(&self) -> Vec<Duration> {
        match self.delays.lock() {
            Ok(delays) => delays.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns the number of waits requested so far.
    pub fn waits(&self) -> usize {
        self.delays().len()
    }

    /// Returns the sum of every requested delay.
    pub fn total(&self) -> Duration {
        self.delays().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        let mut delays = match self.delays.lock() {
            Ok(delays) => delays,
            Err(poisoned) => poisoned.into_inner(),
        };
        delays.push(duration);
        futures::future::ready(()).boxed()
    }
}

impl<S: Sleeper + ?Sized> Sleeper for Arc<S> {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        (**self).sleep(duration)
    }
}
