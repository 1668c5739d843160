//! Fake endpoints shared by the integration tests.

#![allow(dead_code)]

use futures::future::{BoxFuture, FutureExt};
use holdfast::handle::Work;
use holdfast::{Endpoint, HandleConfig};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Errors produced by [`FakeDb`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DbError {
    #[error("database unreachable")]
    Unreachable,
    #[error("authentication failed")]
    AuthFailed,
    #[error("duplicate key value violates unique constraint \"{0}\"")]
    UniqueViolation(String),
    #[error("statement timed out")]
    Timeout,
    #[error("connection reset during close")]
    CloseFailed,
}

/// An in-memory database with a transactional boundary.
///
/// `open` fails with `open_error` for the first `fail_opens` calls. Each unit
/// of work runs in a transaction: rows written by a failed attempt are
/// rolled back before the result is returned.
#[derive(Debug)]
pub struct FakeDb {
    pub url: String,
    fail_opens: u32,
    open_error: DbError,
    fail_close: bool,
    open_delay: Duration,
    rows: Mutex<Vec<String>>,
    pub opens: AtomicU32,
    pub closes: AtomicU32,
    pub transactions: AtomicU32,
    pub rollbacks: AtomicU32,
}

impl FakeDb {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            fail_opens: 0,
            open_error: DbError::Unreachable,
            fail_close: false,
            open_delay: Duration::ZERO,
            rows: Mutex::new(Vec::new()),
            opens: AtomicU32::new(0),
            closes: AtomicU32::new(0),
            transactions: AtomicU32::new(0),
            rollbacks: AtomicU32::new(0),
        }
    }

    /// Fails the first `n` opens.
    pub fn failing_opens(mut self, n: u32) -> Self {
        self.fail_opens = n;
        self
    }

    /// Never opens.
    pub fn unreachable(self) -> Self {
        self.failing_opens(u32::MAX)
    }

    /// Fails opens with `error` instead of [`DbError::Unreachable`].
    pub fn open_error(mut self, error: DbError) -> Self {
        self.open_error = error;
        self
    }

    /// Makes every open take `delay` before it settles.
    pub fn slow_opens(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    /// Makes `close` fail.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn transactions(&self) -> u32 {
        self.transactions.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> u32 {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> Vec<String> {
        self.rows.lock().unwrap().clone()
    }

    /// Inserts `key`, failing if it already exists.
    pub fn insert(&self, key: &str) -> Result<(), DbError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|row| row == key) {
            return Err(DbError::UniqueViolation(format!("{}_pkey", key)));
        }
        rows.push(key.to_string());
        Ok(())
    }
}

impl Endpoint for FakeDb {
    type Error = DbError;

    fn open(&self) -> BoxFuture<'_, Result<(), Self::Error>> {
        let attempt = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        let result = if attempt <= self.fail_opens {
            Err(self.open_error.clone())
        } else {
            Ok(())
        };
        let delay = self.open_delay;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        }
        .boxed()
    }

    fn close(&self) -> BoxFuture<'_, Result<(), Self::Error>> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_close {
            Err(DbError::CloseFailed)
        } else {
            Ok(())
        };
        async move {
            tokio::task::yield_now().await;
            result
        }
        .boxed()
    }

    fn unit_of_work<'a, T>(&'a self, work: Work<'a, Self, T>) -> BoxFuture<'a, Result<T, Self::Error>>
    where
        T: Send + 'a,
    {
        async move {
            self.transactions.fetch_add(1, Ordering::SeqCst);
            let savepoint = self.rows.lock().unwrap().len();

            let result = work(self).await;

            if result.is_err() {
                self.rows.lock().unwrap().truncate(savepoint);
                self.rollbacks.fetch_add(1, Ordering::SeqCst);
            }
            result
        }
        .boxed()
    }
}

/// Configuration pointing at a test database.
pub fn config(name: &str) -> HandleConfig {
    HandleConfig::new(format!("postgres://localhost/{}", name)).name(name)
}
