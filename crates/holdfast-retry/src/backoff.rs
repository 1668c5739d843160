use std::sync::Arc;
use std::time::Duration;

/// Computes the wait before a retry.
///
/// Retry numbers are 1-indexed: `delay(1)` is the wait that follows the
/// first failed attempt and precedes attempt 2.
pub trait Backoff: Send + Sync {
    /// Returns the delay before retry number `retry`.
    fn delay(&self, retry: u32) -> Duration;
}

impl<B: Backoff + ?Sized> Backoff for Arc<B> {
    fn delay(&self, retry: u32) -> Duration {
        (**self).delay(retry)
    }
}

/// The same delay before every retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    /// Creates a fixed backoff.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Backoff for FixedBackoff {
    fn delay(&self, _retry: u32) -> Duration {
        self.delay
    }
}

/// `delay(n) = n * unit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    unit: Duration,
}

impl LinearBackoff {
    /// Creates a linear backoff growing by `unit` per retry.
    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }
}

impl Backoff for LinearBackoff {
    fn delay(&self, retry: u32) -> Duration {
        self.unit.saturating_mul(retry)
    }
}

/// `delay(n) = initial * multiplier^(n - 1)`, optionally capped.
///
/// With `initial = 2s` and the default multiplier of 2 this yields
/// 2s, 4s, 8s, ... which is `2^n` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    initial: Duration,
    multiplier: f64,
    max_delay: Option<Duration>,
}

impl ExponentialBackoff {
    /// Creates an exponential backoff with a multiplier of 2.
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            multiplier: 2.0,
            max_delay: None,
        }
    }

    /// Sets the growth factor. Values below 1 are raised to 1 so the delay
    /// never shrinks between retries.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = if multiplier.is_finite() {
            multiplier.max(1.0)
        } else {
            1.0
        };
        self
    }

    /// Caps every delay at `max_delay`.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, retry: u32) -> Duration {
        if self.initial.is_zero() {
            return Duration::ZERO;
        }

        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.multiplier.powi(exponent);
        let secs = self.initial.as_secs_f64() * factor;

        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);

        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

/// Randomizes another backoff by up to `factor` in either direction.
///
/// A factor of 0.25 spreads each delay uniformly over 75%..=125% of the
/// inner value.
#[derive(Debug, Clone)]
pub struct JitteredBackoff<B> {
    inner: B,
    factor: f64,
}

impl<B> JitteredBackoff<B> {
    /// Wraps `inner`; `factor` is clamped to `0.0..=1.0`.
    pub fn new(inner: B, factor: f64) -> Self {
        let factor = if factor.is_finite() {
            factor.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { inner, factor }
    }
}

impl<B: Backoff> Backoff for JitteredBackoff<B> {
    fn delay(&self, retry: u32) -> Duration {
        use rand::Rng;

        let base = self.inner.delay(retry).as_secs_f64();
        let spread = base * self.factor;
        if spread <= 0.0 || !spread.is_finite() {
            return self.inner.delay(retry);
        }
        let secs = rand::rng().random_range((base - spread)..=(base + spread));
        Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

/// Closure-backed backoff.
pub struct FnBackoff<F> {
    f: F,
}

impl<F> FnBackoff<F>
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    /// Creates a backoff from a function of the retry number.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Backoff for FnBackoff<F>
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn delay(&self, retry: u32) -> Duration {
        (self.f)(retry)
    }
}
