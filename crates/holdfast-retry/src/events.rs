use holdfast_core::events::HoldfastEvent;
use std::time::{Duration, Instant};

/// Events emitted by a [`Retrier`](crate::Retrier).
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// An attempt failed and another one will follow after `delay`.
    Retry {
        source: String,
        timestamp: Instant,
        /// The attempt that just failed (1-indexed).
        attempt: u32,
        delay: Duration,
        cause: String,
    },
    /// The call succeeded, on the first try or after retries.
    Success {
        source: String,
        timestamp: Instant,
        attempts: u32,
    },
    /// Every permitted attempt failed.
    Exhausted {
        source: String,
        timestamp: Instant,
        attempts: u32,
        cause: String,
    },
    /// An attempt failed with an error the policy does not retry.
    NotRetried {
        source: String,
        timestamp: Instant,
        attempt: u32,
        cause: String,
    },
}

impl HoldfastEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::NotRetried { .. } => "not_retried",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::NotRetried { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            RetryEvent::Retry { source, .. }
            | RetryEvent::Success { source, .. }
            | RetryEvent::Exhausted { source, .. }
            | RetryEvent::NotRetried { source, .. } => source,
        }
    }

    fn attempt(&self) -> Option<u32> {
        match self {
            RetryEvent::Retry { attempt, .. } | RetryEvent::NotRetried { attempt, .. } => {
                Some(*attempt)
            }
            RetryEvent::Success { attempts, .. } | RetryEvent::Exhausted { attempts, .. } => {
                Some(*attempts)
            }
        }
    }

    fn is_failure(&self) -> bool {
        !matches!(self, RetryEvent::Success { .. })
    }
}
