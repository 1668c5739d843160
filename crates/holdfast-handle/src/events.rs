use crate::state::HandleState;
use holdfast_core::events::HoldfastEvent;
use std::time::Instant;

/// Events describing a handle's lifecycle.
#[derive(Debug, Clone)]
pub enum HandleEvent {
    /// The handle object was built. No connection exists yet.
    Constructed { source: String, timestamp: Instant },
    /// The handle changed state.
    StateTransition {
        source: String,
        timestamp: Instant,
        from: HandleState,
        to: HandleState,
    },
    /// Connect succeeded after `attempts` attempts.
    Connected {
        source: String,
        timestamp: Instant,
        attempts: u32,
    },
    /// Connect gave up.
    ConnectFailed {
        source: String,
        timestamp: Instant,
        attempts: u32,
        cause: String,
    },
    /// An operation failed for good.
    OperationFailed {
        source: String,
        timestamp: Instant,
        attempts: u32,
        cause: String,
    },
    /// An operation arrived after shutdown began and was refused.
    OperationRejected { source: String, timestamp: Instant },
    /// Shutdown started releasing the handle.
    ShutdownStarted { source: String, timestamp: Instant },
    /// The handle was released.
    Released { source: String, timestamp: Instant },
    /// Releasing the handle failed. The handle is closed regardless.
    ReleaseFailed {
        source: String,
        timestamp: Instant,
        cause: String,
    },
}

impl HoldfastEvent for HandleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            HandleEvent::Constructed { .. } => "constructed",
            HandleEvent::StateTransition { .. } => "state_transition",
            HandleEvent::Connected { .. } => "connected",
            HandleEvent::ConnectFailed { .. } => "connect_failed",
            HandleEvent::OperationFailed { .. } => "operation_failed",
            HandleEvent::OperationRejected { .. } => "operation_rejected",
            HandleEvent::ShutdownStarted { .. } => "shutdown_started",
            HandleEvent::Released { .. } => "released",
            HandleEvent::ReleaseFailed { .. } => "release_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            HandleEvent::Constructed { timestamp, .. }
            | HandleEvent::StateTransition { timestamp, .. }
            | HandleEvent::Connected { timestamp, .. }
            | HandleEvent::ConnectFailed { timestamp, .. }
            | HandleEvent::OperationFailed { timestamp, .. }
            | HandleEvent::OperationRejected { timestamp, .. }
            | HandleEvent::ShutdownStarted { timestamp, .. }
            | HandleEvent::Released { timestamp, .. }
            | HandleEvent::ReleaseFailed { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            HandleEvent::Constructed { source, .. }
            | HandleEvent::StateTransition { source, .. }
            | HandleEvent::Connected { source, .. }
            | HandleEvent::ConnectFailed { source, .. }
            | HandleEvent::OperationFailed { source, .. }
            | HandleEvent::OperationRejected { source, .. }
            | HandleEvent::ShutdownStarted { source, .. }
            | HandleEvent::Released { source, .. }
            | HandleEvent::ReleaseFailed { source, .. } => source,
        }
    }

    fn attempt(&self) -> Option<u32> {
        match self {
            HandleEvent::Connected { attempts, .. }
            | HandleEvent::ConnectFailed { attempts, .. }
            | HandleEvent::OperationFailed { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    fn is_failure(&self) -> bool {
        matches!(
            self,
            HandleEvent::ConnectFailed { .. }
                | HandleEvent::OperationFailed { .. }
                | HandleEvent::OperationRejected { .. }
                | HandleEvent::ReleaseFailed { .. }
        )
    }
}
