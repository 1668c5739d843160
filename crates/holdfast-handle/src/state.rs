//! Connection state tracking for handles.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Connection state of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleState {
    /// Built but never connected.
    Unconnected,
    /// The last connect succeeded.
    Connected,
    /// The last connect exhausted its attempts.
    Failed,
    /// Released by shutdown. Terminal.
    Closed,
}

impl HandleState {
    /// Returns the state name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            HandleState::Unconnected => "unconnected",
            HandleState::Connected => "connected",
            HandleState::Failed => "failed",
            HandleState::Closed => "closed",
        }
    }

    pub(crate) fn encode(self) -> u8 {
        match self {
            HandleState::Unconnected => 0,
            HandleState::Connected => 1,
            HandleState::Failed => 2,
            HandleState::Closed => 3,
        }
    }

    fn decode(encoded: u8) -> Self {
        match encoded {
            0 => HandleState::Unconnected,
            1 => HandleState::Connected,
            2 => HandleState::Failed,
            _ => HandleState::Closed,
        }
    }
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic cell holding a [`HandleState`].
///
/// `Closed` is terminal: once stored, later transitions are ignored.
pub(crate) struct StateCell {
    state: AtomicU8,
}

impl StateCell {
    pub(crate) fn new(initial: HandleState) -> Self {
        Self {
            state: AtomicU8::new(initial.encode()),
        }
    }

    pub(crate) fn get(&self) -> HandleState {
        HandleState::decode(self.state.load(Ordering::Acquire))
    }

    /// Moves to `next` unless the cell is closed. Returns the previous state
    /// when the transition happened.
    pub(crate) fn transition(&self, next: HandleState) -> Option<HandleState> {
        let closed = HandleState::Closed.encode();
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if current == closed {
                    None
                } else {
                    Some(next.encode())
                }
            })
            .ok()
            .map(HandleState::decode)
    }
}

impl fmt::Debug for StateCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateCell").field(&self.get()).finish()
    }
}
