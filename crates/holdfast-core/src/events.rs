//! Event system for handle and retry observability.
//!
//! Every failed attempt and every terminal failure is turned into a typed
//! event and handed to the registered listeners, so an application can route
//! them to whatever sink it uses.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Trait for events emitted by holdfast components.
pub trait HoldfastEvent: Send + Sync + fmt::Debug {
    /// Returns the kind of event (e.g., "retry", "exhausted", "released").
    fn event_type(&self) -> &'static str;

    /// Returns when this event occurred.
    fn timestamp(&self) -> Instant;

    /// Returns the name of the component instance that emitted this event.
    fn source(&self) -> &str;

    /// Returns the attempt number this event refers to, if any.
    fn attempt(&self) -> Option<u32> {
        None
    }

    /// Returns true when the event reports a failure.
    fn is_failure(&self) -> bool {
        false
    }
}

/// Trait for listening to holdfast events.
pub trait EventListener<E: HoldfastEvent>: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &E);
}

/// Type alias for shared event listeners.
pub type SharedEventListener<E> = Arc<dyn EventListener<E>>;

/// An ordered collection of event listeners.
#[derive(Clone)]
pub struct EventListeners<E: HoldfastEvent> {
    listeners: Vec<SharedEventListener<E>>,
}

impl<E: HoldfastEvent> EventListeners<E> {
    /// Creates a new empty listener collection.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Adds a listener to the collection.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Adds an already shared listener to the collection.
    pub fn add_shared(&mut self, listener: SharedEventListener<E>) {
        self.listeners.push(listener);
    }

    /// Emits an event to every registered listener, in registration order.
    ///
    /// A panicking listener is contained so the remaining listeners still
    /// receive the event.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
        }
    }

    /// Iterates over the registered listeners.
    pub fn iter(&self) -> impl Iterator<Item = &SharedEventListener<E>> {
        self.listeners.iter()
    }

    /// Returns true if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Returns the number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: HoldfastEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: HoldfastEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// A closure-backed event listener.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    /// Creates a new closure-backed listener.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: HoldfastEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}

/// A listener that keeps a copy of every event it sees.
///
/// Clones share the same log, so one clone can be registered while another
/// is inspected.
#[derive(Clone)]
pub struct EventLog<E> {
    events: Arc<Mutex<Vec<E>>>,
}

impl<E: Clone> EventLog<E> {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<E> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns how many recorded events have the given type.
    pub fn count(&self, event_type: &str) -> usize
    where
        E: HoldfastEvent,
    {
        self.events()
            .iter()
            .filter(|event| event.event_type() == event_type)
            .count()
    }
}

impl<E: Clone> Default for EventLog<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventListener<E> for EventLog<E>
where
    E: HoldfastEvent + Clone,
{
    fn on_event(&self, event: &E) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}

/// A listener that forwards events to `tracing`.
///
/// Failures are recorded at `warn`, everything else at `debug`.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

#[cfg(feature = "tracing")]
impl<E: HoldfastEvent> EventListener<E> for TracingListener {
    fn on_event(&self, event: &E) {
        if event.is_failure() {
            tracing::warn!(
                source = event.source(),
                kind = event.event_type(),
                attempt = event.attempt(),
                event = ?event,
                "holdfast failure event"
            );
        } else {
            tracing::debug!(
                source = event.source(),
                kind = event.event_type(),
                attempt = event.attempt(),
                "holdfast event"
            );
        }
    }
}
