//! Publish/subscribe event bus
//!
//! Components and systems talk through an [`EventBus`] without holding
//! references to each other. Events are keyed by a string type and carry an
//! optional shared payload. They are either delivered immediately or queued
//! and delivered in FIFO order when the frame driver calls
//! [`EventBus::process_events`].
//!
//! The bus is an explicit object. Share it with `Arc<EventBus>`.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::resource_error::BoxError;

/// Shared, type-erased event payload
pub type Payload = Arc<dyn Any + Send + Sync>;

type Listener = Arc<dyn Fn(&Event) -> Result<(), BoxError> + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// An event: a type string and an optional payload
#[derive(Clone)]
pub struct Event {
    event_type: String,
    payload: Option<Payload>,
}

impl Event {
    pub fn new(event_type: impl Into<String>, payload: Option<Payload>) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }

    #[inline]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Borrow the payload as `T`, if there is one of that type
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref()?.downcast_ref::<T>()
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

/// Thread-safe publish/subscribe bus
///
/// Listener lists are snapshotted before delivery and no lock is held while
/// a listener runs, so listeners may subscribe, unsubscribe or queue events.
pub struct EventBus {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<String, Vec<(ListenerId, Listener)>>>,
    queue: Mutex<VecDeque<Event>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            listeners: Mutex::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Register a listener for one event type
    ///
    /// A listener returning an error is logged; delivery to the remaining
    /// listeners continues.
    pub fn subscribe<F>(&self, event_type: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&Event) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .entry(event_type.into())
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered for `event_type`.
    pub fn unsubscribe(&self, event_type: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(list) = listeners.get_mut(event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|(listener_id, _)| *listener_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(event_type);
        }
        removed
    }

    /// Number of listeners registered for an event type
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners.lock().get(event_type).map_or(0, Vec::len)
    }

    /// Queue an event for the next [`process_events`](Self::process_events)
    pub fn queue(&self, event_type: impl Into<String>, payload: Option<Payload>) {
        self.queue.lock().push_back(Event::new(event_type, payload));
    }

    /// Number of events waiting in the queue
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Deliver an event to its listeners right away, bypassing the queue
    ///
    /// Returns the number of listeners that handled it without error.
    pub fn emit_immediate(&self, event_type: impl Into<String>, payload: Option<Payload>) -> usize {
        self.dispatch(&Event::new(event_type, payload))
    }

    /// Deliver queued events in FIFO order until the queue is empty
    ///
    /// Events queued by listeners during processing are delivered in the
    /// same call. Returns the number of events delivered.
    pub fn process_events(&self) -> usize {
        let mut processed = 0;
        loop {
            // Pop under the lock, dispatch without it
            let next = self.queue.lock().pop_front();
            let Some(event) = next else {
                break;
            };
            self.dispatch(&event);
            processed += 1;
        }
        processed
    }

    /// Drop every listener and queued event
    pub fn clear(&self) {
        self.listeners.lock().clear();
        self.queue.lock().clear();
    }

    fn dispatch(&self, event: &Event) -> usize {
        let snapshot: Vec<Listener> = match self.listeners.lock().get(event.event_type()) {
            Some(list) => list.iter().map(|(_, listener)| listener.clone()).collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for listener in snapshot {
            match listener(event) {
                Ok(()) => delivered += 1,
                Err(err) => log::error!("Error processing event '{}': {}", event.event_type(), err),
            }
        }
        delivered
    }
}
