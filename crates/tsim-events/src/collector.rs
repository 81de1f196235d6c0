//! In-memory event collectors for tests and analysis.

use std::sync::{Arc, Mutex};

use crate::{Event, EventHandler};

// ── EventBuffer ───────────────────────────────────────────────────────────────

/// Collects every published event into a `Vec`, in publish order.
#[derive(Default)]
pub struct EventBuffer {
    pub events: Vec<Event>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventHandler for EventBuffer {
    fn handle(&mut self, event: &Event) {
        self.events.push(event.clone());
    }
}

// ── SharedEventBuffer ─────────────────────────────────────────────────────────

/// A cloneable handle to one shared event vector.
///
/// Register a clone with several publishers (one per worker partition) to
/// aggregate a whole parallel run into a single collection.  Lock
/// contention is irrelevant at test scale; production sinks should instead
/// write per-partition and merge offline.
#[derive(Clone, Default)]
pub struct SharedEventBuffer {
    inner: Arc<Mutex<Vec<Event>>>,
}

impl SharedEventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events collected so far, in publish order per
    /// publisher (interleaving across publishers is unspecified).
    pub fn snapshot(&self) -> Vec<Event> {
        self.inner.lock().expect("event buffer poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("event buffer poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventHandler for SharedEventBuffer {
    fn handle(&mut self, event: &Event) {
        self.inner
            .lock()
            .expect("event buffer poisoned")
            .push(event.clone());
    }
}

// ── EventCounter ──────────────────────────────────────────────────────────────

/// Counts events without storing them.
#[derive(Default)]
pub struct EventCounter {
    pub total: u64,
}

impl EventHandler for EventCounter {
    fn handle(&mut self, _event: &Event) {
        self.total += 1;
    }
}
