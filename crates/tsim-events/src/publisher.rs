//! `EventHandler` and `EventsPublisher`.
//!
//! The publisher is the single dispatch point between the engine and
//! whatever consumes events (writers, scorers, test collectors).  Each
//! execution context owns exactly one publisher: the single-threaded engine
//! holds one, the parallel engine gives each worker partition its own plus
//! one for the coordinator, so publishing never synchronises between
//! threads.

use crate::Event;

/// A consumer of simulation events.
///
/// `Send` so handlers can live inside worker partitions.  Implementations
/// may buffer and write asynchronously, but `handle` itself must return
/// promptly — it runs on the simulation hot path.
pub trait EventHandler: Send {
    fn handle(&mut self, event: &Event);

    /// Called once after the simulation loop ends; flush buffers here.
    fn finish(&mut self) {}
}

/// Dispatches each published event to every registered handler, in
/// registration order.
#[derive(Default)]
pub struct EventsPublisher {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl EventsPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler.  Handlers are invoked in registration order.
    pub fn add_handler<H: EventHandler + 'static>(&mut self, handler: H) {
        self.handlers.push(Box::new(handler));
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Publish one event to all handlers.
    pub fn publish(&mut self, event: Event) {
        for handler in &mut self.handlers {
            handler.handle(&event);
        }
    }

    /// Signal end-of-run to all handlers.
    pub fn finish(&mut self) {
        for handler in &mut self.handlers {
            handler.finish();
        }
    }
}

impl std::fmt::Debug for EventsPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventsPublisher({} handlers)", self.handlers.len())
    }
}
