//! `tsim-events` — immutable event records and the publisher sink.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                |
//! |---------------|---------------------------------------------------------|
//! | [`event`]     | `Event` — one closed sum type for all state transitions |
//! | [`publisher`] | `EventHandler`, `EventsPublisher`                       |
//! | [`collector`] | `EventBuffer`, `SharedEventBuffer`, `EventCounter`      |
//!
//! # Contract
//!
//! Events are produced, never mutated, by engine transitions and published
//! synchronously at the point of the transition.  Handlers must not block
//! the publishing thread indefinitely.  Timestamps are monotonic per agent;
//! no global order across worker partitions is guaranteed or required.

pub mod collector;
pub mod event;
pub mod publisher;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use collector::{EventBuffer, EventCounter, SharedEventBuffer};
pub use event::Event;
pub use publisher::{EventHandler, EventsPublisher};
