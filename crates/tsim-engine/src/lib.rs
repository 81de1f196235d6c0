//! `tsim-engine` — the time-advance loops.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                |
//! |----------------|---------------------------------------------------------|
//! | [`time_queue`] | `TimeQueue<T>` — min-heap with deterministic tie-break  |
//! | [`dispatcher`] | `AgentDispatcher` — activity ends, departures, arrivals |
//! | [`builder`]    | `SimulationBuilder` — validated construction            |
//! | [`simulation`] | `Simulation` — the single-threaded tick loop            |
//! | [`parallel`]   | `ParallelSimulation` — partitioned six-barrier protocol |
//! | [`error`]      | `EngineError`, `EngineResult`                           |
//!
//! # Tick structure (single-threaded)
//!
//! ```text
//! for t in start..end while any agent is live:
//!   ① teleport arrivals    — pop agents whose off-network leg completed
//!   ② activity ends        — retry deferred departures, then wake agents
//!   ③ move nodes           — transfer vehicles across intersections
//!   ④ move links           — drain entry queues, advance travel, fill buffers
//!   ⑤ process exits        — arrivals and stuck discards back to the plans
//! ```
//!
//! The parallel engine runs ③/④ across worker partitions under a six-phase
//! barrier protocol; ①/②/⑤ stay with the coordinator thread, which owns the
//! two global scheduling queues.

pub mod builder;
pub mod dispatcher;
pub mod error;
pub mod parallel;
pub mod simulation;
pub mod time_queue;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use builder::SimulationBuilder;
pub use dispatcher::{AgentCounts, AgentDispatcher};
pub use error::{EngineError, EngineResult};
pub use parallel::ParallelSimulation;
pub use simulation::{Simulation, SimulationSummary};
pub use time_queue::TimeQueue;
