//! `tsim-population` — plans, the agent state machine, and vehicles.
//!
//! # Crate layout
//!
//! | Module         | Contents                                              |
//! |----------------|-------------------------------------------------------|
//! | [`plan`]       | `Activity`, `Leg`, `Route`, `Plan`, `PlanBuilder`     |
//! | [`agent`]      | `SimAgent` — the per-agent driver state machine       |
//! | [`vehicle`]    | `SimVehicle`, `VehicleType`                           |
//! | [`population`] | `Person`, `Population` — the scenario input contract  |
//! | [`error`]      | `PlanError`                                           |
//!
//! # Agent lifecycle
//!
//! ```text
//! AtActivity ─(activity end)→ Departing ─┬→ OnLink ────┐ (network leg)
//!                                        └→ Teleporting┤ (everything else)
//!        ┌───────────────────────────────(arrival)─────┘
//!        └→ AtActivity → … → Arrived        Aborted reachable from any state
//! ```
//!
//! The engine owns the scheduling; this crate only models the plan cursor
//! and the legal transitions.  Routes are resolved upstream — this crate
//! never computes paths.

pub mod agent;
pub mod error;
pub mod plan;
pub mod population;
pub mod vehicle;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use agent::{AgentState, NextStep, SimAgent};
pub use error::{PlanError, PlanResult};
pub use plan::{Activity, Leg, Plan, PlanBuilder, PlanElement, Route};
pub use population::{Person, Population};
pub use vehicle::{SimVehicle, VehicleType};
