//! `tsim-core` — foundational types for the `rust_tsim` traffic
//! microsimulation framework.
//!
//! This crate is a dependency of every other `tsim-*` crate.  It
//! intentionally has no `tsim-*` dependencies and minimal external ones
//! (`rand`, `rustc-hash` and `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module     | Contents                                             |
//! |------------|------------------------------------------------------|
//! | [`ids`]    | `LinkId`, `NodeId`, `PersonId`, `VehicleId`          |
//! | [`time`]   | `SimTime` — seconds since midnight, `NEVER` sentinel |
//! | [`mode`]   | `Mode` enum (car, walk, bike, pt)                    |
//! | [`config`] | `SimConfig`, `TeleportParams`                        |
//! | [`rng`]    | `SimRng` — deterministic seeded RNG                  |
//! | [`error`]  | `CoreError`, `CoreResult`                            |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                              |
//! |---------|-----------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types. |

pub mod config;
pub mod error;
pub mod ids;
pub mod mode;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{SimConfig, TeleportParams};
pub use error::{CoreError, CoreResult};
pub use ids::{LinkId, NodeId, PersonId, VehicleId};
pub use mode::Mode;
pub use rng::SimRng;
pub use time::SimTime;
