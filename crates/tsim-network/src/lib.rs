//! `tsim-network` — the capacitated queueing network.
//!
//! # Crate layout
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`network`]     | `Network`, `NetworkBuilder` — static graph description|
//! | [`flow_cap`]    | `FlowCap` — buffer discharge budget                   |
//! | [`storage_cap`] | `StorageCap` — atomic occupancy accounting            |
//! | [`stuck_timer`] | `StuckTimer` — blocked-buffer watchdog                |
//! | [`link`]        | `SimLink` — traveling queue, buffer, entry inbox      |
//! | [`node`]        | `SimNode` — the per-node transfer step                |
//! | [`transfer`]    | `TransferHub` — the only cross-thread write paths     |
//! | [`partition`]   | `SimNetworkPartition` — active sets, move phases      |
//! | [`change`]      | `NetworkChange` — time-variant capacity feed          |
//!
//! # Queueing model
//!
//! Each link holds vehicles in three stages:
//!
//! ```text
//!            waiting_to_enter (any thread)    traveling        buffer
//! push ──────────────────────────────────▶ [exit-time queue] ▶ [FIFO] ──▶ node
//!                 drained once per tick      pops when          gated by
//!                 by the owning partition    exit_time ≤ now    FlowCap
//! ```
//!
//! Storage capacity is consumed when a vehicle is admitted (reserved before
//! the push, atomically) and released when the downstream node pops it from
//! the buffer — so a full link rejects admissions until its congestion
//! clears (spillback).
//!
//! # Ownership
//!
//! A link lives with the partition of its **to-node**: every buffer pop the
//! node transfer performs is then partition-local.  The only structures
//! other threads touch are the entry inbox (a multi-producer channel), the
//! atomic storage gate, and the per-partition activation channels — all
//! bundled in [`TransferHub`].

pub mod change;
pub mod flow_cap;
pub mod link;
pub mod network;
pub mod node;
pub mod partition;
pub mod storage_cap;
pub mod stuck_timer;
pub mod transfer;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use change::NetworkChange;
pub use flow_cap::FlowCap;
pub use link::SimLink;
pub use network::{storage_for_geometry, Link, Network, NetworkBuilder, Node};
pub use node::{SimNode, VehicleExit};
pub use partition::{build_partitions, SimNetworkPartition};
pub use storage_cap::StorageCap;
pub use stuck_timer::StuckTimer;
pub use transfer::TransferHub;
