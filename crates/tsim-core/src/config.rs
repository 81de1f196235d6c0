//! Top-level simulation configuration.
//!
//! The config is consumed, not owned, by the engine: applications load it
//! from whatever source they like (TOML, CLI, hard-coded test fixtures) and
//! hand it to the builder.  No file formats live in the core.

use rustc_hash::FxHashMap;

use crate::{Mode, SimTime};

// ── TeleportParams ────────────────────────────────────────────────────────────

/// Speed model for a teleported (non-network) mode.
///
/// When a teleported leg carries no explicit travel time, its duration is
/// `distance * beeline_factor / speed`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TeleportParams {
    /// Travel speed in metres per second.
    pub speed: f64,
    /// Multiplier converting beeline distance to route distance (≥ 1.0).
    pub beeline_factor: f64,
}

impl TeleportParams {
    /// Expected travel time in whole seconds for a beeline `distance` metres.
    pub fn travel_time(&self, distance: f64) -> u32 {
        (distance * self.beeline_factor / self.speed).ceil() as u32
    }
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Simulation run parameters.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// First simulated second.  Agents whose activities end earlier depart
    /// in the first tick.
    pub start_time: SimTime,

    /// Horizon (exclusive).  The loop also ends earlier once no live agents
    /// remain.
    pub end_time: SimTime,

    /// Seconds per tick.  Must be ≥ 1.  All queueing arithmetic is scaled by
    /// this value; 1 s is the usual choice for traffic scenarios.
    pub timestep: u32,

    /// Master RNG seed.  The same seed and worker count always produce an
    /// identical event stream.
    pub seed: u64,

    /// Worker partition count for the parallel engine.  The single-threaded
    /// engine ignores this.
    pub num_partitions: usize,

    /// Emit a status log line every this many simulated seconds.
    /// 0 disables status logging.
    pub status_interval: u32,

    /// Seconds a vehicle may sit at the head of a blocked buffer before it
    /// is discarded as stuck.  `u32::MAX` disables stuck handling.
    pub stuck_threshold: u32,

    /// Per-mode teleportation parameters.  Legs in modes missing from this
    /// map fall back to [`SimConfig::DEFAULT_TELEPORT`].
    pub teleport: FxHashMap<Mode, TeleportParams>,
}

impl SimConfig {
    /// Fallback for teleported legs whose mode has no configured params:
    /// walking speed with the customary beeline correction.
    pub const DEFAULT_TELEPORT: TeleportParams = TeleportParams {
        speed: 1.34,
        beeline_factor: 1.3,
    };

    /// Teleport parameters for `mode`, falling back to the walk-like default.
    pub fn teleport_params(&self, mode: Mode) -> TeleportParams {
        self.teleport
            .get(&mode)
            .copied()
            .unwrap_or(Self::DEFAULT_TELEPORT)
    }
}

impl Default for SimConfig {
    /// A full-day, 1 s timestep, single-partition run with walk and bike
    /// teleportation preconfigured.
    fn default() -> Self {
        let mut teleport = FxHashMap::default();
        teleport.insert(Mode::Walk, TeleportParams { speed: 1.34, beeline_factor: 1.3 });
        teleport.insert(Mode::Bike, TeleportParams { speed: 4.17, beeline_factor: 1.3 });
        Self {
            start_time:      SimTime::ZERO,
            end_time:        SimTime::from_hms(36, 0, 0),
            timestep:        1,
            seed:            4711,
            num_partitions:  1,
            status_interval: 3_600,
            stuck_threshold: u32::MAX,
            teleport,
        }
    }
}
