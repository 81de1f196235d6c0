//! Transport mode enum shared across all simulation crates.
//!
//! Whether a leg runs on the network or is teleported is decided by the
//! leg's route kind, not by the mode; the mode selects teleportation
//! parameters and labels events.

/// The means by which an agent travels a leg.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Mode {
    /// Private vehicle, simulated on the network graph.
    #[default]
    Car,
    /// On foot.
    Walk,
    /// Bicycle.
    Bike,
    /// Scheduled public transit.
    Pt,
}

impl Mode {
    /// Human-readable label, used in events and log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Car  => "car",
            Mode::Walk => "walk",
            Mode::Bike => "bike",
            Mode::Pt   => "pt",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
