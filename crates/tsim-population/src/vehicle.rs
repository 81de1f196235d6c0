//! `SimVehicle` and `VehicleType`.
//!
//! A vehicle exists only while its driver executes a network leg: the engine
//! wraps the agent into a `SimVehicle` at departure and unwraps it at
//! arrival.  The vehicle carries a copy of the leg's link sequence and its
//! own position in it, so the network crates never need to reach back into
//! the plan while the vehicle is in their containers.

use tsim_core::{LinkId, Mode, PersonId, VehicleId};

use crate::SimAgent;

// ── VehicleType ───────────────────────────────────────────────────────────────

/// Physical vehicle parameters shared by capacity accounting and link
/// traversal.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleType {
    /// Passenger-car equivalents consumed from flow and storage capacity.
    pub pce: f64,
    /// Maximum speed in m/s; caps the link freespeed when lower.
    pub max_v: f64,
}

impl Default for VehicleType {
    /// An ordinary passenger car: 1 PCE, no meaningful speed cap.
    fn default() -> Self {
        Self { pce: 1.0, max_v: f64::INFINITY }
    }
}

// ── SimVehicle ────────────────────────────────────────────────────────────────

/// A vehicle in the network, owning its driver for the duration of the leg.
#[derive(Debug)]
pub struct SimVehicle {
    pub id: VehicleId,
    pub pce: f64,
    pub max_v: f64,
    /// Mode of the leg being driven (labels events).
    pub mode: Mode,
    route: Vec<LinkId>,
    route_index: usize,
    driver: SimAgent,
}

impl SimVehicle {
    /// Wrap `driver` for a network leg over `route`.
    ///
    /// `route` must be non-empty — the dispatcher aborts agents with empty
    /// network routes before constructing a vehicle.
    pub fn new(vtype: VehicleType, mode: Mode, route: Vec<LinkId>, driver: SimAgent) -> Self {
        debug_assert!(!route.is_empty());
        Self {
            id: VehicleId::from(driver.id),
            pce: vtype.pce,
            max_v: vtype.max_v,
            mode,
            route,
            route_index: 0,
            driver,
        }
    }

    // ── Route position ────────────────────────────────────────────────────

    /// The link the vehicle currently occupies.
    #[inline]
    pub fn current_link(&self) -> LinkId {
        self.route[self.route_index]
    }

    /// `true` when the current link is the route's last — the vehicle wants
    /// to arrive here rather than cross the downstream node.
    #[inline]
    pub fn is_on_last_link(&self) -> bool {
        self.route_index + 1 == self.route.len()
    }

    /// The link the vehicle will move onto next, or `None` at end of route.
    #[inline]
    pub fn next_link(&self) -> Option<LinkId> {
        self.route.get(self.route_index + 1).copied()
    }

    /// Advance onto the next route link.  Caller must have checked
    /// [`next_link`](Self::next_link).
    #[inline]
    pub fn advance_route(&mut self) {
        debug_assert!(self.route_index + 1 < self.route.len());
        self.route_index += 1;
    }

    // ── Driver access ─────────────────────────────────────────────────────

    pub fn driver_id(&self) -> PersonId {
        self.driver.id
    }

    pub fn driver(&self) -> &SimAgent {
        &self.driver
    }

    /// Dissolve the vehicle, handing the driver back to the engine.
    pub fn into_driver(self) -> SimAgent {
        self.driver
    }
}
