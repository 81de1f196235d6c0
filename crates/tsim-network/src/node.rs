//! `SimNode` — the per-node transfer step.
//!
//! Each tick an active node moves vehicles out of its incoming links'
//! buffers: end-of-route vehicles exit the network, everything else is
//! offered to the downstream link of its route.  Incoming links are visited
//! in round-robin order rotated by tick so no link is systematically served
//! first.

use rustc_hash::FxHashMap;

use tsim_core::{LinkId, NodeId, SimTime};
use tsim_events::{Event, EventsPublisher};
use tsim_population::SimVehicle;

use crate::{SimLink, TransferHub};

// ── VehicleExit ───────────────────────────────────────────────────────────────

/// A vehicle the node phase removed from the network, handed back to the
/// engine's agent dispatcher.
#[derive(Debug)]
pub enum VehicleExit {
    /// Route completed at its final link.
    Arrived { vehicle: SimVehicle },
    /// Blocked at a buffer head beyond the stuck threshold and discarded.
    Stuck { vehicle: SimVehicle },
}

// ── SimNode ───────────────────────────────────────────────────────────────────

/// The runtime state of one node.
#[derive(Debug)]
pub struct SimNode {
    pub id: NodeId,
    /// Incoming links, all owned by this node's partition.
    pub in_links: Vec<LinkId>,
    /// Membership flag for the partition's active-node set.
    pub(crate) active: bool,
}

impl SimNode {
    pub(crate) fn new(id: NodeId, in_links: Vec<LinkId>) -> Self {
        Self { id, in_links, active: false }
    }

    /// Transfer vehicles from incoming buffers.  Returns `false` when every
    /// incoming buffer is empty afterwards — the node then leaves the
    /// active set until a link reactivates it.
    ///
    /// `rotation` selects which incoming link is served first this tick.
    pub(crate) fn move_node(
        &self,
        links: &mut FxHashMap<LinkId, SimLink>,
        hub: &mut TransferHub,
        events: &mut EventsPublisher,
        exits: &mut Vec<VehicleExit>,
        now: SimTime,
        rotation: usize,
    ) -> bool {
        let n = self.in_links.len();
        if n == 0 {
            return false;
        }

        for i in 0..n {
            let in_id = self.in_links[(rotation + i) % n];
            let link = links
                .get_mut(&in_id)
                .expect("incoming link owned by node's partition");
            Self::drain_in_link(link, hub, events, exits, now);
        }

        self.in_links
            .iter()
            .any(|id| links.get(id).is_some_and(|l| l.has_buffered()))
    }

    /// Move vehicles off one incoming link until it stops offering or its
    /// head cannot proceed.
    fn drain_in_link(
        link: &mut SimLink,
        hub: &mut TransferHub,
        events: &mut EventsPublisher,
        exits: &mut Vec<VehicleExit>,
        now: SimTime,
    ) {
        loop {
            let Some(offered) = link.offers_veh(now) else {
                return;
            };

            // End of route: deliver the vehicle instead of transferring it.
            if offered.is_on_last_link() {
                let vehicle = link.pop_buffer().expect("offered head present");
                events.publish(Event::VehicleLeavesTraffic {
                    time: now,
                    person: vehicle.driver_id(),
                    vehicle: vehicle.id,
                    link: link.id,
                    mode: vehicle.mode,
                });
                exits.push(VehicleExit::Arrived { vehicle });
                continue;
            }

            let next = offered
                .next_link()
                .expect("non-final route position has a next link");
            let pce = offered.pce;

            if hub.try_reserve(next, pce) {
                let mut vehicle = link.pop_buffer().expect("offered head present");
                events.publish(Event::LinkLeave {
                    time: now,
                    vehicle: vehicle.id,
                    link: link.id,
                });
                vehicle.advance_route();
                events.publish(Event::LinkEnter {
                    time: now,
                    vehicle: vehicle.id,
                    link: next,
                });
                hub.push(next, vehicle);
            } else if link.is_veh_stuck(now) {
                // Blocked beyond the threshold: discard rather than stall a
                // grid-locked cycle forever.
                let vehicle = link.pop_buffer().expect("offered head present");
                events.publish(Event::PersonStuck {
                    time: now,
                    person: vehicle.driver_id(),
                    link: link.id,
                    mode: Some(vehicle.mode),
                });
                exits.push(VehicleExit::Stuck { vehicle });
            } else {
                // Downstream full: spillback, retry on a later tick.
                return;
            }
        }
    }
}
