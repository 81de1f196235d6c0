//! `Simulation` — the single-threaded time-advance loop.

use tsim_core::{SimConfig, SimTime};
use tsim_events::EventsPublisher;
use tsim_network::{SimNetworkPartition, TransferHub, VehicleExit};

use crate::dispatcher::{AgentCounts, AgentDispatcher};

// ── SimulationSummary ─────────────────────────────────────────────────────────

/// End-of-run statistics returned by both engines.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SimulationSummary {
    /// Agents that completed their whole plan.
    pub arrived: usize,
    /// Agents removed without completing (invalid routes, stuck vehicles,
    /// end-of-run flushes).
    pub aborted: usize,
    /// Agents parked at an open-ended activity.
    pub parked: usize,
    /// First tick at which the loop observed its terminal condition.
    pub end_time: SimTime,
}

// ── Simulation ────────────────────────────────────────────────────────────────

/// The single-threaded engine: one network partition, one events publisher,
/// and the shared agent dispatcher, advanced tick by tick.
///
/// Construct via [`SimulationBuilder`][crate::SimulationBuilder].
pub struct Simulation {
    pub(crate) config: SimConfig,
    pub(crate) dispatcher: AgentDispatcher,
    pub(crate) partition: SimNetworkPartition,
    /// Coordinator-context hub for departures.
    pub(crate) hub: TransferHub,
    /// Partition-context hub for node transfers.  Kept separate so entry
    /// ordering on shared links matches the parallel engine exactly.
    pub(crate) net_hub: TransferHub,
    pub(crate) events: EventsPublisher,
    pub(crate) now: SimTime,
    pub(crate) next_status: SimTime,
}

impl Simulation {
    /// Run until no live agents remain or the configured horizon is
    /// reached, then flush stragglers as stuck and finish the event sink.
    pub fn run(&mut self) -> SimulationSummary {
        log::info!(
            "simulation start at {} with {} live agents",
            self.now,
            self.dispatcher.live()
        );

        while self.dispatcher.live() > 0 && self.now < self.config.end_time {
            self.tick();
            self.now = self.now.offset(self.config.timestep);
        }

        self.cleanup()
    }

    /// Advance exactly `n` ticks, ignoring the terminal condition.  Useful
    /// for tests that inspect state at tick boundaries.
    pub fn run_ticks(&mut self, n: u64) {
        for _ in 0..n {
            self.tick();
            self.now = self.now.offset(self.config.timestep);
        }
    }

    /// One tick: teleport arrivals, activity ends, node transfers, link
    /// advances, then arrivals back into the plans.
    fn tick(&mut self) {
        let now = self.now;

        self.dispatcher.handle_teleport_arrivals(now, &mut self.events);
        self.dispatcher.handle_activity_ends(now, &mut self.hub, &mut self.events);

        self.partition.reactivate_nodes();
        let mut exits: Vec<VehicleExit> = Vec::new();
        self.partition
            .move_nodes(&mut self.net_hub, &mut self.events, &mut exits, now);
        self.partition.reactivate_links();
        self.partition.move_links(now);

        self.dispatcher.process_exits(exits, now, &mut self.events);

        self.log_status(now);
    }

    fn cleanup(&mut self) -> SimulationSummary {
        let mut leftovers = self.partition.drain_vehicles();
        leftovers.sort_by_key(|v| v.driver_id());
        self.dispatcher
            .flush_network(leftovers, self.now, &mut self.events);
        self.dispatcher.cleanup(self.now, &mut self.events);
        self.events.finish();

        let counts = self.dispatcher.counts();
        let summary = SimulationSummary {
            arrived: counts.arrived,
            aborted: counts.aborted,
            parked: counts.parked,
            end_time: self.now,
        };
        log::info!(
            "simulation end at {}: {} arrived, {} lost, {} parked",
            self.now,
            summary.arrived,
            summary.aborted,
            summary.parked
        );
        summary
    }

    fn log_status(&mut self, now: SimTime) {
        if self.config.status_interval == 0 || now < self.next_status {
            return;
        }
        self.next_status = now.offset(self.config.status_interval);
        let c = self.dispatcher.counts();
        log::info!(
            "{now} : {} live ({} at activities, {} teleporting, {} en route), \
             {} arrived, {} lost; {} active links, {} active nodes",
            self.dispatcher.live(),
            c.at_activity,
            c.teleporting,
            c.on_network,
            c.arrived,
            c.aborted,
            self.partition.active_link_count(),
            self.partition.active_node_count(),
        );
    }

    // ── Introspection for tests and host applications ─────────────────────

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn counts(&self) -> AgentCounts {
        self.dispatcher.counts()
    }

    /// Vehicles currently held by the network plus departures waiting for
    /// first-link space.  Equals `counts().on_network` at tick boundaries.
    pub fn network_vehicle_count(&self) -> usize {
        self.partition.vehicles_on_links() + self.dispatcher.deferred_count()
    }

    pub fn partition(&self) -> &SimNetworkPartition {
        &self.partition
    }
}
