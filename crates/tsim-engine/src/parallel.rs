//! `ParallelSimulation` — the partitioned engine with its per-tick barrier
//! protocol.
//!
//! Nodes are distributed round-robin across worker partitions at build
//! time; links follow their to-node (see `tsim-network`).  Each tick runs
//! the phases below; the five named barriers are shared by all workers
//! *and* the coordinator, which sits out the middle phases:
//!
//! ```text
//! coordinator: teleport arrivals, activity ends, publish t
//! ── start barrier ──────────────────────────────────────────────
//! workers:     reactivate_nodes()
//! ── reactivate-nodes barrier ───────────────────────────────────
//! workers:     move_nodes(t)            (cross-partition pushes OK)
//! ── separation barrier ─────────────────────────────────────────
//! workers:     reactivate_links()       (drains those pushes' wakes)
//! ── reactivate-links barrier ───────────────────────────────────
//! workers:     move_links(t), send exited vehicles
//! ── end barrier ────────────────────────────────────────────────
//! coordinator: process exits, status log, t += Δt
//! ```
//!
//! The reactivate barriers guarantee no worker starts moving before every
//! worker has drained the activations addressed to it for this tick; the
//! separation barrier orders all node transfers before any link drains
//! them.  The global scheduling queues stay with the coordinator, outside
//! the barrier window, so they need no locking.
//!
//! Termination: the coordinator clears the `running` flag and releases the
//! start barrier one last time; workers observe the flag on waking and
//! exit.  A worker panic is fatal for the whole run — it propagates out of
//! [`run`](ParallelSimulation::run) when the thread scope joins (and under
//! the release profile's `panic = "abort"` it ends the process outright).

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Barrier;

use crossbeam_channel::Sender;

use tsim_core::{SimConfig, SimTime};
use tsim_events::EventsPublisher;
use tsim_network::{SimNetworkPartition, TransferHub, VehicleExit};

use crate::dispatcher::AgentDispatcher;
use crate::SimulationSummary;

// ── Barriers ──────────────────────────────────────────────────────────────────

/// The per-tick rendezvous points, each sized for all workers plus the
/// coordinator.
struct Barriers {
    start: Barrier,
    reactivate_nodes: Barrier,
    separation: Barrier,
    reactivate_links: Barrier,
    end: Barrier,
}

impl Barriers {
    fn new(parties: usize) -> Self {
        Self {
            start: Barrier::new(parties),
            reactivate_nodes: Barrier::new(parties),
            separation: Barrier::new(parties),
            reactivate_links: Barrier::new(parties),
            end: Barrier::new(parties),
        }
    }
}

// ── ParallelSimulation ────────────────────────────────────────────────────────

/// The partitioned engine.  Construct via
/// [`SimulationBuilder::build_parallel`][crate::SimulationBuilder::build_parallel];
/// `run` consumes the engine, moving each partition into its worker thread.
pub struct ParallelSimulation {
    pub(crate) config: SimConfig,
    pub(crate) dispatcher: AgentDispatcher,
    pub(crate) partitions: Vec<SimNetworkPartition>,
    pub(crate) worker_events: Vec<EventsPublisher>,
    /// Coordinator-context hub for departures.
    pub(crate) hub: TransferHub,
    /// Coordinator events: departures, arrivals, activity transitions.
    pub(crate) events: EventsPublisher,
    pub(crate) now: SimTime,
    pub(crate) next_status: SimTime,
}

impl ParallelSimulation {
    /// Run to completion and return the summary.
    ///
    /// # Panics
    /// Re-raises any worker thread panic (fatal per the error taxonomy).
    pub fn run(mut self) -> SimulationSummary {
        let num_workers = self.partitions.len();
        log::info!(
            "parallel simulation start at {} with {} live agents on {} partitions",
            self.now,
            self.dispatcher.live(),
            num_workers
        );

        let barriers = Barriers::new(num_workers + 1);
        let running = AtomicBool::new(true);
        let shared_now = AtomicU32::new(self.now.0);
        let (exit_tx, exit_rx) = crossbeam_channel::unbounded::<VehicleExit>();

        let partitions = std::mem::take(&mut self.partitions);
        let publishers = std::mem::take(&mut self.worker_events);

        std::thread::scope(|scope| {
            for (partition, events) in partitions.into_iter().zip(publishers) {
                let hub = self.hub.for_context(partition.id());
                let exit_tx = exit_tx.clone();
                let barriers = &barriers;
                let running = &running;
                let shared_now = &shared_now;
                scope.spawn(move || {
                    worker_loop(partition, hub, events, exit_tx, barriers, running, shared_now)
                });
            }
            drop(exit_tx);

            while self.dispatcher.live() > 0 && self.now < self.config.end_time {
                let now = self.now;

                // Global queues run outside the barrier window: the workers
                // are all parked at the start barrier, so departure pushes
                // cannot race with any link drain.
                self.dispatcher.handle_teleport_arrivals(now, &mut self.events);
                self.dispatcher
                    .handle_activity_ends(now, &mut self.hub, &mut self.events);

                shared_now.store(now.0, Ordering::SeqCst);
                barriers.start.wait();
                barriers.reactivate_nodes.wait();
                barriers.separation.wait();
                barriers.reactivate_links.wait();
                barriers.end.wait();

                // All worker sends happened before the end barrier.  Sorting
                // by driver makes the processing order independent of which
                // worker delivered first.
                let mut exits: Vec<VehicleExit> = exit_rx.try_iter().collect();
                exits.sort_by_key(|exit| match exit {
                    VehicleExit::Arrived { vehicle } | VehicleExit::Stuck { vehicle } => {
                        vehicle.driver_id()
                    }
                });
                self.dispatcher.process_exits(exits, now, &mut self.events);

                self.log_status(now);
                self.now = self.now.offset(self.config.timestep);
            }

            running.store(false, Ordering::SeqCst);
            barriers.start.wait();
        });

        // Workers drained their links into the exit channel before exiting.
        let mut leftovers: Vec<_> = exit_rx
            .try_iter()
            .map(|exit| match exit {
                VehicleExit::Arrived { vehicle } | VehicleExit::Stuck { vehicle } => vehicle,
            })
            .collect();
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
            "parallel simulation end at {}: {} arrived, {} lost, {} parked",
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
             {} arrived, {} lost",
            self.dispatcher.live(),
            c.at_activity,
            c.teleporting,
            c.on_network,
            c.arrived,
            c.aborted,
        );
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

fn worker_loop(
    mut partition: SimNetworkPartition,
    mut hub: TransferHub,
    mut events: EventsPublisher,
    exit_tx: Sender<VehicleExit>,
    barriers: &Barriers,
    running: &AtomicBool,
    shared_now: &AtomicU32,
) {
    loop {
        barriers.start.wait();
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let now = SimTime(shared_now.load(Ordering::SeqCst));

        partition.reactivate_nodes();
        barriers.reactivate_nodes.wait();

        let mut exits = Vec::new();
        partition.move_nodes(&mut hub, &mut events, &mut exits, now);
        barriers.separation.wait();

        partition.reactivate_links();
        barriers.reactivate_links.wait();

        partition.move_links(now);
        for exit in exits {
            exit_tx.send(exit).expect("coordinator holds the exit receiver");
        }
        barriers.end.wait();
    }

    // Hand vehicles still en route back for the coordinator's stuck flush.
    for vehicle in partition.drain_vehicles() {
        let _ = exit_tx.send(VehicleExit::Stuck { vehicle });
    }
    events.finish();
}
