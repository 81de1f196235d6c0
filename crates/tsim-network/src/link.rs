//! `SimLink` — the runtime link with its three vehicle stages.

use std::collections::VecDeque;
use std::sync::Arc;

use crossbeam_channel::Receiver;

use tsim_core::{LinkId, NodeId, SimTime};
use tsim_population::SimVehicle;

use crate::network::Link;
use crate::transfer::Inbound;
use crate::{FlowCap, StorageCap, StuckTimer};

/// A vehicle traversing the physical link, due at the downstream end at
/// `exit_time`.
#[derive(Debug)]
struct TravelingVeh {
    vehicle: SimVehicle,
    exit_time: SimTime,
}

/// The runtime state of one directed link.
///
/// Owned by exactly one partition; only the entry inbox and the shared
/// storage gate are ever touched from elsewhere.
pub struct SimLink {
    pub id: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    length: f64,
    freespeed: f64,
    timestep: u32,
    /// Vehicles on the physical link, ordered by exit time (ties FIFO).
    traveling: VecDeque<TravelingVeh>,
    /// Vehicles at the downstream end awaiting node transfer, FIFO.
    buffer: VecDeque<SimVehicle>,
    /// Receiving end of the multi-producer entry queue.
    inbox: Receiver<Inbound>,
    storage: Arc<StorageCap>,
    flow: FlowCap,
    stuck: StuckTimer,
    /// Membership flag for the partition's active-link set.
    pub(crate) active: bool,
}

impl SimLink {
    pub(crate) fn new(
        link: &Link,
        inbox: Receiver<Inbound>,
        storage: Arc<StorageCap>,
        timestep: u32,
        stuck_threshold: u32,
    ) -> Self {
        Self {
            id: link.id,
            from: link.from,
            to: link.to,
            length: link.length,
            freespeed: link.freespeed,
            timestep,
            traveling: VecDeque::new(),
            buffer: VecDeque::new(),
            inbox,
            storage,
            flow: FlowCap::new(link.flow_cap, timestep),
            stuck: StuckTimer::new(stuck_threshold),
            active: false,
        }
    }

    // ── Per-tick step ─────────────────────────────────────────────────────

    /// Advance the link one tick: drain the entry queue into the traveling
    /// stage, move due vehicles into the buffer, and bank flow capacity.
    ///
    /// Returns `false` when every container is empty — the link drops out
    /// of the active set until something is pushed onto it again.
    pub fn move_link(&mut self, now: SimTime) -> bool {
        self.drain_entry_queue(now);
        self.load_buffer(now);
        self.flow.accrue(now);
        self.is_active()
    }

    /// Move freshly pushed vehicles into the traveling stage, stamping exit
    /// times from the current freespeed.  The drained batch is sorted by
    /// `(context, sequence)` so entry order does not depend on thread
    /// timing.
    fn drain_entry_queue(&mut self, now: SimTime) {
        if self.inbox.is_empty() {
            return;
        }
        let mut batch: Vec<Inbound> = self.inbox.try_iter().collect();
        batch.sort_unstable_by_key(|i| (i.ctx, i.seq));

        for inbound in batch {
            let vehicle = inbound.vehicle;
            let speed = self.freespeed.min(vehicle.max_v);
            // at least one second per link
            let duration = ((self.length / speed).ceil() as u32).max(1);
            let exit_time = now.offset(duration);

            // Insert keeping exit-time order; equal stamps stay FIFO.  A
            // slower vehicle ahead cannot be overtaken by this scheme alone —
            // the scan from the back finds the last earlier-or-equal entry.
            let pos = self
                .traveling
                .iter()
                .rposition(|e| e.exit_time <= exit_time)
                .map_or(0, |p| p + 1);
            self.traveling.insert(pos, TravelingVeh { vehicle, exit_time });
        }
    }

    /// Move every vehicle whose exit time has come into the buffer.
    fn load_buffer(&mut self, now: SimTime) {
        while let Some(front) = self.traveling.front() {
            if front.exit_time > now {
                break;
            }
            let entry = self.traveling.pop_front().expect("front just observed");
            self.buffer.push_back(entry.vehicle);
        }
    }

    // ── Node-facing interface ─────────────────────────────────────────────

    /// The vehicle the link offers to its downstream node, if the buffer is
    /// non-empty and the discharge budget allows it.  Starts the stuck
    /// watchdog on the offered head.
    pub fn offers_veh(&mut self, now: SimTime) -> Option<&SimVehicle> {
        if let Some(front) = self.buffer.front() {
            if self.flow.has_capacity() {
                self.stuck.start(now);
                return Some(front);
            }
        }
        None
    }

    /// Remove the buffer head: releases its storage, spends the discharge
    /// budget, and resets the stuck watchdog.
    pub fn pop_buffer(&mut self) -> Option<SimVehicle> {
        let vehicle = self.buffer.pop_front()?;
        self.storage.release(vehicle.pce);
        self.flow.consume(vehicle.pce);
        self.stuck.reset();
        Some(vehicle)
    }

    /// `true` once the offered head has been blocked beyond the threshold.
    pub fn is_veh_stuck(&self, now: SimTime) -> bool {
        self.stuck.is_stuck(now)
    }

    // ── State queries ─────────────────────────────────────────────────────

    /// A link is active while any of its three containers holds a vehicle.
    pub fn is_active(&self) -> bool {
        !self.traveling.is_empty() || !self.buffer.is_empty() || !self.inbox.is_empty()
    }

    pub fn has_buffered(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Vehicles in the traveling and buffer stages (entry queue excluded —
    /// those are still in flight from their producers this tick).
    pub fn veh_count(&self) -> usize {
        self.traveling.len() + self.buffer.len()
    }

    pub fn used_storage(&self) -> f64 {
        self.storage.used()
    }

    pub fn storage_capacity(&self) -> f64 {
        self.storage.capacity()
    }

    pub fn freespeed(&self) -> f64 {
        self.freespeed
    }

    pub fn flow_rate(&self) -> f64 {
        self.flow.rate()
    }

    // ── Teardown ──────────────────────────────────────────────────────────

    /// Empty every container, releasing all storage.  Used by end-of-run
    /// cleanup to flush vehicles still en route as stuck.
    pub(crate) fn drain_all(&mut self) -> Vec<SimVehicle> {
        let mut inbound: Vec<Inbound> = self.inbox.try_iter().collect();
        inbound.sort_unstable_by_key(|i| (i.ctx, i.seq));

        let mut out: Vec<SimVehicle> = Vec::new();
        out.extend(self.traveling.drain(..).map(|e| e.vehicle));
        out.extend(self.buffer.drain(..));
        out.extend(inbound.into_iter().map(|i| i.vehicle));
        for vehicle in &out {
            self.storage.release(vehicle.pce);
        }
        out
    }

    // ── Time-variant changes ──────────────────────────────────────────────

    /// New free-flow speed; affects exit-time stamps from now on.  Vehicles
    /// already traveling keep their stamps.
    pub(crate) fn set_freespeed(&mut self, freespeed: f64) {
        self.freespeed = freespeed;
    }

    /// New discharge rate; the budget is settled at the old rate first.
    pub(crate) fn set_flow_rate(&mut self, rate: f64, now: SimTime) {
        self.flow.set_rate(rate, self.timestep, now);
    }
}

impl std::fmt::Debug for SimLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SimLink({} {}→{}, traveling {}, buffered {}, used {:.1}/{:.1})",
            self.id,
            self.from,
            self.to,
            self.traveling.len(),
            self.buffer.len(),
            self.used_storage(),
            self.storage_capacity(),
        )
    }
}
