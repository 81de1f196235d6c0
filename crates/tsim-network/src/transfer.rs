//! `TransferHub` — the only cross-thread write paths in the network.
//!
//! Every link's entry queue (`waiting_to_enter`) is the receiving end of a
//! multi-producer channel.  The hub bundles the sending ends together with
//! each link's atomic storage gate and the per-partition link-activation
//! channels, and is cloned once per execution context (each worker
//! partition, plus the coordinator).  Everything else about a link or node
//! is mutated only by its owning partition.
//!
//! # Admission protocol
//!
//! 1. `try_reserve(link, pce)` — atomically claim storage; fails when the
//!    link is full (spillback: the caller retries on a later tick).
//! 2. `push(link, vehicle)` — enqueue the vehicle and wake the owning
//!    partition's link-activation queue.  Requires a prior reservation.
//!
//! # Determinism
//!
//! Each pushed vehicle is stamped with the pushing context's id and a
//! per-context sequence number.  The owning link sorts its drained batch by
//! that pair, so the entry order is a pure function of what was pushed, not
//! of thread timing.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};

use tsim_core::LinkId;
use tsim_population::SimVehicle;

use crate::network::Network;
use crate::StorageCap;

// ── Inbound ───────────────────────────────────────────────────────────────────

/// One vehicle in flight towards a link's entry queue.
pub(crate) struct Inbound {
    pub vehicle: SimVehicle,
    /// Id of the pushing context (partition id, or the coordinator's id).
    pub ctx: u32,
    /// Push counter within the context; preserves per-producer FIFO order.
    pub seq: u64,
}

// ── LinkGate ──────────────────────────────────────────────────────────────────

/// The shared, any-thread side of one link.
struct LinkGate {
    inbox: Sender<Inbound>,
    storage: Arc<StorageCap>,
    partition: u32,
}

// ── TransferHub ───────────────────────────────────────────────────────────────

/// Cloneable handle for dispatching vehicles onto links from any context.
pub struct TransferHub {
    gates: Arc<Vec<LinkGate>>,
    /// Link-activation sender per partition, indexed by partition id.
    link_act: Arc<Vec<Sender<LinkId>>>,
    ctx: u32,
    seq: u64,
}

/// The receiving ends produced alongside a hub, consumed when the
/// partitions are assembled.
pub(crate) struct HubChannels {
    /// Entry-queue receiver per link, indexed by `LinkId`.
    pub link_inboxes: Vec<Receiver<Inbound>>,
    /// Shared storage gate per link, indexed by `LinkId`.
    pub storages: Vec<Arc<StorageCap>>,
    /// Link-activation receiver per partition.
    pub link_act_rx: Vec<Receiver<LinkId>>,
}

impl TransferHub {
    /// Create the hub and its receiving ends for `num_partitions` workers.
    ///
    /// `link_partition` maps each `LinkId` index to its owning partition.
    /// The returned hub carries the coordinator context id
    /// (`num_partitions`); workers derive theirs via
    /// [`for_context`](Self::for_context).
    pub(crate) fn build(
        network: &Network,
        link_partition: &[u32],
        num_partitions: usize,
    ) -> (TransferHub, HubChannels) {
        let mut gates = Vec::with_capacity(network.link_count());
        let mut link_inboxes = Vec::with_capacity(network.link_count());
        let mut storages = Vec::with_capacity(network.link_count());

        for link in network.links() {
            let (tx, rx) = unbounded();
            let storage = Arc::new(StorageCap::new(link.storage_cap));
            gates.push(LinkGate {
                inbox: tx,
                storage: Arc::clone(&storage),
                partition: link_partition[link.id.index()],
            });
            link_inboxes.push(rx);
            storages.push(storage);
        }

        let mut link_act = Vec::with_capacity(num_partitions);
        let mut link_act_rx = Vec::with_capacity(num_partitions);
        for _ in 0..num_partitions {
            let (tx, rx) = unbounded();
            link_act.push(tx);
            link_act_rx.push(rx);
        }

        let hub = TransferHub {
            gates: Arc::new(gates),
            link_act: Arc::new(link_act),
            ctx: num_partitions as u32,
            seq: 0,
        };
        (hub, HubChannels { link_inboxes, storages, link_act_rx })
    }

    /// A hub handle pushing under `ctx`'s identity, with a fresh sequence
    /// counter.  Partitions use their partition id; the coordinator keeps
    /// the id assigned at build time.
    pub fn for_context(&self, ctx: u32) -> TransferHub {
        TransferHub {
            gates: Arc::clone(&self.gates),
            link_act: Arc::clone(&self.link_act),
            ctx,
            seq: 0,
        }
    }

    // ── Admission ─────────────────────────────────────────────────────────

    /// Atomically claim `pce` vehicle-equivalents of `link`'s storage.
    /// `false` means the link has no space — retry on a later tick.
    pub fn try_reserve(&self, link: LinkId, pce: f64) -> bool {
        self.gates[link.index()].storage.try_consume(pce)
    }

    /// Enqueue a vehicle whose storage was already reserved and wake the
    /// owning partition's link-activation queue.
    pub fn push(&mut self, link: LinkId, vehicle: SimVehicle) {
        self.seq += 1;
        let gate = &self.gates[link.index()];
        gate.inbox
            .send(Inbound { vehicle, ctx: self.ctx, seq: self.seq })
            .expect("link entry queue disconnected");
        self.link_act[gate.partition as usize]
            .send(link)
            .expect("partition activation queue disconnected");
    }

    // ── Introspection ─────────────────────────────────────────────────────

    /// Occupancy peek, for status reporting and tests.
    pub fn used_storage(&self, link: LinkId) -> f64 {
        self.gates[link.index()].storage.used()
    }

    /// Free-space peek.  Admission itself must go through
    /// [`try_reserve`](Self::try_reserve).
    pub fn has_space(&self, link: LinkId) -> bool {
        self.gates[link.index()].storage.is_available()
    }
}
