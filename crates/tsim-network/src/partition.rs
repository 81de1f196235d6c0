//! `SimNetworkPartition` — the runtime network owned by one execution
//! context.
//!
//! Nodes are distributed round-robin across partitions; each link lives
//! with the partition of its **to-node**, so every buffer pop performed by
//! the node-transfer step is partition-local.  The single-threaded engine
//! is simply the one-partition special case.
//!
//! # Active sets
//!
//! Only active nodes and links are visited each tick, bounding per-tick
//! cost to the parts of the network actually in use.  Links are activated
//! through the hub's per-partition channels when something is pushed onto
//! them (possibly from another partition or the coordinator); nodes are
//! activated by their own partition when an owned link's buffer becomes
//! non-empty.  Both activation drains are sorted and deduplicated, so
//! iteration order is a pure function of the simulation state.

use std::collections::VecDeque;

use crossbeam_channel::{unbounded, Receiver, Sender};
use rustc_hash::FxHashMap;

use tsim_core::{LinkId, NodeId, SimConfig, SimTime};
use tsim_events::EventsPublisher;
use tsim_population::SimVehicle;

use crate::network::Network;
use crate::node::VehicleExit;
use crate::transfer::TransferHub;
use crate::{NetworkChange, SimLink, SimNode};

// ── Construction ──────────────────────────────────────────────────────────────

/// Split `network` into `config.num_partitions` runtime partitions plus the
/// shared transfer hub (carrying the coordinator context).
///
/// `changes` is the time-variant feed; each record is routed to the
/// partition owning its link.
pub fn build_partitions(
    network: &Network,
    config: &SimConfig,
    changes: Vec<NetworkChange>,
) -> (Vec<SimNetworkPartition>, TransferHub) {
    let num_partitions = config.num_partitions.max(1);

    // Round-robin node assignment; links follow their to-node.
    let node_partition: Vec<u32> = (0..network.node_count())
        .map(|i| (i % num_partitions) as u32)
        .collect();
    let link_partition: Vec<u32> = network
        .links()
        .iter()
        .map(|l| node_partition[l.to.index()])
        .collect();

    let (hub, mut channels) = TransferHub::build(network, &link_partition, num_partitions);
    let mut link_inboxes: Vec<Option<_>> = channels.link_inboxes.drain(..).map(Some).collect();
    let mut storages: Vec<Option<_>> = channels.storages.drain(..).map(Some).collect();
    let mut link_act_rx: Vec<Option<_>> = channels.link_act_rx.drain(..).map(Some).collect();

    let mut partitions = Vec::with_capacity(num_partitions);
    for part in 0..num_partitions {
        let mut nodes = FxHashMap::default();
        for node in network.nodes() {
            if node_partition[node.id.index()] == part as u32 {
                nodes.insert(node.id, SimNode::new(node.id, node.in_links.clone()));
            }
        }

        let mut links = FxHashMap::default();
        for link in network.links() {
            if link_partition[link.id.index()] == part as u32 {
                let inbox = link_inboxes[link.id.index()]
                    .take()
                    .expect("each link inbox consumed once");
                let storage = storages[link.id.index()]
                    .take()
                    .expect("each link storage consumed once");
                links.insert(
                    link.id,
                    SimLink::new(link, inbox, storage, config.timestep, config.stuck_threshold),
                );
            }
        }

        let mut own_changes: Vec<NetworkChange> = changes
            .iter()
            .copied()
            .filter(|c| {
                c.link.index() < link_partition.len()
                    && link_partition[c.link.index()] == part as u32
            })
            .collect();
        own_changes.sort_by_key(|c| (c.at, c.link));

        let (node_act_tx, node_act_rx) = unbounded();
        partitions.push(SimNetworkPartition {
            id: part as u32,
            timestep: config.timestep,
            nodes,
            links,
            active_nodes: Vec::new(),
            active_links: Vec::new(),
            node_act_tx,
            node_act_rx,
            link_act_rx: link_act_rx[part].take().expect("one receiver per partition"),
            changes: own_changes.into(),
        });
    }

    (partitions, hub)
}

// ── SimNetworkPartition ───────────────────────────────────────────────────────

/// One partition's nodes, links, active sets, and activation queues.
pub struct SimNetworkPartition {
    id: u32,
    timestep: u32,
    nodes: FxHashMap<NodeId, SimNode>,
    links: FxHashMap<LinkId, SimLink>,
    active_nodes: Vec<NodeId>,
    active_links: Vec<LinkId>,
    /// Node activations discovered while moving links, drained next tick.
    node_act_tx: Sender<NodeId>,
    node_act_rx: Receiver<NodeId>,
    /// Link activations from the hub (any context may push).
    link_act_rx: Receiver<LinkId>,
    /// Time-variant changes for this partition's links, ordered by start.
    changes: VecDeque<NetworkChange>,
}

impl SimNetworkPartition {
    pub fn id(&self) -> u32 {
        self.id
    }

    // ── Reactivation phases ───────────────────────────────────────────────

    /// Drain pending node activations into the active-node set.
    pub fn reactivate_nodes(&mut self) {
        let mut batch: Vec<NodeId> = self.node_act_rx.try_iter().collect();
        if batch.is_empty() {
            return;
        }
        batch.sort_unstable();
        batch.dedup();
        for id in batch {
            let node = self.nodes.get_mut(&id).expect("activation for owned node");
            if !node.active {
                node.active = true;
                self.active_nodes.push(id);
            }
        }
    }

    /// Drain pending link activations into the active-link set.
    pub fn reactivate_links(&mut self) {
        let mut batch: Vec<LinkId> = self.link_act_rx.try_iter().collect();
        if batch.is_empty() {
            return;
        }
        batch.sort_unstable();
        batch.dedup();
        for id in batch {
            let link = self.links.get_mut(&id).expect("activation for owned link");
            if !link.active {
                link.active = true;
                self.active_links.push(id);
            }
        }
    }

    // ── Move phases ───────────────────────────────────────────────────────

    /// Run the transfer step over all active nodes.  Exited vehicles
    /// (arrivals and stuck discards) are appended to `exits` for the agent
    /// dispatcher.
    pub fn move_nodes(
        &mut self,
        hub: &mut TransferHub,
        events: &mut EventsPublisher,
        exits: &mut Vec<VehicleExit>,
        now: SimTime,
    ) {
        let rotation = (now.0 / self.timestep) as usize;
        let drained = std::mem::take(&mut self.active_nodes);
        let mut still = Vec::with_capacity(drained.len());

        for id in drained {
            let node = self.nodes.get(&id).expect("active node owned");
            let keep = node.move_node(&mut self.links, hub, events, exits, now, rotation);
            if keep {
                still.push(id);
            } else {
                self.nodes
                    .get_mut(&id)
                    .expect("active node owned")
                    .active = false;
            }
        }
        self.active_nodes = still;
    }

    /// Apply due time-variant changes, then advance all active links one
    /// tick.  Links whose buffers hold vehicles wake their downstream node
    /// for the next node phase.
    pub fn move_links(&mut self, now: SimTime) {
        self.apply_network_changes(now);

        let drained = std::mem::take(&mut self.active_links);
        let mut still = Vec::with_capacity(drained.len());

        for id in drained {
            let link = self.links.get_mut(&id).expect("active link owned");
            if link.move_link(now) {
                if link.has_buffered() {
                    self.node_act_tx
                        .send(link.to)
                        .expect("own activation channel open");
                }
                still.push(id);
            } else {
                link.active = false;
            }
        }
        self.active_links = still;
    }

    /// Apply every change whose start time has been reached.
    fn apply_network_changes(&mut self, now: SimTime) {
        while self.changes.front().is_some_and(|c| c.at <= now) {
            let change = self.changes.pop_front().expect("front just observed");
            let link = self
                .links
                .get_mut(&change.link)
                .expect("change routed to owning partition");
            if let Some(freespeed) = change.freespeed {
                link.set_freespeed(freespeed);
            }
            if let Some(flow) = change.flow_cap {
                link.set_flow_rate(flow, now);
            }
        }
    }

    // ── Teardown ──────────────────────────────────────────────────────────

    /// Remove every vehicle still held by this partition's links, in link-id
    /// order, and deactivate everything.  End-of-run cleanup flushes the
    /// returned vehicles as stuck.
    pub fn drain_vehicles(&mut self) -> Vec<SimVehicle> {
        let mut ids: Vec<LinkId> = self.links.keys().copied().collect();
        ids.sort_unstable();

        let mut out = Vec::new();
        for id in ids {
            let link = self.links.get_mut(&id).expect("key just listed");
            out.extend(link.drain_all());
            link.active = false;
        }
        self.active_links.clear();
        self.active_nodes.clear();
        for node in self.nodes.values_mut() {
            node.active = false;
        }
        out
    }

    // ── Introspection ─────────────────────────────────────────────────────

    pub fn active_node_count(&self) -> usize {
        self.active_nodes.len()
    }

    pub fn active_link_count(&self) -> usize {
        self.active_links.len()
    }

    /// Vehicles currently in this partition's traveling/buffer stages.
    pub fn vehicles_on_links(&self) -> usize {
        self.links.values().map(SimLink::veh_count).sum()
    }

    pub fn link(&self, id: LinkId) -> Option<&SimLink> {
        self.links.get(&id)
    }

    pub fn links(&self) -> impl Iterator<Item = &SimLink> {
        self.links.values()
    }
}
