//! Static network description and builder.
//!
//! # Data layout
//!
//! Nodes and links live in id-indexed `Vec`s: `NodeId`/`LinkId` are the
//! positions assigned by the builder, so lookups are direct indexing and
//! the runtime structures can address everything by integer id.  Node
//! in/out adjacency lists are derived from the links at `add_link` time.

use tsim_core::{LinkId, NodeId};

// ── Node ──────────────────────────────────────────────────────────────────────

/// A network vertex.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub id: NodeId,
    /// Links ending at this node, in insertion order.
    pub in_links: Vec<LinkId>,
    /// Links starting at this node, in insertion order.
    pub out_links: Vec<LinkId>,
}

// ── Link ──────────────────────────────────────────────────────────────────────

/// A directed capacitated edge.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Link {
    pub id: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    /// Physical length in metres.
    pub length: f64,
    /// Free-flow speed in m/s.
    pub freespeed: f64,
    /// Discharge capacity in vehicle-equivalents per second.
    pub flow_cap: f64,
    /// Holding capacity in vehicle-equivalents.
    pub storage_cap: f64,
}

// ── Network ───────────────────────────────────────────────────────────────────

/// The owned, id-indexed collection of nodes and links.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Network {
    nodes: Vec<Node>,
    links: Vec<Link>,
}

impl Network {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.index()]
    }

    /// `true` if `id` names a link of this network.  Used to validate
    /// routes handed in by the upstream router before dispatching onto them.
    #[inline]
    pub fn contains_link(&self, id: LinkId) -> bool {
        id.index() < self.links.len()
    }
}

// ── NetworkBuilder ────────────────────────────────────────────────────────────

/// Construct a [`Network`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use tsim_network::NetworkBuilder;
///
/// let mut b = NetworkBuilder::new();
/// let a = b.add_node();
/// let c = b.add_node();
/// // 1 km at 10 m/s, discharging 0.5 veh/s, holding 36 vehicles
/// let l = b.add_link(a, c, 1_000.0, 10.0, 0.5, 36.0);
/// let net = b.build();
/// assert_eq!(net.link(l).to, c);
/// assert_eq!(net.node(c).in_links, vec![l]);
/// ```
#[derive(Default)]
pub struct NetworkBuilder {
    nodes: Vec<Node>,
    links: Vec<Link>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate for the expected graph size.
    pub fn with_capacity(nodes: usize, links: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            links: Vec::with_capacity(links),
        }
    }

    /// Add a node and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { id, in_links: Vec::new(), out_links: Vec::new() });
        id
    }

    /// Add a directed link.
    ///
    /// # Panics
    /// Panics if `from` or `to` was not created by this builder.
    pub fn add_link(
        &mut self,
        from: NodeId,
        to: NodeId,
        length: f64,
        freespeed: f64,
        flow_cap: f64,
        storage_cap: f64,
    ) -> LinkId {
        assert!(from.index() < self.nodes.len(), "unknown from node {from}");
        assert!(to.index() < self.nodes.len(), "unknown to node {to}");

        let id = LinkId(self.links.len() as u32);
        self.links.push(Link { id, from, to, length, freespeed, flow_cap, storage_cap });
        self.nodes[from.index()].out_links.push(id);
        self.nodes[to.index()].in_links.push(id);
        id
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn build(self) -> Network {
        Network { nodes: self.nodes, links: self.links }
    }
}

// ── Geometry helper ───────────────────────────────────────────────────────────

/// Derive a storage capacity from lane geometry: `length × lanes /
/// cell_size` vehicle-equivalents, where `cell_size` is the space one
/// stopped vehicle occupies (7.5 m is the customary value).
///
/// The result is floored at the flow capacity over one free-flow traversal
/// so a short high-throughput link can always sustain its flow capacity,
/// and at one vehicle so every link can hold something.
pub fn storage_for_geometry(
    length: f64,
    lanes: f64,
    cell_size: f64,
    flow_cap: f64,
    freespeed: f64,
) -> f64 {
    let from_geometry = length * lanes / cell_size;
    let from_flow = flow_cap * (length / freespeed).ceil();
    from_geometry.max(from_flow).max(1.0)
}
