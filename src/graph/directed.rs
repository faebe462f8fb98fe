use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;

/// Opaque, stable node identifier. Never constructed outside this module;
/// callers pass them back to the graph that issued them.
///
/// Backed by `petgraph::stable_graph`, not plain `petgraph::Graph`: the plain
/// graph swap-removes the last node into a freed slot, which would silently
/// change the id of an unrelated node out from under every map keyed on it
/// elsewhere in the planner. The stable variant never renumbers a live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) NodeIndex);

/// A directed graph over an arbitrary node payload `N`, with unlabeled edges.
///
/// Wraps `petgraph::stable_graph::StableDiGraph` to expose only the closed
/// operation set the planner needs — add/remove node and edge, incident-edge
/// queries, insertion-order traversal — instead of leaking petgraph's API
/// into the rest of the crate.
#[derive(Debug, Clone)]
pub struct DirectedGraph<N> {
    inner: StableDiGraph<N, ()>,
}

impl<N> Default for DirectedGraph<N> {
    fn default() -> Self {
        Self {
            inner: StableDiGraph::new(),
        }
    }
}

impl<N> DirectedGraph<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, payload: N) -> NodeId {
        NodeId(self.inner.add_node(payload))
    }

    /// Idempotent: adding the same `(from, to)` pair twice is a no-op.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.inner.update_edge(from.0, to.0, ());
    }

    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) {
        if let Some(edge) = self.inner.find_edge(from.0, to.0) {
            self.inner.remove_edge(edge);
        }
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.inner.find_edge(from.0, to.0).is_some()
    }

    /// Removes a node and every edge incident to it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<N> {
        self.inner.remove_node(id.0)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&N> {
        self.inner.node_weight(id.0)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut N> {
        self.inner.node_weight_mut(id.0)
    }

    pub fn nodes_connected_from(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.inner
            .neighbors_directed(id.0, Direction::Outgoing)
            .map(NodeId)
    }

    pub fn nodes_connected_to(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.inner
            .neighbors_directed(id.0, Direction::Incoming)
            .map(NodeId)
    }

    pub fn in_degree(&self, id: NodeId) -> usize {
        self.inner
            .neighbors_directed(id.0, Direction::Incoming)
            .count()
    }

    /// All node ids, in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inner.node_indices().map(NodeId)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }
}
