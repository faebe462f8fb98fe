use std::hash::Hash;

use indexmap::IndexMap;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;

use super::directed::NodeId;

/// A directed graph whose nodes are addressable both by opaque [`NodeId`] and
/// by a stable content key `K` (an Asset or Dependency id in this crate).
/// `add_node_by_content_key` is idempotent in `K`: a second call with the
/// same key returns the node already created for it instead of duplicating
/// it. Edges carry a label `E` (e.g. dependency priority).
///
/// Backed by `StableDiGraph` so that removing a node (phase 5 cleanup) never
/// renumbers a surviving node out from under `by_key`.
#[derive(Debug, Clone)]
pub struct ContentAddressedGraph<K, N, E> {
    inner: StableDiGraph<N, E>,
    by_key: IndexMap<K, NodeIndex>,
}

impl<K, N, E> Default for ContentAddressedGraph<K, N, E>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            inner: StableDiGraph::new(),
            by_key: IndexMap::new(),
        }
    }
}

impl<K, N, E> ContentAddressedGraph<K, N, E>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_content_key(&self, key: &K) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn get_node_id_by_content_key(&self, key: &K) -> Option<NodeId> {
        self.by_key.get(key).copied().map(NodeId)
    }

    /// Returns the existing node for `key` if present; otherwise calls
    /// `make_payload` and inserts a fresh node under `key`.
    pub fn add_node_by_content_key(&mut self, key: K, make_payload: impl FnOnce() -> N) -> NodeId {
        if let Some(&idx) = self.by_key.get(&key) {
            return NodeId(idx);
        }
        let idx = self.inner.add_node(make_payload());
        self.by_key.insert(key, idx);
        NodeId(idx)
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, label: E) {
        self.inner.update_edge(from.0, to.0, label);
    }

    pub fn remove_node(&mut self, id: NodeId) -> Option<N> {
        self.by_key.retain(|_, v| *v != id.0);
        self.inner.remove_node(id.0)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&N> {
        self.inner.node_weight(id.0)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut N> {
        self.inner.node_weight_mut(id.0)
    }

    pub fn edge_label(&self, from: NodeId, to: NodeId) -> Option<&E> {
        self.inner
            .find_edge(from.0, to.0)
            .and_then(|e| self.inner.edge_weight(e))
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

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inner.node_indices().map(NodeId)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Topological order over this graph, tolerating cycles: a back-edge
    /// into a node still on the current DFS stack is simply not followed,
    /// rather than reported as an error. Ties (nodes with no ordering
    /// constraint between them) are broken by node insertion order, so the
    /// result is deterministic for a deterministic input graph.
    pub fn topo_sort(&self) -> Vec<NodeId> {
        // Sized by `node_bound`, not `node_count`: a `StableGraph` that has
        // had nodes removed leaves holes, so live indices are not contiguous
        // and can exceed the live node count.
        let bound = self.inner.node_bound();
        let mut state = vec![0u8; bound];
        let mut order = Vec::with_capacity(self.inner.node_count());
        let mut stack: Vec<(NodeIndex, std::vec::IntoIter<NodeIndex>)> = Vec::new();

        for start in self.inner.node_indices() {
            if state[start.index()] != 0 {
                continue;
            }
            state[start.index()] = 1;
            stack.push((
                start,
                self.inner
                    .neighbors_directed(start, Direction::Outgoing)
                    .collect::<Vec<_>>()
                    .into_iter(),
            ));

            while let Some((node, iter)) = stack.last_mut() {
                let node = *node;
                if let Some(next) = iter.next() {
                    match state[next.index()] {
                        0 => {
                            state[next.index()] = 1;
                            stack.push((
                                next,
                                self.inner
                                    .neighbors_directed(next, Direction::Outgoing)
                                    .collect::<Vec<_>>()
                                    .into_iter(),
                            ));
                        }
                        // Back-edge or cross-edge into work already in progress
                        // or finished: ignored for ordering purposes.
                        _ => {}
                    }
                } else {
                    state[node.index()] = 2;
                    order.push(NodeId(node));
                    stack.pop();
                }
            }
        }

        order.reverse();
        order
    }
}
