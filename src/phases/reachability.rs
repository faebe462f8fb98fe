//! §4.3 Phase 2 — Synchronous reachability.

use indexmap::IndexSet;
use petgraph::graph::NodeIndex as SnapNodeIndex;
use petgraph::visit::EdgeRef;

use crate::error::PlanResult;
use crate::model::{AssetId, InputGraph};
use crate::plan::DependencyBundleKey;
use crate::planner::Planner;

impl<'g, G: InputGraph> Planner<'g, G> {
    /// For every bundle root, DFS the snapshot graph and record an edge
    /// `root -> asset` in `reachableRoots` for every asset encountered below
    /// it, halting at (but not recording) any node reached via a dependency
    /// that is itself a split point — i.e. one already present in
    /// `dependencyBundleGraph`, which phase 1 only ever populated for async
    /// and type-change/inline split edges.
    ///
    /// `visited` only guards *descent* (never push the same node onto the
    /// stack twice) — it does not gate whether an edge into an
    /// already-visited node gets evaluated. The same child asset can be
    /// reached from one root by two distinct dependencies with different
    /// priorities (e.g. a sync import and a lazy import of the same target);
    /// each such edge carries its own split-point verdict, and skipping the
    /// second edge outright would silently drop whichever bookkeeping
    /// (`reachableRoots` or `reachableAsyncRoots`) its edge alone would have
    /// recorded.
    pub(crate) fn phase2_reachability(&mut self) -> PlanResult<()> {
        let roots: Vec<AssetId> = self.bundle_roots.keys().cloned().collect();

        for root_id in roots {
            let root_node = self.snapshot_node(&root_id);
            let mut visited: IndexSet<SnapNodeIndex> = IndexSet::new();
            visited.insert(root_node);
            let mut stack = vec![root_node];

            while let Some(u) = stack.pop() {
                let edges: Vec<(SnapNodeIndex, crate::model::DependencyId)> = self
                    .snapshot
                    .graph
                    .edges(u)
                    .map(|e| (e.target(), e.weight().clone()))
                    .collect();

                for (v, dep_id) in edges {
                    let dep = self
                        .input
                        .get_dependency(&dep_id)
                        .ok_or_else(|| crate::phases::entry_discovery::missing_dependency(&dep_id))?;
                    let is_split_point = self
                        .dependency_bundle_graph
                        .has_content_key(&DependencyBundleKey::Dependency(dep_id.clone()));

                    if is_split_point {
                        if dep.priority.is_lazy() {
                            let child_id = self.asset_id_at(v);
                            self.reachable_async_roots
                                .entry(child_id)
                                .or_default()
                                .insert(root_id.clone());
                        }
                        // Halt: do not descend past a split point via this
                        // edge, and do not record the split-point node
                        // itself as reachable from `root_id` through it. A
                        // different edge into the same node may still be a
                        // non-split (sync/parallel) edge, handled below.
                        continue;
                    }

                    let child_id = self.asset_id_at(v);
                    let root_node_id = self
                        .reachable_roots
                        .add_node_by_content_key(root_id.clone(), || root_id.clone());
                    let child_node_id = self
                        .reachable_roots
                        .add_node_by_content_key(child_id.clone(), || child_id.clone());
                    self.reachable_roots.add_edge(root_node_id, child_node_id, ());

                    if visited.insert(v) {
                        stack.push(v);
                    }
                }
            }
        }

        Ok(())
    }
}
