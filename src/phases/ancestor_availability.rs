//! §4.4 Phase 3 — Ancestor availability.

use indexmap::{IndexMap, IndexSet};

use crate::error::PlanResult;
use crate::model::{AssetId, InputGraph};
use crate::plan::AsyncRootKey;
use crate::planner::Planner;

impl<'g, G: InputGraph> Planner<'g, G> {
    pub(crate) fn phase3_ancestor_availability(&mut self) -> PlanResult<()> {
        let order = self.async_bundle_root_graph.topo_sort();

        for node_id in order {
            let b = match self.async_bundle_root_graph.get_node(node_id) {
                Some(AsyncRootKey::Asset(asset)) => asset.clone(),
                _ => continue, // the synthetic root carries no availability
            };

            let group_id = match self.bundle_roots.get(&b) {
                Some((_, group_id)) => *group_id,
                None => continue,
            };

            let sync_b = self.sync_set(&b);

            // group(b): union of own-assets + sync(.) over every bundle in
            // b's bundle group, excluding isolated/inline bundles, plus the
            // per-group reference count that drives phase 4's duplicate
            // filter (§4.4 step 2, §4.5 step 2).
            let mut group_set: IndexSet<AssetId> = IndexSet::new();
            let mut ref_counts: IndexMap<AssetId, u32> = IndexMap::new();
            self.accumulate_group_member(&b, &sync_b, &mut group_set, &mut ref_counts);

            let siblings: Vec<AssetId> = self
                .group_members
                .get(&group_id)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .filter(|s| *s != b)
                .collect();

            for sibling_asset in &siblings {
                let sibling_bundle_id = match self.bundle_roots.get(sibling_asset) {
                    Some((bid, _)) => *bid,
                    None => continue,
                };
                let excluded = self
                    .bundle_graph
                    .get_node(sibling_bundle_id)
                    .and_then(|bundle| bundle.bundle_behavior)
                    .map_or(false, |behavior| behavior.is_isolated() || behavior.is_inline());
                if excluded {
                    continue;
                }
                let sibling_sync = self.sync_set(sibling_asset);
                self.accumulate_group_member(sibling_asset, &sibling_sync, &mut group_set, &mut ref_counts);
            }

            self.group_reference_count.insert(b.clone(), ref_counts);

            // combined(b) = sync(b) ∪ ancestorAssets[b] (empty for an entry,
            // since nothing ever populates an entry's slot before it is
            // processed here).
            let mut combined: IndexSet<AssetId> = sync_b.clone();
            if let Some(existing) = self.ancestor_assets.get(&b) {
                combined.extend(existing.iter().cloned());
            }

            // full_available(b): what's guaranteed loaded for anything b's
            // group delivers, including contributions from b's type-change
            // siblings (§4.4 step 4: "plus sibling-group contributions").
            let mut full_available = combined.clone();
            full_available.extend(group_set.iter().cloned());

            // Propagate to async children of b.
            let children: Vec<crate::graph::NodeId> =
                self.async_bundle_root_graph.nodes_connected_from(node_id).collect();
            for child_node in children {
                let child_asset = match self.async_bundle_root_graph.get_node(child_node) {
                    Some(AsyncRootKey::Asset(asset)) => asset.clone(),
                    _ => continue,
                };
                let multi_parent = self.async_bundle_root_graph.nodes_connected_to(child_node).count() > 1;
                merge_ancestor_set(&mut self.ancestor_assets, child_asset, &full_available, multi_parent);
            }

            // Propagate to b's own bundle-group (type-change) siblings.
            for sibling_asset in &siblings {
                let sibling_bundle_id = match self.bundle_roots.get(sibling_asset) {
                    Some((bid, _)) => *bid,
                    None => continue,
                };
                let multi_parent = self.bundle_graph.in_degree(sibling_bundle_id) > 1;
                merge_ancestor_set(
                    &mut self.ancestor_assets,
                    sibling_asset.clone(),
                    &full_available,
                    multi_parent,
                );
            }
        }

        Ok(())
    }

    /// `sync(root)`: the assets synchronously reachable from `root` per
    /// `reachableRoots` (phase 2). Empty if `root` reaches nothing (it was
    /// never recorded as a source node there).
    pub(crate) fn sync_set(&self, root: &AssetId) -> IndexSet<AssetId> {
        match self.reachable_roots.get_node_id_by_content_key(root) {
            Some(node_id) => self
                .reachable_roots
                .nodes_connected_from(node_id)
                .filter_map(|id| self.reachable_roots.get_node(id).cloned())
                .collect(),
            None => IndexSet::new(),
        }
    }

    /// Folds one bundle-group member's own-assets and sync-set into the
    /// group accumulator, incrementing the per-asset reference count.
    fn accumulate_group_member(
        &self,
        member: &AssetId,
        member_sync: &IndexSet<AssetId>,
        group_set: &mut IndexSet<AssetId>,
        ref_counts: &mut IndexMap<AssetId, u32>,
    ) {
        let bundle_id = match self.bundle_roots.get(member) {
            Some((bid, _)) => *bid,
            None => return,
        };
        let own_assets = self
            .bundle_graph
            .get_node(bundle_id)
            .map(|bundle| bundle.assets.clone())
            .unwrap_or_default();
        for asset_id in own_assets.iter().chain(member_sync.iter()) {
            group_set.insert(asset_id.clone());
            *ref_counts.entry(asset_id.clone()).or_insert(0) += 1;
        }
    }
}

/// §4.4 step 4's intersect-vs-union asymmetry, shared by the async-child and
/// bundle-group-sibling propagation steps.
fn merge_ancestor_set(
    ancestor_assets: &mut IndexMap<AssetId, IndexSet<AssetId>>,
    target: AssetId,
    available: &IndexSet<AssetId>,
    multi_parent: bool,
) {
    match ancestor_assets.get_mut(&target) {
        None => {
            ancestor_assets.insert(target, available.clone());
        }
        Some(existing) if multi_parent => {
            existing.retain(|asset_id| available.contains(asset_id));
        }
        Some(existing) => {
            existing.extend(available.iter().cloned());
        }
    }
}
