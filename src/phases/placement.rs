//! §4.5 Phase 4 — Placement.

use crate::error::PlanResult;
use crate::model::{Asset, AssetId, InputGraph};
use crate::plan::{Bundle, BundleId};
use crate::planner::Planner;

impl<'g, G: InputGraph> Planner<'g, G> {
    pub(crate) fn phase4_placement(&mut self) -> PlanResult<()> {
        let discovery_order = self.discovery_order.clone();

        for asset_id in discovery_order {
            let asset = match self.input.get_asset(&asset_id) {
                Some(a) => a.clone(),
                None => continue,
            };

            let reachers = self.reachers_of(&asset_id);
            let filtered = self.filter_reachers(&asset_id, reachers);

            if let Some((bundle_id, _group_id)) = self.bundle_roots.get(&asset_id).cloned() {
                for r in &filtered {
                    if *r == asset_id {
                        continue;
                    }
                    if let Some((_, r_group_id)) = self.bundle_roots.get(r).cloned() {
                        self.bundle_graph.add_edge(r_group_id, bundle_id);
                    }
                }
                self.internalize_async(&asset_id, &filtered);
            } else if filtered.len() == 1 {
                // A single reacher owns `asset` outright — no shared bundle
                // is needed (§8 invariant 3: a shared bundle always has
                // `|sourceBundles| ≥ 2`; one reacher is just that reacher's
                // own bundle).
                if let Some((bundle_id, _)) = self.bundle_roots.get(&filtered[0]).cloned() {
                    if let Some(bundle) = self.bundle_graph.get_node_mut(bundle_id) {
                        bundle.add_asset(&asset);
                    }
                }
            } else if filtered.len() >= 2 {
                self.place_in_shared_bundle(&asset_id, &asset, &filtered);
            }
            // else: no owner — unreachable or fully internalized elsewhere.
        }

        Ok(())
    }

    /// `reachable(a)`: bundle roots with an edge `root -> a` in
    /// `reachableRoots`.
    fn reachers_of(&self, asset: &AssetId) -> Vec<AssetId> {
        match self.reachable_roots.get_node_id_by_content_key(asset) {
            Some(node_id) => self
                .reachable_roots
                .nodes_connected_to(node_id)
                .filter_map(|id| self.reachable_roots.get_node(id).cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    /// §4.5 step 2: drop a reacher already guaranteed to deliver `asset` as
    /// an ancestor, then drop any survivor where `asset` is carried by more
    /// than one sibling root in that reacher's bundle group (belongs
    /// upstream, not duplicated locally — §9 Open Questions: this filter is
    /// pinned as currently specified, not tightened further).
    fn filter_reachers(&self, asset: &AssetId, reachers: Vec<AssetId>) -> Vec<AssetId> {
        reachers
            .into_iter()
            .filter(|r| {
                if self
                    .ancestor_assets
                    .get(r)
                    .map_or(false, |set| set.contains(asset))
                {
                    return false;
                }
                if let Some((_, group_id)) = self.bundle_roots.get(r) {
                    if let Some(group_root_asset) = self.bundle_id_to_root_asset.get(group_id) {
                        if let Some(counts) = self.group_reference_count.get(group_root_asset) {
                            if counts.get(asset).copied().unwrap_or(0) > 1 {
                                return false;
                            }
                        }
                    }
                }
                true
            })
            .collect()
    }

    /// §4.5 step 3 first bullet, second half: an async import target that is
    /// also guaranteed delivered by every holder becomes a no-op fetch.
    fn internalize_async(&mut self, asset_id: &AssetId, filtered: &[AssetId]) {
        let roots = match self.reachable_async_roots.get(asset_id) {
            Some(set) => set.clone(),
            None => return,
        };

        for r in roots {
            let dominates = filtered.contains(&r)
                || filtered
                    .iter()
                    .any(|reacher| self.reachable_bundles.contains(&(r.clone(), reacher.clone())));
            if !dominates {
                continue;
            }
            if let Some((r_bundle_id, _)) = self.bundle_roots.get(&r).cloned() {
                if let Some(bundle) = self.bundle_graph.get_node_mut(r_bundle_id) {
                    if !bundle.internalized_asset_ids.contains(asset_id) {
                        bundle.internalized_asset_ids.push(asset_id.clone());
                    }
                }
            }
        }
    }

    /// §4.5 step 3 third bullet: synthesize (or reuse) the shared bundle
    /// keyed by the sorted-concatenated reacher ids plus `asset`'s type and
    /// env context, and add `asset` to it. The type/context is part of the
    /// key (not just the reacher set) so that two assets of different types
    /// reached by the exact same entries never land in one bundle (§8
    /// invariant 4) — a non-root asset's type is only guaranteed to match
    /// its own DFS-tree parent (§4.2), not every other non-root asset that
    /// happens to share its reacher set.
    fn place_in_shared_bundle(&mut self, _asset_id: &AssetId, asset: &Asset, filtered: &[AssetId]) {
        let mut sorted: Vec<&AssetId> = filtered.iter().collect();
        sorted.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        let key: String = format!(
            "{}\u{0}{:?}\u{0}{}",
            asset.asset_type,
            asset.env.context,
            sorted.iter().map(|id| id.as_str()).collect::<Vec<_>>().join("\u{0}"),
        );

        let bundle_id: BundleId = if let Some(&id) = self.shared_bundles_by_key.get(&key) {
            id
        } else {
            let source_bundles: Vec<BundleId> = sorted
                .iter()
                .filter_map(|r| self.bundle_roots.get(*r).map(|(bid, _)| *bid))
                .collect();
            let id = self.bundle_graph.add_node(Bundle::empty_shared(source_bundles));
            self.shared_bundles_by_key.insert(key, id);
            id
        };

        if let Some(bundle) = self.bundle_graph.get_node_mut(bundle_id) {
            bundle.add_asset(asset);
        }

        for r in filtered {
            if let Some((_, group_id)) = self.bundle_roots.get(r).cloned() {
                if group_id != bundle_id {
                    self.bundle_graph.add_edge(group_id, bundle_id);
                }
            }
        }
    }
}
