//! §4.6 Phase 5 — Merge and cleanup.

use crate::error::PlanResult;
use crate::model::{AssetId, InputGraph};
use crate::plan::{BundleGroupId, BundleId};
use crate::planner::Planner;

impl<'g, G: InputGraph> Planner<'g, G> {
    pub(crate) fn phase5_merge_and_cleanup(&mut self) -> PlanResult<()> {
        self.small_shared_merge();
        self.entry_sibling_fold();
        self.orphan_drop();
        self.parallel_request_trim();
        Ok(())
    }

    /// §4.6 step 1: a shared bundle below `minBundleSize` is dissolved, its
    /// assets copied into every one of its source bundles.
    fn small_shared_merge(&mut self) {
        let threshold = self.config.min_bundle_size;
        let candidates: Vec<BundleId> = self
            .bundle_graph
            .node_ids()
            .filter(|&id| {
                self.bundle_graph
                    .get_node(id)
                    .map_or(false, |b| b.is_shared() && b.size < threshold)
            })
            .collect();
        for bundle_id in candidates {
            self.remove_shared_bundle(bundle_id);
        }
    }

    /// Copies `bundle_id`'s assets into each of its `source_bundles`, then
    /// removes the node. Shared by the small-shared merge (§4.6 step 1), the
    /// entry-sibling collapse (§4.6 step 2) and the parallel-request trim
    /// (§4.6 step 4, §10.2) — all three dissolve a bundle back into whatever
    /// bundles are left holding it.
    fn remove_shared_bundle(&mut self, bundle_id: BundleId) {
        let (asset_ids, source_bundles) = match self.bundle_graph.get_node(bundle_id) {
            Some(b) => (
                b.assets.iter().cloned().collect::<Vec<_>>(),
                b.source_bundles.clone(),
            ),
            None => return,
        };
        for source in &source_bundles {
            self.merge_assets_into(*source, &asset_ids);
        }
        self.bundle_graph.remove_node(bundle_id);
        self.shared_bundles_by_key.retain(|_, v| *v != bundle_id);
    }

    /// Merges `asset_ids` into `bundle_id`'s own asset set, unless that
    /// bundle is isolated or inline — those never take on foreign assets (§3
    /// invariant: "`isolated` and `inline` assets never share a bundle with
    /// foreign assets"), matching the same exclusion phase 3's group
    /// accumulation already applies (`ancestor_availability::phase3_ancestor_availability`).
    fn merge_assets_into(&mut self, bundle_id: BundleId, asset_ids: &[AssetId]) {
        let excluded = self
            .bundle_graph
            .get_node(bundle_id)
            .and_then(|b| b.bundle_behavior)
            .map_or(false, |behavior| behavior.is_isolated() || behavior.is_inline());
        if excluded {
            return;
        }
        for id in asset_ids {
            let asset = match self.input.get_asset(id) {
                Some(a) => a.clone(),
                None => continue,
            };
            if let Some(bundle) = self.bundle_graph.get_node_mut(bundle_id) {
                bundle.add_asset(&asset);
            }
        }
    }

    /// §4.6 step 2: fold same-type *type-change* siblings of every entry
    /// bundle back into the entry itself, so entry output names stay
    /// deterministic. Shared bundles (`source_bundles` nonempty) connected
    /// from the entry are excluded: those are phase 4's synthesized shared
    /// bundles, not type-change siblings, and folding them here would
    /// silently dissolve a legitimate shared bundle back into just one of
    /// its sources the moment that source happens to be an entry (§8
    /// invariant 3 requires a surviving shared bundle keep `>= 2` sources).
    fn entry_sibling_fold(&mut self) {
        let entries: Vec<AssetId> = self.entry_asset_ids.clone();

        for e_asset in entries {
            let e_bundle_id = match self.bundle_roots.get(&e_asset) {
                Some((bid, _)) => *bid,
                None => continue,
            };
            let e_type = self.bundle_graph.get_node(e_bundle_id).and_then(|b| b.asset_type.clone());
            let e_type = match e_type {
                Some(t) => t,
                None => continue,
            };

            let siblings: Vec<BundleId> = self.bundle_graph.nodes_connected_from(e_bundle_id).collect();
            for s_bundle_id in siblings {
                let s_node = self.bundle_graph.get_node(s_bundle_id);
                let is_shared = s_node.map_or(false, |b| b.is_shared());
                if is_shared {
                    continue;
                }
                let s_type_matches = s_node
                    .and_then(|b| b.asset_type.clone())
                    .map_or(false, |t| t == e_type);
                if !s_type_matches {
                    continue;
                }

                let asset_ids: Vec<AssetId> = self
                    .bundle_graph
                    .get_node(s_bundle_id)
                    .map(|b| b.assets.iter().cloned().collect())
                    .unwrap_or_default();
                self.merge_assets_into(e_bundle_id, &asset_ids);
                self.bundle_graph.remove_edge(e_bundle_id, s_bundle_id);

                if let Some(s_root_asset) = self.bundle_id_to_root_asset.get(&s_bundle_id).cloned() {
                    if let Some(set) = self.reachable_async_roots.get_mut(&s_root_asset) {
                        set.shift_remove(&e_asset);
                    }
                }
            }
        }
    }

    /// §4.6 step 3: an async bundle root that nothing ever lazily reaches is
    /// unreachable output and is dropped.
    fn orphan_drop(&mut self) {
        let async_roots: Vec<AssetId> = self.async_root_asset_ids.iter().cloned().collect();
        for asset_id in async_roots {
            let empty = self
                .reachable_async_roots
                .get(&asset_id)
                .map_or(true, |s| s.is_empty());
            if !empty {
                continue;
            }
            if let Some((bundle_id, group_id)) = self.bundle_roots.get(&asset_id).cloned() {
                self.bundle_graph.remove_node(bundle_id);
                self.bundle_roots.shift_remove(&asset_id);
                self.bundle_id_to_root_asset.shift_remove(&bundle_id);
                self.bundle_group_bundle_ids.shift_remove(&group_id);
                self.group_members.shift_remove(&group_id);
            }
        }
    }

    /// §4.6 step 4 (§10.2 supplement): a bundle group with more siblings
    /// than `maxParallelRequests` folds its smallest *shared* siblings back
    /// into their sources, exactly like the small-shared merge, until the
    /// group is back within the limit (or it runs out of shared siblings to
    /// fold — type-change siblings have no source bundles to fall back to
    /// and are left in place).
    fn parallel_request_trim(&mut self) {
        let limit = self.config.max_parallel_requests as usize;
        let groups: Vec<BundleGroupId> = self.bundle_group_bundle_ids.iter().cloned().collect();

        for group_id in groups {
            let siblings: Vec<BundleId> = self.bundle_graph.nodes_connected_from(group_id).collect();
            if siblings.len() <= limit {
                continue;
            }

            let mut shared: Vec<BundleId> = siblings
                .iter()
                .cloned()
                .filter(|id| {
                    self.bundle_graph
                        .get_node(*id)
                        .map_or(false, |b| !b.source_bundles.is_empty())
                })
                .collect();
            shared.sort_by_key(|id| self.bundle_graph.get_node(*id).map_or(0, |b| b.size));

            let excess = siblings.len() - limit;
            for bundle_id in shared.into_iter().take(excess) {
                self.remove_shared_bundle(bundle_id);
            }
        }
    }
}
