//! §4.7 Phase 6 — Plan export. The last phase; consumes the planner frame
//! and hands its graphs over to the frozen [`IdealPlan`] (§3 lifecycle: "...
//! frozen at phase 6. No concurrent mutation.").

use indexmap::IndexMap;

use crate::error::PlanResult;
use crate::model::InputGraph;
use crate::plan::IdealPlan;
use crate::planner::Planner;

impl<'g, G: InputGraph> Planner<'g, G> {
    pub(crate) fn phase6_export(self) -> PlanResult<IdealPlan> {
        let mut entry_bundles = IndexMap::new();
        for asset_id in &self.entry_asset_ids {
            if let Some((bundle_id, _)) = self.bundle_roots.get(asset_id) {
                entry_bundles.insert(asset_id.clone(), *bundle_id);
            }
        }

        Ok(IdealPlan {
            bundle_graph: self.bundle_graph,
            dependency_bundle_graph: self.dependency_bundle_graph,
            bundle_group_bundle_ids: self.bundle_group_bundle_ids,
            entry_bundles,
            asset_reference: self.asset_reference,
        })
    }
}
