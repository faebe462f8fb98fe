//! §9 "Mutable shared state": the four internal graphs (§3) plus the
//! bookkeeping maps every phase reads and writes live as fields of one
//! `Planner` struct, not as parameters threaded through free functions.

use indexmap::{IndexMap, IndexSet};
use petgraph::graph::{DiGraph, NodeIndex as SnapNodeIndex};

use crate::config::PlannerConfig;
use crate::error::{PlanError, PlanResult};
use crate::model::{AssetId, DependencyId, InputGraph};
use crate::plan::{
    AsyncBundleRootGraph, Bundle, BundleGraph, BundleGroupId, BundleId, DependencyBundleGraph,
    IdealPlan, ReachableRootsGraph,
};

/// A snapshot of the host's asset graph, built once at the start of a
/// planning run: nodes carry asset ids, edges carry dependency ids. The
/// planner reads real `Asset`/`Dependency` data through [`InputGraph`] by
/// looking up the id stored on the relevant node or edge; this snapshot
/// only exists so phases 1 and 2 can reuse `petgraph::visit::depth_first_search`
/// the same way the prototype this crate was distilled from did.
pub(crate) struct Snapshot {
    pub graph: DiGraph<AssetId, DependencyId>,
    pub node_of_asset: IndexMap<AssetId, SnapNodeIndex>,
}

impl Snapshot {
    fn build(input: &impl InputGraph) -> PlanResult<Self> {
        let mut graph = DiGraph::new();
        let mut node_of_asset = IndexMap::new();

        for asset_id in input.assets() {
            let idx = graph.add_node(asset_id.clone());
            node_of_asset.insert(asset_id, idx);
        }

        for asset_id in input.assets() {
            let from = node_of_asset[&asset_id];
            for dep_id in input.dependencies_of(&asset_id) {
                let target = input.resolve(&dep_id).ok_or_else(|| {
                    PlanError::dependency_not_resolved(crate::error::Phase::EntryDiscovery, &dep_id)
                })?;
                let to = *node_of_asset.get(&target).ok_or_else(|| {
                    PlanError::missing_asset(crate::error::Phase::EntryDiscovery, &target)
                })?;
                graph.add_edge(from, to, dep_id);
            }
        }

        Ok(Snapshot { graph, node_of_asset })
    }
}

/// Owns the four internal graphs of §3 plus the bookkeeping maps the six
/// phases share. Constructed once per `plan()` call and discarded after
/// Phase 6 hands its graphs over to the returned [`IdealPlan`].
pub(crate) struct Planner<'g, G: InputGraph> {
    pub(crate) input: &'g G,
    pub(crate) config: PlannerConfig,

    pub(crate) snapshot: Snapshot,
    pub(crate) entries: Vec<SnapNodeIndex>,

    // The four internal graphs (§3).
    pub(crate) bundle_graph: BundleGraph,
    pub(crate) async_bundle_root_graph: AsyncBundleRootGraph,
    pub(crate) dependency_bundle_graph: DependencyBundleGraph,
    pub(crate) reachable_roots: ReachableRootsGraph,

    /// `bundleRoots`: asset -> (bundle id, bundle-group id). Injective in
    /// the bundle id.
    pub(crate) bundle_roots: IndexMap<AssetId, (BundleId, BundleGroupId)>,
    /// Reverse of `bundle_roots`'s first component, maintained alongside it.
    pub(crate) bundle_id_to_root_asset: IndexMap<BundleId, AssetId>,
    /// Every asset id registered as an entry (`dependency.isEntry`), in
    /// discovery order.
    pub(crate) entry_asset_ids: Vec<AssetId>,
    /// `bundleGroupBundleIds`.
    pub(crate) bundle_group_bundle_ids: IndexSet<BundleGroupId>,
    /// All bundle-root assets sharing a given bundle-group id, including
    /// the group root itself.
    pub(crate) group_members: IndexMap<BundleGroupId, Vec<AssetId>>,
    /// Async bundle-root asset ids created by an async/isolation split
    /// (i.e. excluding entries), tracked so phase 5's orphan-drop knows
    /// which bundles are eligible.
    pub(crate) async_root_asset_ids: IndexSet<AssetId>,

    /// `reachableBundles`: (ancestor bundle-root asset, descendant bundle
    /// id reached via an async split under it) pairs recorded while
    /// walking the ancestor frame stack in phase 1.
    pub(crate) reachable_bundles: IndexSet<(AssetId, AssetId)>,
    /// `reachableAsyncRoots`: async/isolated bundle-root asset -> set of
    /// entry/async roots that can lazily reach it.
    pub(crate) reachable_async_roots: IndexMap<AssetId, IndexSet<AssetId>>,
    /// `assetReference`: asset -> (dependency, bundle) pairs recorded by
    /// type-change/inline splits.
    pub(crate) asset_reference: IndexMap<AssetId, Vec<(DependencyId, BundleId)>>,
    /// Phase-1 DFS discovery order, reused by phase 4.
    pub(crate) discovery_order: Vec<AssetId>,

    /// `ancestorAssets`: bundle-root asset -> assets guaranteed already
    /// loaded whenever that root loads (phase 3).
    pub(crate) ancestor_assets: IndexMap<AssetId, IndexSet<AssetId>>,
    /// Per-bundle-group reference counts (phase 3), keyed by the group
    /// root's asset id, then by asset id, to a sibling-root carry count.
    pub(crate) group_reference_count: IndexMap<AssetId, IndexMap<AssetId, u32>>,

    /// Shared-bundle identity cache (phase 4): sorted-concatenated reacher
    /// ids -> the shared bundle synthesized for that exact reacher set.
    pub(crate) shared_bundles_by_key: IndexMap<String, BundleId>,
}

impl<'g, G: InputGraph> Planner<'g, G> {
    pub(crate) fn new(input: &'g G, config: PlannerConfig) -> PlanResult<Self> {
        let snapshot = Snapshot::build(input)?;
        Ok(Planner {
            input,
            config,
            snapshot,
            entries: Vec::new(),
            bundle_graph: BundleGraph::new(),
            async_bundle_root_graph: AsyncBundleRootGraph::new(),
            dependency_bundle_graph: DependencyBundleGraph::new(),
            reachable_roots: ReachableRootsGraph::new(),
            bundle_roots: IndexMap::new(),
            bundle_id_to_root_asset: IndexMap::new(),
            entry_asset_ids: Vec::new(),
            bundle_group_bundle_ids: IndexSet::new(),
            group_members: IndexMap::new(),
            async_root_asset_ids: IndexSet::new(),
            reachable_bundles: IndexSet::new(),
            reachable_async_roots: IndexMap::new(),
            asset_reference: IndexMap::new(),
            discovery_order: Vec::new(),
            ancestor_assets: IndexMap::new(),
            group_reference_count: IndexMap::new(),
            shared_bundles_by_key: IndexMap::new(),
        })
    }

    /// Registers `asset` as rooting a new bundle belonging to bundle-group
    /// `group_id` (`group_id == bundle_id` when `asset` roots its own
    /// group). Keeps `bundle_roots`, the reverse map and `group_members` in
    /// sync — every call site that creates a bundle root goes through here.
    pub(crate) fn register_bundle_root(
        &mut self,
        asset_id: AssetId,
        bundle_id: BundleId,
        group_id: BundleGroupId,
    ) {
        self.bundle_roots.insert(asset_id.clone(), (bundle_id, group_id));
        self.bundle_id_to_root_asset.insert(bundle_id, asset_id.clone());
        self.group_members.entry(group_id).or_default().push(asset_id);
    }

    pub(crate) fn snapshot_node(&self, asset_id: &AssetId) -> SnapNodeIndex {
        self.snapshot.node_of_asset[asset_id]
    }

    pub(crate) fn asset_id_at(&self, node: SnapNodeIndex) -> AssetId {
        self.snapshot.graph[node].clone()
    }
}

/// §2: `plan(inputGraph, config) → idealPlan`. The single pure entry point
/// this crate exists to provide.
pub fn plan<G: InputGraph>(input: &G, config: PlannerConfig) -> PlanResult<IdealPlan> {
    let mut planner = Planner::new(input, config)?;

    {
        let _span = tracing::info_span!("phase1_entry_discovery").entered();
        planner.phase1_entry_discovery()?;
    }
    {
        let _span = tracing::info_span!("phase2_reachability").entered();
        planner.phase2_reachability()?;
    }
    {
        let _span = tracing::info_span!("phase3_ancestor_availability").entered();
        planner.phase3_ancestor_availability()?;
    }
    {
        let _span = tracing::info_span!("phase4_placement").entered();
        planner.phase4_placement()?;
    }
    {
        let _span = tracing::info_span!("phase5_merge").entered();
        planner.phase5_merge_and_cleanup()?;
    }
    let result = {
        let _span = tracing::info_span!("phase6_export").entered();
        planner.phase6_export()?
    };

    tracing::info!(
        bundles = result.bundle_graph.node_count(),
        bundle_groups = result.bundle_group_bundle_ids.len(),
        "planning complete"
    );

    Ok(result)
}
