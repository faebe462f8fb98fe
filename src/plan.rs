//! Planner-owned entities (§3 `Bundle`) and the final exported plan (§4.7).

use indexmap::{IndexMap, IndexSet};

use crate::graph::{ContentAddressedGraph, DirectedGraph, NodeId};
use crate::model::{Asset, AssetId, AssetType, BundleBehavior, DependencyId, Environment, Priority, Target};

/// Identifies a node in `bundleGraph` — i.e. a [`Bundle`].
pub type BundleId = NodeId;

/// Identifies a bundle-group root. Bundle groups are not a distinct node
/// type (§9 design notes favor tagged variants over inventing new concepts
/// where the distilled algorithm doesn't need one): a bundle group's id is
/// simply the `BundleId` of the bundle that roots it, exactly as the
/// prototype this was distilled from represents it. The alias exists so
/// call sites can say "this id denotes a group root" without a runtime
/// wrapper.
pub type BundleGroupId = NodeId;

/// §3 Bundle (planner-owned).
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    pub assets: IndexSet<AssetId>,
    pub internalized_asset_ids: Vec<AssetId>,
    pub source_bundles: Vec<BundleId>,
    pub size: u64,
    pub target: Option<Target>,
    pub env: Option<Environment>,
    pub asset_type: Option<AssetType>,
    pub needs_stable_name: bool,
    pub bundle_behavior: Option<BundleBehavior>,
}

impl Bundle {
    /// A bundle rooted at `asset` (phase 1: entry, async split or
    /// type-change split target).
    pub fn rooted_at(
        asset: &Asset,
        target: Option<Target>,
        needs_stable_name: bool,
        bundle_behavior: Option<BundleBehavior>,
    ) -> Self {
        let mut bundle = Bundle {
            target,
            needs_stable_name,
            bundle_behavior,
            ..Default::default()
        };
        bundle.add_asset(asset);
        bundle
    }

    /// An empty shared bundle (phase 4), before any asset has been added to
    /// it — `target`/`env`/`asset_type` are filled in by the first
    /// `add_asset` call.
    pub fn empty_shared(source_bundles: Vec<BundleId>) -> Self {
        Bundle {
            source_bundles,
            ..Default::default()
        }
    }

    /// Adds `asset` to this bundle's asset set, updating `size` to match
    /// (§3 invariant: `bundle.size == Σ asset.stats.size`). A no-op if the
    /// asset is already present (re-placement is idempotent).
    pub fn add_asset(&mut self, asset: &Asset) {
        if self.asset_type.is_none() {
            self.asset_type = Some(asset.asset_type.clone());
            self.env = Some(asset.env);
        }
        if self.assets.insert(asset.id.clone()) {
            self.size += asset.stats.size;
        }
    }

    pub fn is_shared(&self) -> bool {
        !self.source_bundles.is_empty()
    }
}

/// Node payload for the bipartite `dependencyBundleGraph` (§3). Represented
/// as a tagged variant rather than by polymorphism, per §9.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyBundleNode {
    Dependency(DependencyId),
    Bundle(BundleId),
}

/// Content key for `dependencyBundleGraph`: dependency ids and bundle ids
/// live in different namespaces, so the key must distinguish them even
/// though a `BundleId` and some other dependency's hash could otherwise
/// collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencyBundleKey {
    Dependency(DependencyId),
    Bundle(BundleId),
}

/// `dependencyBundleGraph` (§3.4): bipartite, edges labeled with dependency
/// [`Priority`].
pub type DependencyBundleGraph = ContentAddressedGraph<DependencyBundleKey, DependencyBundleNode, Priority>;

/// Content key / node payload for `asyncBundleRootGraph` (§3.2): keyed by
/// asset id, plus one synthetic root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AsyncRootKey {
    Synthetic,
    Asset(AssetId),
}

/// `asyncBundleRootGraph`: unlabeled edges (parent bundle root → child
/// bundle root across an async/isolated boundary).
pub type AsyncBundleRootGraph = ContentAddressedGraph<AsyncRootKey, AsyncRootKey, ()>;

/// `reachableRoots` (§3.3): content-addressed by asset id; an edge
/// `root → asset` means `asset` is synchronously reachable from bundle-root
/// `root` without crossing a split point.
pub type ReachableRootsGraph = ContentAddressedGraph<AssetId, AssetId, ()>;

/// `bundleGraph` (§3.1): "loaded together with" edges between bundles.
pub type BundleGraph = DirectedGraph<Bundle>;

/// §4.7 Phase 6 output. Frozen: nothing further mutates it.
#[derive(Debug)]
pub struct IdealPlan {
    pub bundle_graph: BundleGraph,
    pub dependency_bundle_graph: DependencyBundleGraph,
    pub bundle_group_bundle_ids: IndexSet<BundleGroupId>,
    pub entry_bundles: IndexMap<AssetId, BundleId>,
    pub asset_reference: IndexMap<AssetId, Vec<(DependencyId, BundleId)>>,
}

impl IdealPlan {
    /// Convenience accessor (§10.5): a flat iterator over bundle-group root
    /// ids, for hosts that don't want to re-derive it from `bundle_graph`.
    pub fn bundle_groups(&self) -> impl Iterator<Item = &BundleGroupId> {
        self.bundle_group_bundle_ids.iter()
    }

    pub fn bundle(&self, id: BundleId) -> Option<&Bundle> {
        self.bundle_graph.get_node(id)
    }
}
