//! Shared `InputGraph` test fixture: a small hand-buildable asset graph,
//! generalized from the wiring in `src/main.rs`'s demo so scenario and
//! property tests don't each reinvent it.

use std::path::PathBuf;

use indexmap::IndexMap;

use ideal_bundle_planner::model::{
    Asset, AssetId, AssetStats, AssetType, BundleBehavior, Dependency, DependencyId, EnvContext,
    Environment, InputGraph, Priority, Target,
};

#[derive(Debug, Clone, Default)]
pub struct TestGraph {
    assets: IndexMap<AssetId, Asset>,
    dependencies: IndexMap<DependencyId, Dependency>,
    resolves: IndexMap<DependencyId, AssetId>,
    outgoing: IndexMap<AssetId, Vec<DependencyId>>,
    incoming: IndexMap<AssetId, Vec<DependencyId>>,
    next_dep: u32,
}

/// Installs a `tracing` subscriber that writes through the test harness's own
/// writer, filtered by `RUST_LOG` (falling back to `ideal_bundle_planner=debug`).
/// Safe to call from every test; the second and later calls are no-ops.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ideal_bundle_planner=debug".parse().unwrap()),
        )
        .try_init();
}

impl TestGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset(&mut self, id: &str, asset_type: &str, size: u64) -> AssetId {
        self.asset_full(id, asset_type, size, Environment::new(EnvContext::Browser), BundleBehavior::Normal)
    }

    pub fn asset_full(
        &mut self,
        id: &str,
        asset_type: &str,
        size: u64,
        env: Environment,
        bundle_behavior: BundleBehavior,
    ) -> AssetId {
        let asset_id = AssetId::new(id);
        self.assets.insert(
            asset_id.clone(),
            Asset {
                id: asset_id.clone(),
                asset_type: AssetType::new(asset_type),
                env,
                bundle_behavior,
                stats: AssetStats { size },
                file_path: PathBuf::from(id),
            },
        );
        asset_id
    }

    fn fresh_dep_id(&mut self, prefix: &str) -> DependencyId {
        self.next_dep += 1;
        DependencyId::new(format!("{prefix}#{}", self.next_dep))
    }

    pub fn entry(&mut self, asset_id: &AssetId, target: &str) {
        let dep_id = self.fresh_dep_id("entry");
        self.dependencies.insert(
            dep_id.clone(),
            Dependency {
                id: dep_id.clone(),
                priority: Priority::Sync,
                is_entry: true,
                target: Some(Target::new(target)),
                bundle_behavior: None,
                needs_stable_name: true,
            },
        );
        self.resolves.insert(dep_id.clone(), asset_id.clone());
        self.incoming.entry(asset_id.clone()).or_default().push(dep_id);
    }

    pub fn dep(&mut self, from: &AssetId, to: &AssetId, priority: Priority) {
        self.dep_full(from, to, priority, None, false);
    }

    pub fn dep_full(
        &mut self,
        from: &AssetId,
        to: &AssetId,
        priority: Priority,
        bundle_behavior: Option<BundleBehavior>,
        needs_stable_name: bool,
    ) {
        let dep_id = self.fresh_dep_id("dep");
        self.dependencies.insert(
            dep_id.clone(),
            Dependency {
                id: dep_id.clone(),
                priority,
                is_entry: false,
                target: None,
                bundle_behavior,
                needs_stable_name,
            },
        );
        self.resolves.insert(dep_id.clone(), to.clone());
        self.outgoing.entry(from.clone()).or_default().push(dep_id.clone());
        self.incoming.entry(to.clone()).or_default().push(dep_id);
    }
}

impl InputGraph for TestGraph {
    fn assets(&self) -> Vec<AssetId> {
        self.assets.keys().cloned().collect()
    }

    fn get_asset(&self, id: &AssetId) -> Option<&Asset> {
        self.assets.get(id)
    }

    fn get_dependency(&self, id: &DependencyId) -> Option<&Dependency> {
        self.dependencies.get(id)
    }

    fn dependencies_of(&self, asset: &AssetId) -> Vec<DependencyId> {
        self.outgoing.get(asset).cloned().unwrap_or_default()
    }

    fn resolve(&self, dependency: &DependencyId) -> Option<AssetId> {
        self.resolves.get(dependency).cloned()
    }

    fn incoming_dependencies(&self, asset: &AssetId) -> Vec<DependencyId> {
        self.incoming.get(asset).cloned().unwrap_or_default()
    }
}
