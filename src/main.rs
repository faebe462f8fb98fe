//! Small demo binary exercising the planner end to end over a hand-built
//! asset graph, in the same shape as the prototype this crate grew from:
//! two HTML entries, a shared async boundary, and a CSS type-change split.
//!
//! This is not part of the library's public surface — it only demonstrates
//! wiring a host's own asset graph up to [`ideal_bundle_planner::model::InputGraph`].

use std::path::PathBuf;

use indexmap::IndexMap;

use ideal_bundle_planner::model::{
    Asset, AssetId, AssetStats, AssetType, BundleBehavior, Dependency, DependencyId, Environment,
    EnvContext, InputGraph, Priority, Target,
};
use ideal_bundle_planner::{plan, PlannerConfig};

struct DemoGraph {
    assets: IndexMap<AssetId, Asset>,
    dependencies: IndexMap<DependencyId, Dependency>,
    resolves: IndexMap<DependencyId, AssetId>,
    outgoing: IndexMap<AssetId, Vec<DependencyId>>,
    incoming: IndexMap<AssetId, Vec<DependencyId>>,
}

impl DemoGraph {
    fn new() -> Self {
        DemoGraph {
            assets: IndexMap::new(),
            dependencies: IndexMap::new(),
            resolves: IndexMap::new(),
            outgoing: IndexMap::new(),
            incoming: IndexMap::new(),
        }
    }

    fn add_asset(&mut self, id: &str, asset_type: &str, size: u64) -> AssetId {
        let asset_id = AssetId::new(id);
        self.assets.insert(
            asset_id.clone(),
            Asset {
                id: asset_id.clone(),
                asset_type: AssetType::new(asset_type),
                env: Environment::new(EnvContext::Browser),
                bundle_behavior: BundleBehavior::Normal,
                stats: AssetStats { size },
                file_path: PathBuf::from(id),
            },
        );
        asset_id
    }

    fn add_entry(&mut self, asset_id: &AssetId, target: &str) {
        let dep_id = DependencyId::new(format!("entry:{asset_id}"));
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

    fn add_dependency(&mut self, from: &AssetId, to: &AssetId, priority: Priority) {
        let dep_id = DependencyId::new(format!("dep:{from}->{to}"));
        self.dependencies.insert(
            dep_id.clone(),
            Dependency {
                id: dep_id.clone(),
                priority,
                is_entry: false,
                target: None,
                bundle_behavior: None,
                needs_stable_name: false,
            },
        );
        self.resolves.insert(dep_id.clone(), to.clone());
        self.outgoing.entry(from.clone()).or_default().push(dep_id.clone());
        self.incoming.entry(to.clone()).or_default().push(dep_id);
    }
}

impl InputGraph for DemoGraph {
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

fn build_graph() -> DemoGraph {
    let mut g = DemoGraph::new();

    let html = g.add_asset("a.html", "html", 10);
    let html2 = g.add_asset("b.html", "html", 10);
    let js = g.add_asset("a.js", "js", 10);
    let async_js = g.add_asset("async.js", "js", 10);
    let async2_js = g.add_asset("async2.js", "js", 10);
    let js4 = g.add_asset("b.js", "js", 10);
    let shared_js = g.add_asset("shared.js", "js", 10);
    let css = g.add_asset("styles.css", "css", 10);

    g.add_entry(&html, "browser");
    g.add_entry(&html2, "browser");

    g.add_dependency(&html, &js, Priority::Sync);
    g.add_dependency(&js, &async_js, Priority::Lazy);
    g.add_dependency(&js, &async2_js, Priority::Sync);
    g.add_dependency(&async_js, &async2_js, Priority::Sync);
    g.add_dependency(&async2_js, &shared_js, Priority::Sync);
    g.add_dependency(&js, &css, Priority::Sync);

    g.add_dependency(&html2, &js4, Priority::Sync);
    g.add_dependency(&js4, &shared_js, Priority::Sync);

    g
}

fn main() {
    let graph = build_graph();
    let config = PlannerConfig::default();

    let ideal_plan = plan(&graph, config).expect("demo graph is well-formed");

    for bundle_id in ideal_plan.bundle_graph.node_ids() {
        let bundle = ideal_plan.bundle(bundle_id).expect("node id came from this graph");
        let names: Vec<&str> = bundle.assets.iter().map(|id| id.as_str()).collect();
        println!("{} ({} bytes)", names.join(", "), bundle.size);
    }
}
