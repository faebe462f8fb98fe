//! §4.2 Phase 1 — Entry & split-point discovery.

use petgraph::visit::{depth_first_search, Control, DfsEvent};

use crate::error::{Phase, PlanError, PlanResult};
use crate::model::{AssetId, BundleBehavior, Dependency, DependencyId, InputGraph, Priority};
use crate::plan::{AsyncRootKey, Bundle, DependencyBundleKey, DependencyBundleNode};
use crate::planner::Planner;

impl<'g, G: InputGraph> Planner<'g, G> {
    pub(crate) fn phase1_entry_discovery(&mut self) -> PlanResult<()> {
        self.entry_pass()?;
        self.split_pass()?;
        Ok(())
    }

    /// Entry pass: every `(asset, dependency)` pair with `dependency.isEntry`
    /// roots its own bundle and bundle group. Every dependency in the graph
    /// shows up as exactly one asset's incoming dependency (§3 invariant: a
    /// dependency resolves to exactly one asset), so enumerating
    /// `incoming_dependencies` over every asset visits every dependency once.
    fn entry_pass(&mut self) -> PlanResult<()> {
        let synthetic_root = self
            .async_bundle_root_graph
            .add_node_by_content_key(AsyncRootKey::Synthetic, || AsyncRootKey::Synthetic);

        for asset_id in self.input.assets() {
            for dep_id in self.input.incoming_dependencies(&asset_id) {
                let dep = self
                    .input
                    .get_dependency(&dep_id)
                    .ok_or_else(|| missing_dependency(&dep_id))?
                    .clone();
                if !dep.is_entry {
                    continue;
                }
                let asset = self
                    .input
                    .get_asset(&asset_id)
                    .ok_or_else(|| PlanError::missing_asset(Phase::EntryDiscovery, &asset_id))?
                    .clone();

                let bundle_id = self.bundle_graph.add_node(Bundle::rooted_at(
                    &asset,
                    dep.target.clone(),
                    dep.is_entry,
                    dep.bundle_behavior,
                ));
                self.register_bundle_root(asset_id.clone(), bundle_id, bundle_id);
                self.bundle_group_bundle_ids.insert(bundle_id);
                self.entry_asset_ids.push(asset_id.clone());

                let entry_node = self
                    .async_bundle_root_graph
                    .add_node_by_content_key(AsyncRootKey::Asset(asset_id.clone()), || {
                        AsyncRootKey::Asset(asset_id.clone())
                    });
                self.async_bundle_root_graph.add_edge(synthetic_root, entry_node, ());

                self.entries.push(self.snapshot_node(&asset_id));
            }
        }

        Ok(())
    }

    /// Split pass: one DFS over the whole asset graph, starting at every
    /// entry found above. On each tree edge, decides whether the dependency
    /// it carries is an async/isolation split, a type-change/inline split,
    /// or no split at all (§4.2).
    fn split_pass(&mut self) -> PlanResult<()> {
        let entries = self.entries.clone();
        // Disjoint field borrows (match ergonomics on `&mut self`): `input`
        // is `Copy` (it's a reference) so it's taken out first; the rest are
        // borrowed as distinct `&mut` fields so the `depth_first_search`
        // closure below can hold `&snapshot.graph` and mutate the others at
        // the same time without aliasing `self` as a whole.
        let input = self.input;
        let Planner {
            snapshot,
            bundle_graph,
            async_bundle_root_graph,
            dependency_bundle_graph,
            bundle_roots,
            bundle_id_to_root_asset,
            group_members,
            async_root_asset_ids,
            reachable_bundles,
            bundle_group_bundle_ids,
            discovery_order,
            asset_reference,
            ..
        } = self;

        // `stack` mirrors the ancestor frames of bundle-root assets seen so
        // far on the current DFS path: `(node, bundle_group_id)`.
        let mut stack: Vec<(petgraph::graph::NodeIndex, crate::plan::BundleGroupId)> = Vec::new();
        let mut error: Option<PlanError> = None;

        depth_first_search(&snapshot.graph, entries.iter().copied(), |event| {
            match event {
                DfsEvent::Discover(node, _) => {
                    discovery_order.push(snapshot.graph[node].clone());
                    if let Some((_, group_id)) = bundle_roots.get(&snapshot.graph[node]) {
                        stack.push((node, *group_id));
                    }
                }
                DfsEvent::TreeEdge(u, v) => {
                    let edge = snapshot.graph.find_edge(u, v).expect("tree edge exists");
                    let dep_id = snapshot.graph[edge].clone();
                    let result = handle_tree_edge(
                        input,
                        &snapshot.graph,
                        &dep_id,
                        u,
                        v,
                        &stack,
                        bundle_graph,
                        async_bundle_root_graph,
                        dependency_bundle_graph,
                        bundle_roots,
                        bundle_id_to_root_asset,
                        group_members,
                        async_root_asset_ids,
                        reachable_bundles,
                        bundle_group_bundle_ids,
                        asset_reference,
                    );
                    match result {
                        Ok(()) => {}
                        Err(e) => {
                            error = Some(e);
                            return Control::Break(());
                        }
                    }
                }
                DfsEvent::Finish(node, _) => {
                    if let Some((top, _)) = stack.last() {
                        if *top == node {
                            stack.pop();
                        }
                    }
                }
                _ => {}
            }
            Control::Continue
        });

        if let Some(e) = error {
            return Err(e);
        }
        Ok(())
    }
}

pub(crate) fn missing_dependency(dep_id: &DependencyId) -> PlanError {
    PlanError::InvariantViolation {
        phase: Phase::EntryDiscovery,
        detail: format!("dependency {dep_id} referenced but not present in the input graph"),
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_tree_edge(
    input: &impl InputGraph,
    snapshot_graph: &petgraph::graph::DiGraph<AssetId, DependencyId>,
    dep_id: &DependencyId,
    parent: petgraph::graph::NodeIndex,
    child: petgraph::graph::NodeIndex,
    stack: &[(petgraph::graph::NodeIndex, crate::plan::BundleGroupId)],
    bundle_graph: &mut crate::plan::BundleGraph,
    async_bundle_root_graph: &mut crate::plan::AsyncBundleRootGraph,
    dependency_bundle_graph: &mut crate::plan::DependencyBundleGraph,
    bundle_roots: &mut indexmap::IndexMap<AssetId, (crate::plan::BundleId, crate::plan::BundleGroupId)>,
    bundle_id_to_root_asset: &mut indexmap::IndexMap<crate::plan::BundleId, AssetId>,
    group_members: &mut indexmap::IndexMap<crate::plan::BundleGroupId, Vec<AssetId>>,
    async_root_asset_ids: &mut indexmap::IndexSet<AssetId>,
    reachable_bundles: &mut indexmap::IndexSet<(AssetId, AssetId)>,
    bundle_group_bundle_ids: &mut indexmap::IndexSet<crate::plan::BundleGroupId>,
    asset_reference: &mut indexmap::IndexMap<AssetId, Vec<(DependencyId, crate::plan::BundleId)>>,
) -> PlanResult<()> {
    let dep = input
        .get_dependency(dep_id)
        .ok_or_else(|| missing_dependency(dep_id))?
        .clone();
    let child_id = snapshot_graph[child].clone();
    let child_asset = input
        .get_asset(&child_id)
        .ok_or_else(|| PlanError::missing_asset(Phase::EntryDiscovery, &child_id))?
        .clone();

    let is_async_split = dep.priority.is_lazy() || child_asset.bundle_behavior.is_isolated();

    if is_async_split {
        let (bundle_id, newly_created) = match bundle_roots.get(&child_id) {
            Some((bid, _)) => (*bid, false),
            None => {
                let target = nearest_ancestor_target(bundle_graph, stack);
                let either_inline = dep.bundle_behavior.map_or(false, |b| b.is_inline())
                    || child_asset.bundle_behavior.is_inline();
                let needs_stable_name = if either_inline {
                    false
                } else {
                    dep.is_entry || dep.needs_stable_name
                };
                let bundle_behavior = dep.bundle_behavior.or(Some(child_asset.bundle_behavior));
                let bid = bundle_graph.add_node(Bundle::rooted_at(
                    &child_asset,
                    target,
                    needs_stable_name,
                    bundle_behavior,
                ));
                bundle_roots.insert(child_id.clone(), (bid, bid));
                bundle_id_to_root_asset.insert(bid, child_id.clone());
                group_members.entry(bid).or_default().push(child_id.clone());
                bundle_group_bundle_ids.insert(bid);
                async_root_asset_ids.insert(child_id.clone());
                (bid, true)
            }
        };
        let _ = newly_created;

        add_dependency_bundle_edge(dependency_bundle_graph, &dep, bundle_id);

        // The immediate ancestor (top frame only, whether or not it is the
        // tree edge's direct parent) gets an async-root edge to the child.
        if let Some((nearest_node, _)) = stack.last() {
            let nearest_asset = snapshot_graph[*nearest_node].clone();
            let parent_node = async_bundle_root_graph.add_node_by_content_key(
                AsyncRootKey::Asset(nearest_asset.clone()),
                || AsyncRootKey::Asset(nearest_asset.clone()),
            );
            let child_node = async_bundle_root_graph
                .add_node_by_content_key(AsyncRootKey::Asset(child_id.clone()), || {
                    AsyncRootKey::Asset(child_id.clone())
                });
            async_bundle_root_graph.add_edge(parent_node, child_node, ());
        }

        // Walk the ancestor frame stack top-down (nearest ancestor first)
        // until type or env context diverges, or an isolated env is hit.
        for (ancestor_node, _group_id) in stack.iter().rev() {
            let ancestor_id = snapshot_graph[*ancestor_node].clone();
            let ancestor_asset = input
                .get_asset(&ancestor_id)
                .ok_or_else(|| PlanError::missing_asset(Phase::EntryDiscovery, &ancestor_id))?;
            if ancestor_asset.asset_type != child_asset.asset_type
                || ancestor_asset.env.context != child_asset.env.context
                || ancestor_asset.env.is_isolated
            {
                break;
            }
            reachable_bundles.insert((ancestor_id, child_id.clone()));
        }

        return Ok(());
    }

    let parent_asset = snapshot_graph[parent].clone();
    let is_type_change_split = {
        let parent = input
            .get_asset(&parent_asset)
            .ok_or_else(|| PlanError::missing_asset(Phase::EntryDiscovery, &parent_asset))?;
        parent.asset_type != child_asset.asset_type || child_asset.bundle_behavior.is_inline()
    };

    if is_type_change_split {
        let (bundle_id, group_id) = match bundle_roots.get(&child_id) {
            Some(pair) => *pair,
            None => {
                let (_, current_group_id) = *stack
                    .last()
                    .ok_or_else(|| PlanError::missing_bundle_root(Phase::EntryDiscovery, &child_id))?;
                let target = bundle_graph
                    .get_node(current_group_id)
                    .and_then(|b| b.target.clone());
                let needs_stable_name = dep.bundle_behavior.map_or(false, |b| b.is_inline());
                let bid = bundle_graph.add_node(Bundle::rooted_at(
                    &child_asset,
                    target,
                    needs_stable_name,
                    dep.bundle_behavior,
                ));
                bundle_graph.add_edge(current_group_id, bid);
                bundle_roots.insert(child_id.clone(), (bid, current_group_id));
                bundle_id_to_root_asset.insert(bid, child_id.clone());
                group_members
                    .entry(current_group_id)
                    .or_default()
                    .push(child_id.clone());
                (bid, current_group_id)
            }
        };
        let _ = group_id;

        asset_reference
            .entry(child_id.clone())
            .or_default()
            .push((dep.id.clone(), bundle_id));

        // §4.2 step 2: labeled `parallel` regardless of the dependency's own
        // priority — a type-change/inline split always behaves as a
        // parallel load, unlike the async-split edge above which carries
        // the dependency's actual priority.
        add_dependency_bundle_edge_labeled(dependency_bundle_graph, &dep, bundle_id, Priority::Parallel);
    }

    Ok(())
}

fn nearest_ancestor_target(
    bundle_graph: &crate::plan::BundleGraph,
    stack: &[(petgraph::graph::NodeIndex, crate::plan::BundleGroupId)],
) -> Option<crate::model::Target> {
    let (_, group_id) = stack.last()?;
    bundle_graph.get_node(*group_id).and_then(|b| b.target.clone())
}

fn add_dependency_bundle_edge(
    graph: &mut crate::plan::DependencyBundleGraph,
    dep: &Dependency,
    bundle_id: crate::plan::BundleId,
) {
    add_dependency_bundle_edge_labeled(graph, dep, bundle_id, dep.priority);
}

fn add_dependency_bundle_edge_labeled(
    graph: &mut crate::plan::DependencyBundleGraph,
    dep: &Dependency,
    bundle_id: crate::plan::BundleId,
    priority: Priority,
) {
    let dep_node = graph.add_node_by_content_key(DependencyBundleKey::Dependency(dep.id.clone()), || {
        DependencyBundleNode::Dependency(dep.id.clone())
    });
    let bundle_node = graph.add_node_by_content_key(DependencyBundleKey::Bundle(bundle_id), || {
        DependencyBundleNode::Bundle(bundle_id)
    });
    graph.add_edge(dep_node, bundle_node, priority);
}
