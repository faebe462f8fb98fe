//! The data model consumed by the planner (§3): `Asset` and `Dependency` are
//! owned by the host's upstream asset-graph builder (out of scope, §1) and
//! are treated as immutable for the duration of a planning run. Everything
//! else in this module (`Bundle`, `BundleRoot`, ...) is planner-owned.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Stable identity for an [`Asset`]. Equality and hashing are by the wrapped
/// string, never by pointer — two `AssetId`s built from the same string
/// always compare equal, matching the "Identity semantics" design note.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub Arc<str>);

impl AssetId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Stable identity for a [`Dependency`]. See [`AssetId`] for identity
/// semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyId(pub Arc<str>);

impl DependencyId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DependencyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DependencyId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DependencyId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The asset "type" (§3): a language/MIME family such as `"js"`, `"css"` or
/// `"html"`. Kept as an opaque interned-ish string rather than a closed enum
/// because the upstream asset-graph builder (out of scope) is free to invent
/// new ones (wasm, json, svg, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetType(pub Arc<str>);

impl AssetType {
    pub fn new(t: impl Into<Arc<str>>) -> Self {
        Self(t.into())
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The execution context an [`Environment`] targets. Two assets are only
/// ever bundled together if their contexts are compatible (§3 invariants:
/// "No bundle mixes assets of ... incompatible `env.context`").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnvContext {
    Browser,
    WebWorker,
    ServiceWorker,
    Node,
    ElectronMain,
    ElectronRenderer,
}

/// Carries the execution context plus the isolation predicate (§3: "`env`
/// (carries `context` and `isIsolated` predicate)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Environment {
    pub context: EnvContext,
    pub is_isolated: bool,
}

impl Environment {
    pub fn new(context: EnvContext) -> Self {
        Self {
            context,
            is_isolated: false,
        }
    }

    pub fn isolated(context: EnvContext) -> Self {
        Self {
            context,
            is_isolated: true,
        }
    }

    /// Two environments are compatible bundle-mates when their contexts
    /// match and neither is isolated (an isolated environment is its own
    /// boundary, §4.2 async-split ancestor walk).
    pub fn is_compatible_with(&self, other: &Environment) -> bool {
        self.context == other.context && !self.is_isolated && !other.is_isolated
    }
}

/// §3: `bundleBehavior ∈ {normal, inline, isolated}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BundleBehavior {
    Normal,
    Inline,
    Isolated,
}

impl BundleBehavior {
    pub fn is_inline(&self) -> bool {
        matches!(self, BundleBehavior::Inline)
    }

    pub fn is_isolated(&self) -> bool {
        matches!(self, BundleBehavior::Isolated)
    }
}

/// §3: `Dependency.priority ∈ {sync, parallel, lazy}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Sync,
    Parallel,
    Lazy,
}

impl Priority {
    pub fn is_lazy(&self) -> bool {
        matches!(self, Priority::Lazy)
    }
}

/// Opaque deployment target identity (e.g. `"browser"`, `"node"`). The
/// planner never inspects a target beyond copying and comparing it; the
/// downstream bundle-writer (out of scope, §1) interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target(pub Arc<str>);

impl Target {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }
}

/// An asset's aggregate stats. Only `size` is consumed by the planner (§3),
/// but real builds carry more; this leaves room without widening every call
/// site that only cares about size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssetStats {
    pub size: u64,
}

/// §3 Asset (external): immutable within a planning run.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub id: AssetId,
    pub asset_type: AssetType,
    pub env: Environment,
    pub bundle_behavior: BundleBehavior,
    pub stats: AssetStats,
    pub file_path: PathBuf,
}

/// §3 Dependency (external): immutable within a planning run.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub id: DependencyId,
    pub priority: Priority,
    pub is_entry: bool,
    pub target: Option<Target>,
    pub bundle_behavior: Option<BundleBehavior>,
    pub needs_stable_name: bool,
}

/// §6: the read-only view of the upstream asset/dependency graph the
/// planner consumes. A host adapts its own asset graph to this trait; the
/// planner never mutates it.
///
/// The distilled interface named a callback-based `traverse(visitor)`
/// operation; this crate instead exposes the primitive accessors a visitor
/// would need (`dependencies_of`, `resolve`, ...) and performs its own
/// depth-first traversal over them (§9 "Mutable shared state" — the
/// planner, not the host, owns traversal state). See `DESIGN.md`.
pub trait InputGraph {
    /// All assets known to the graph, in a stable (e.g. creation) order.
    /// Phase 4 iterates assets in phase-1 discovery order, not this order;
    /// this is only used to seed that discovery.
    fn assets(&self) -> Vec<AssetId>;

    fn get_asset(&self, id: &AssetId) -> Option<&Asset>;

    fn get_dependency(&self, id: &DependencyId) -> Option<&Dependency>;

    /// Outgoing dependencies of `asset`, in a stable order.
    fn dependencies_of(&self, asset: &AssetId) -> Vec<DependencyId>;

    /// The single asset a dependency resolves to, if any. A dependency that
    /// resolves to anything other than exactly one asset is an upstream
    /// bug (§7 `InvariantViolation`); this returns `None` in that case and
    /// the planner raises the violation.
    fn resolve(&self, dependency: &DependencyId) -> Option<AssetId>;

    /// Dependencies that point at `asset` (used to find entry dependencies
    /// and surface `assetReference` edges).
    fn incoming_dependencies(&self, asset: &AssetId) -> Vec<DependencyId>;
}
