//! §7 Error handling design: planning either completes or aborts with a
//! diagnostic naming the violated invariant. There is no partial, recovered,
//! or retried plan.

use thiserror::Error;

use crate::model::{AssetId, DependencyId};

/// Which of the six phases (§2) raised a [`PlanError`], for host-side
/// logging correlation (§10.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    EntryDiscovery,
    Reachability,
    AncestorAvailability,
    Placement,
    Merge,
    Export,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::EntryDiscovery => "phase1_entry_discovery",
            Phase::Reachability => "phase2_reachability",
            Phase::AncestorAvailability => "phase3_ancestor_availability",
            Phase::Placement => "phase4_placement",
            Phase::Merge => "phase5_merge",
            Phase::Export => "phase6_export",
        };
        f.write_str(name)
    }
}

/// §7 error taxonomy. Planning never produces a recoverable error; every
/// variant here is fatal and aborts the run.
#[derive(Debug, Error)]
pub enum PlanError {
    /// An internal inconsistency: the input graph violated an assumption
    /// the planner depends on (e.g. a dependency that doesn't resolve to
    /// exactly one asset, or a bundle root missing from `bundleRoots`).
    #[error("invariant violated in {phase}: {detail}")]
    InvariantViolation { phase: Phase, detail: String },

    /// Surfaced only when a host uses the optional `serde`-based config
    /// front-end of §6/§10.2 directly; ordinary planning never produces
    /// this because the host's own schema validator runs first.
    #[error("invalid planner config: {detail}")]
    ConfigInvalid { detail: String },
}

impl PlanError {
    pub(crate) fn dependency_not_resolved(phase: Phase, dependency: &DependencyId) -> Self {
        PlanError::InvariantViolation {
            phase,
            detail: format!(
                "dependency {dependency} did not resolve to exactly one asset"
            ),
        }
    }

    pub(crate) fn missing_asset(phase: Phase, asset: &AssetId) -> Self {
        PlanError::InvariantViolation {
            phase,
            detail: format!("asset {asset} referenced but not present in the input graph"),
        }
    }

    pub(crate) fn missing_bundle_root(phase: Phase, asset: &AssetId) -> Self {
        PlanError::InvariantViolation {
            phase,
            detail: format!("asset {asset} expected to be a bundle root but has none recorded"),
        }
    }
}

pub type PlanResult<T> = Result<T, PlanError>;
