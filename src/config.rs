//! §6 config schema and §10.2 resolution. Config *file* I/O and schema
//! validation against arbitrary JSON/TOML remain a host concern (§1
//! Non-goals); this module only resolves an already-parsed raw struct into
//! the concrete integers the planner consults.

use serde::{Deserialize, Serialize};

/// The two HTTP versions the distilled defaults are keyed on (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpVersion {
    Http1,
    Http2,
}

/// §6 config schema, as a host would deserialize it from a config file
/// before handing it to [`PlannerConfig::resolve`]. Every field is optional;
/// absent fields fall back to the `http`-version default.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RawPlannerConfig {
    pub http: Option<HttpVersion>,
    pub min_bundles: Option<u32>,
    pub min_bundle_size: Option<u64>,
    pub max_parallel_requests: Option<u32>,
}

/// The resolved config struct the planner actually consumes (§6: "config: a
/// resolved struct with integer fields ..."). Construct it either from a
/// [`RawPlannerConfig`] via [`PlannerConfig::resolve`], or directly when the
/// host already has concrete integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Parsed but never consulted by the planner (§9 Open Questions:
    /// "`minBundles` in config is parsed but never consulted in the
    /// planner. Treat as a reserved future field."). Kept on the struct so
    /// a host round-tripping a config file doesn't lose the field.
    pub min_bundles: u32,
    pub min_bundle_size: u64,
    pub max_parallel_requests: u32,
}

impl PlannerConfig {
    /// §6 defaults: `http=2 → {1, 20000, 25}`; `http=1 → {1, 30000, 6}`.
    pub fn from_http_version(http: HttpVersion) -> Self {
        match http {
            HttpVersion::Http2 => PlannerConfig {
                min_bundles: 1,
                min_bundle_size: 20_000,
                max_parallel_requests: 25,
            },
            HttpVersion::Http1 => PlannerConfig {
                min_bundles: 1,
                min_bundle_size: 30_000,
                max_parallel_requests: 6,
            },
        }
    }

    /// Applies the `http`-version defaults and then lets individual
    /// overrides in `raw` win, exactly as specified in §6.
    pub fn resolve(raw: RawPlannerConfig) -> Self {
        let defaults = Self::from_http_version(raw.http.unwrap_or(HttpVersion::Http2));
        PlannerConfig {
            min_bundles: raw.min_bundles.unwrap_or(defaults.min_bundles),
            min_bundle_size: raw.min_bundle_size.unwrap_or(defaults.min_bundle_size),
            max_parallel_requests: raw
                .max_parallel_requests
                .unwrap_or(defaults.max_parallel_requests),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::from_http_version(HttpVersion::Http2)
    }
}
