//! Graph primitives (§4.1): the two small graph abstractions every phase is
//! built on. Neither type knows anything about assets, bundles or the
//! planning algorithm — they're generic storage, matching the "graph
//! primitives" layer described as 10% of the implementation.

mod content_addressed;
mod directed;

pub use content_addressed::ContentAddressedGraph;
pub use directed::{DirectedGraph, NodeId};
