//! Proof-graph storage for reach.
//!
//! One [`Graph`] holds a session's nodes, edges, and aliases. All methods are
//! synchronous in-memory work; callers provide the locking.

mod aliases;
mod paths;
mod proof;
mod render;
mod snapshot;
mod store;

pub use aliases::AliasRegistry;
pub use proof::{ProofStatus, ProofSummary};
pub use render::{diff_states, edge_summary};
pub use snapshot::{GraphSnapshot, SNAPSHOT_VERSION};
pub use store::{Graph, InvariantViolation, Removal};
