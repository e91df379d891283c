//! Exploration engine for reach: sessions, processes, and the operations that
//! grow and prune a proof graph.
//!
//! A [`Session`] owns its graph, oracle handle, and process table. There is no
//! ambient "current session"; every call goes through the handle.

mod config;
mod explore;
mod process;
mod session;

// Re-export from crates for public API
pub use reach_graph::{
    self, Graph, GraphSnapshot, InvariantViolation, ProofStatus, ProofSummary, Removal,
};
pub use reach_oracle::{self, FakeOracle, FakeRule, Oracle, OracleError, RpcOracle};
pub use reach_types::{
    self, CellPath, Edge, EdgeId, EdgeKind, Missing, Node, NodeId, NodeState, ProcessId,
    ReachError, State, Substitution, Term, tags,
};

pub use config::{
    CONFIG_ENV, ConfigError, ExploreConfig, OracleConfig, ProcessConfig, ReachConfig,
    SessionSettings, config_path, expand_env_vars,
};
pub use explore::{
    BuildOutcome, CancelToken, CaseSplitOutcome, EdgeVerdict, Explorer, RewindOutcome,
    SectionOutcome, StepHalt, StepOutcome, Verdict,
};
pub use process::{
    Process, ProcessEdge, ProcessKind, ProcessResult, ProcessStatus, ProcessTracker, settled,
    transition_edge,
};
pub use session::{Mutation, Session, rpc_oracle};
