use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{EdgeId, NodeId, NodeState, ProcessId};

/// What a lookup failed to find.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Missing {
    Node(NodeId),
    Edge(EdgeId),
    Alias(String),
    Process(ProcessId),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => write!(f, "node {id}"),
            Self::Edge(id) => write!(f, "edge {id}"),
            Self::Alias(name) => write!(f, "alias `{name}`"),
            Self::Process(id) => write!(f, "process {id}"),
        }
    }
}

/// Every failure a session operation can report.
///
/// Local errors (`NotFound`, `InvalidPath`, `NodeClosed`, `AliasExists`,
/// `CycleRejected`, `InvalidArgument`) are raised before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReachError {
    #[error("{0} not found")]
    NotFound(Missing),

    #[error("invalid cell path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("node {node} is {state} and cannot be modified")]
    NodeClosed { node: NodeId, state: NodeState },

    #[error("alias `{name}` is already bound to node {node}")]
    AliasExists { name: String, node: NodeId },

    #[error("edge {from} -> {to} would create a cycle")]
    CycleRejected { from: NodeId, to: NodeId },

    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("target not reached within {depth} steps (frontier at node {frontier})")]
    Exhausted { depth: u32, frontier: NodeId },

    #[error("no rule applies at node {node}")]
    Stuck { node: NodeId },

    #[error("execution branches at node {node}")]
    Branched { node: NodeId },

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl ReachError {
    #[must_use]
    pub fn node_not_found(id: NodeId) -> Self {
        Self::NotFound(Missing::Node(id))
    }

    #[must_use]
    pub fn edge_not_found(id: EdgeId) -> Self {
        Self::NotFound(Missing::Edge(id))
    }

    /// Errors raised before the graph was touched.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::InvalidPath { .. }
                | Self::NodeClosed { .. }
                | Self::AliasExists { .. }
                | Self::CycleRejected { .. }
                | Self::InvalidArgument(_)
        )
    }
}
