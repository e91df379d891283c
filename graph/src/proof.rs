//! Proof status derived from the shape of the graph.

use std::fmt;

use reach_types::{NodeId, tags};
use serde::{Deserialize, Serialize};

use crate::Graph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProofStatus {
    /// No open node and no failing leaf.
    Passed,
    /// Some terminal node cannot reach the target.
    Failed,
    /// Nothing failed yet, but fresh nodes remain.
    Pending,
}

impl ProofStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Pending => "PENDING",
        }
    }
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofSummary {
    pub status: ProofStatus,
    pub nodes: usize,
    pub edges: usize,
    /// Fresh nodes, excluding the target and vacuous cases.
    pub pending: Vec<NodeId>,
    /// Terminal nodes that are feasible and do not reach the target.
    pub failing: Vec<NodeId>,
    pub vacuous: Vec<NodeId>,
    pub target_reached: bool,
}

impl Graph {
    #[must_use]
    pub fn proof_summary(&self) -> ProofSummary {
        let target = self.target;
        let vacuous: Vec<NodeId> = self.nodes(Some(tags::VACUOUS)).iter().map(|n| n.id).collect();
        let open = |id: &NodeId| Some(*id) != target && !vacuous.contains(id);

        let pending: Vec<NodeId> = self.frontier().into_iter().filter(open).collect();
        let failing: Vec<NodeId> = self
            .stuck()
            .into_iter()
            .filter(open)
            .filter(|id| target.is_none_or(|t| !self.reaches(*id, t)))
            .collect();

        let status = if !failing.is_empty() {
            ProofStatus::Failed
        } else if !pending.is_empty() {
            ProofStatus::Pending
        } else {
            ProofStatus::Passed
        };
        let target_reached = target.is_some_and(|t| !self.incoming(t).is_empty());

        ProofSummary {
            status,
            nodes: self.node_count(),
            edges: self.edge_count(),
            pending,
            failing,
            vacuous,
            target_reached,
        }
    }
}
