//! Self-contained graph snapshots.
//!
//! A snapshot keeps ids and counters, so restoring it yields a graph whose
//! future allocations continue where the original left off.

use std::collections::{BTreeMap, BTreeSet};

use reach_types::{Edge, EdgeId, Node, NodeId, ReachError};
use serde::{Deserialize, Serialize};

use crate::Graph;
use crate::aliases::AliasRegistry;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub version: u32,
    pub init: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NodeId>,
    pub next_node: u64,
    pub next_edge: u64,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub aliases: BTreeMap<String, NodeId>,
}

impl GraphSnapshot {
    pub fn to_json(&self) -> Result<String, ReachError> {
        serde_json::to_string_pretty(self).map_err(|e| ReachError::InvalidSnapshot(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, ReachError> {
        serde_json::from_str(text).map_err(|e| ReachError::InvalidSnapshot(e.to_string()))
    }
}

impl Graph {
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            version: SNAPSHOT_VERSION,
            init: self.init,
            target: self.target,
            next_node: self.next_node,
            next_edge: self.next_edge,
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
            aliases: self
                .aliases
                .iter()
                .map(|(name, id)| (name.to_string(), id))
                .collect(),
        }
    }

    /// Rebuild a graph, rejecting any snapshot that violates a graph invariant.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self, ReachError> {
        let invalid = ReachError::InvalidSnapshot;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(invalid(format!(
                "unsupported version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }

        let mut nodes = BTreeMap::new();
        for node in snapshot.nodes {
            let id = node.id;
            if nodes.insert(id, node).is_some() {
                return Err(invalid(format!("duplicate node id {id}")));
            }
        }

        let mut edges = BTreeMap::new();
        let mut outgoing: BTreeMap<NodeId, BTreeSet<EdgeId>> = BTreeMap::new();
        let mut incoming: BTreeMap<NodeId, BTreeSet<EdgeId>> = BTreeMap::new();
        for edge in snapshot.edges {
            let id = edge.id;
            outgoing.entry(edge.source).or_default().insert(id);
            incoming.entry(edge.target).or_default().insert(id);
            if edges.insert(id, edge).is_some() {
                return Err(invalid(format!("duplicate edge id {id}")));
            }
        }

        let mut aliases = AliasRegistry::default();
        for (name, node) in snapshot.aliases {
            aliases.bind(&name, node)?;
        }

        let next_node = nodes
            .keys()
            .next_back()
            .map_or(0, |id: &NodeId| id.value() + 1)
            .max(snapshot.next_node);
        let next_edge = edges
            .keys()
            .next_back()
            .map_or(0, |id: &EdgeId| id.value() + 1)
            .max(snapshot.next_edge);

        let graph = Self {
            nodes,
            edges,
            outgoing,
            incoming,
            init: snapshot.init,
            target: snapshot.target,
            aliases,
            next_node,
            next_edge,
        };
        graph
            .check_invariants()
            .map_err(|violation| invalid(violation.to_string()))?;
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Restored graph from snapshot"
        );
        Ok(graph)
    }
}
