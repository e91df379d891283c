//! Core domain types for reach.
//!
//! This crate contains pure proof-graph data with no IO and no async: terms and
//! constraints, node and edge records, identifiers, and the error taxonomy
//! shared by every layer above it.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod error;
mod ids;
mod term;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use error::{Missing, ReachError};
pub use ids::{EdgeId, IdParseError, NodeId, ProcessId};
pub use term::{AND, BOTTOM, CellPath, CellSegment, NOT, State, Substitution, TOP, Term};

/// Tags with engine-level meaning. Any other string is a user tag.
pub mod tags {
    pub const BRANCH: &str = "branch";
    pub const TERMINAL: &str = "terminal";
    pub const TARGET: &str = "target";
    pub const VACUOUS: &str = "vacuous";
    pub const BUILT: &str = "built";
    /// Prefix for the rule tag that stopped execution, e.g. `halt:loop-head`.
    pub const HALT_PREFIX: &str = "halt:";
}

// ============================================================================
// Nodes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub term: Term,
    pub constraint: Term,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Node {
    #[must_use]
    pub fn state(&self) -> State {
        State::new(self.term.clone(), self.constraint.clone())
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Exploration status of a node, derived from its tags and outgoing edges.
///
/// Only `Fresh` nodes accept `step`, `caseSplit`, or `updateCell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Fresh,
    Expanded,
    Terminal,
    Target,
    Covered,
}

impl NodeState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Expanded => "expanded",
            Self::Terminal => "terminal",
            Self::Target => "target",
            Self::Covered => "covered",
        }
    }

    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Fresh)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Edges
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Step,
    Branch,
    /// Source state is subsumed by the target; the only kind allowed to close a cycle.
    Cover,
}

impl EdgeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Branch => "branch",
            Self::Cover => "cover",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    pub condition: Term,
    #[serde(default)]
    pub substitution: Substitution,
    /// Rewrite steps elided by this edge.
    pub depth: u32,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Edge {
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Everything needed to create an edge except its id and source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeSpec {
    pub kind: EdgeKind,
    pub condition: Term,
    pub substitution: Substitution,
    pub depth: u32,
    pub tags: BTreeSet<String>,
}

impl EdgeSpec {
    #[must_use]
    pub fn step(depth: u32) -> Self {
        Self {
            kind: EdgeKind::Step,
            condition: Term::top(),
            substitution: Substitution::new(),
            depth,
            tags: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn branch(condition: Term, depth: u32) -> Self {
        Self {
            kind: EdgeKind::Branch,
            condition,
            substitution: Substitution::new(),
            depth,
            tags: BTreeSet::from([tags::BRANCH.to_string()]),
        }
    }

    #[must_use]
    pub fn cover(substitution: Substitution, depth: u32) -> Self {
        Self {
            kind: EdgeKind::Cover,
            condition: Term::top(),
            substitution,
            depth,
            tags: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn tagged(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_string());
        self
    }
}
