//! The proof-graph store.
//!
//! # Invariants
//!
//! - Node and edge ids are allocated from monotone counters and never reused.
//! - Every edge references existing endpoints.
//! - Every node other than `init` (and the detached target) is reachable from
//!   `init` over non-cover edges.
//! - The non-cover subgraph is acyclic.
//! - Every alias names a live node.
//!
//! Mutating methods validate before touching any map, so a returned error
//! always leaves the graph unchanged.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use reach_types::{
    Edge, EdgeId, EdgeKind, EdgeSpec, Missing, Node, NodeId, NodeState, ReachError, State,
    Substitution, Term, tags,
};
use serde::Serialize;
use thiserror::Error;

use crate::aliases::AliasRegistry;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("graph invariant violated: {0}")]
pub struct InvariantViolation(pub String);

/// Ids deleted by a removal, each list ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Removal {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
    pub aliases: Vec<String>,
}

impl Removal {
    fn finish(mut self) -> Self {
        self.nodes.sort_unstable();
        self.nodes.dedup();
        self.edges.sort_unstable();
        self.edges.dedup();
        self.aliases.sort();
        self
    }
}

#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    pub(crate) edges: BTreeMap<EdgeId, Edge>,
    pub(crate) outgoing: BTreeMap<NodeId, BTreeSet<EdgeId>>,
    pub(crate) incoming: BTreeMap<NodeId, BTreeSet<EdgeId>>,
    pub(crate) init: NodeId,
    pub(crate) target: Option<NodeId>,
    pub(crate) aliases: AliasRegistry,
    pub(crate) next_node: u64,
    pub(crate) next_edge: u64,
}

impl Graph {
    /// A graph holding only the init node (id 0).
    #[must_use]
    pub fn new(init: State) -> Self {
        let mut graph = Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            outgoing: BTreeMap::new(),
            incoming: BTreeMap::new(),
            init: NodeId::new(0),
            target: None,
            aliases: AliasRegistry::default(),
            next_node: 0,
            next_edge: 0,
        };
        graph.init = graph.create_node(init);
        graph
    }

    #[must_use]
    pub fn init(&self) -> NodeId {
        self.init
    }

    #[must_use]
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// Create the detached target node. Only one target may exist.
    pub fn set_target(&mut self, state: State) -> Result<NodeId, ReachError> {
        if let Some(existing) = self.target {
            return Err(ReachError::InvalidArgument(format!(
                "target already set to node {existing}"
            )));
        }
        let id = self.create_node(state);
        self.target = Some(id);
        Ok(id)
    }

    /// Allocate a node with no edges.
    ///
    /// The caller must attach it with [`Graph::add_edge`] inside the same
    /// write; [`Graph::add_successor`] does both.
    pub fn create_node(&mut self, state: State) -> NodeId {
        let id = NodeId::new(self.next_node);
        self.next_node = self.next_node.saturating_add(1);
        self.nodes.insert(
            id,
            Node {
                id,
                term: state.term,
                constraint: state.constraint,
                tags: BTreeSet::new(),
            },
        );
        id
    }

    pub fn add_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        spec: EdgeSpec,
    ) -> Result<EdgeId, ReachError> {
        self.node(source)?;
        self.node(target)?;
        if spec.kind != EdgeKind::Cover && (source == target || self.reaches(target, source)) {
            return Err(ReachError::CycleRejected {
                from: source,
                to: target,
            });
        }
        Ok(self.insert_edge(source, target, spec))
    }

    /// Create a node and the edge leading to it from `source`.
    pub fn add_successor(
        &mut self,
        source: NodeId,
        state: State,
        spec: EdgeSpec,
    ) -> Result<(NodeId, EdgeId), ReachError> {
        self.node(source)?;
        let node = self.create_node(state);
        let edge = self.insert_edge(source, node, spec);
        Ok((node, edge))
    }

    fn insert_edge(&mut self, source: NodeId, target: NodeId, spec: EdgeSpec) -> EdgeId {
        let id = EdgeId::new(self.next_edge);
        self.next_edge = self.next_edge.saturating_add(1);
        self.edges.insert(
            id,
            Edge {
                id,
                source,
                target,
                kind: spec.kind,
                condition: spec.condition,
                substitution: spec.substitution,
                depth: spec.depth,
                tags: spec.tags,
            },
        );
        self.outgoing.entry(source).or_default().insert(id);
        self.incoming.entry(target).or_default().insert(id);
        id
    }

    /// Whether `to` is reachable from `from` over non-cover edges.
    #[must_use]
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            stack.extend(self.non_cover_successors(id));
        }
        false
    }

    fn non_cover_successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.outgoing
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|eid| self.edges.get(eid))
            .filter(|e| e.kind != EdgeKind::Cover)
            .map(|e| e.target)
    }

    /// Remove `id` and every node that loses its last path from `init`.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Removal, ReachError> {
        self.node(id)?;
        if id == self.init {
            return Err(ReachError::InvalidArgument(
                "the init node cannot be removed".into(),
            ));
        }
        let mut removal = Removal::default();
        self.drop_node(id, &mut removal);
        self.prune_unreachable(&mut removal);
        tracing::debug!(
            node = %id,
            nodes = removal.nodes.len(),
            edges = removal.edges.len(),
            "Removed node"
        );
        Ok(removal.finish())
    }

    /// Remove all outgoing edges of `id`, then prune what became unreachable.
    pub fn detach_successors(&mut self, id: NodeId) -> Result<Removal, ReachError> {
        self.node(id)?;
        let mut removal = Removal::default();
        let out: Vec<EdgeId> = self
            .outgoing
            .get(&id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        for eid in out {
            self.drop_edge(eid, &mut removal);
        }
        self.prune_unreachable(&mut removal);
        Ok(removal.finish())
    }

    /// Remove the listed edges, then prune what became unreachable. Ids that
    /// are already gone are skipped.
    pub fn remove_edges(&mut self, ids: &[EdgeId]) -> Removal {
        let mut removal = Removal::default();
        for eid in ids {
            self.drop_edge(*eid, &mut removal);
        }
        self.prune_unreachable(&mut removal);
        removal.finish()
    }

    /// Replace step edge `id` with a chain `source -> s1 -> .. -> sN -> target`
    /// through fresh nodes holding `sections`, each paired with the depth of
    /// the edge leading into it. The closing edge gets `tail_depth` and keeps
    /// the original substitution; every segment keeps the original tags.
    pub fn section_edge(
        &mut self,
        id: EdgeId,
        sections: Vec<(State, u32)>,
        tail_depth: u32,
    ) -> Result<(Vec<NodeId>, Vec<EdgeId>), ReachError> {
        let edge = self.edge(id)?.clone();
        if edge.kind != EdgeKind::Step {
            return Err(ReachError::InvalidArgument(format!(
                "edge {id} is a {} edge; only step edges can be sectioned",
                edge.kind
            )));
        }
        if sections.is_empty() {
            return Err(ReachError::InvalidArgument(format!(
                "sectioning edge {id} needs at least one intermediate state"
            )));
        }

        let mut scratch = Removal::default();
        self.drop_edge(id, &mut scratch);

        let segment = |depth: u32| EdgeSpec {
            kind: EdgeKind::Step,
            condition: Term::top(),
            substitution: Substitution::new(),
            depth,
            tags: edge.tags.clone(),
        };
        let mut nodes = Vec::with_capacity(sections.len());
        let mut edges = Vec::with_capacity(sections.len() + 1);
        let mut previous = edge.source;
        for (state, depth) in sections {
            let node = self.create_node(state);
            edges.push(self.insert_edge(previous, node, segment(depth)));
            nodes.push(node);
            previous = node;
        }
        let closing = EdgeSpec {
            substitution: edge.substitution,
            condition: edge.condition,
            ..segment(tail_depth)
        };
        edges.push(self.insert_edge(previous, edge.target, closing));
        tracing::debug!(edge = %id, sections = nodes.len(), "Sectioned edge");
        Ok((nodes, edges))
    }

    fn drop_edge(&mut self, eid: EdgeId, removal: &mut Removal) {
        if let Some(edge) = self.edges.remove(&eid) {
            if let Some(out) = self.outgoing.get_mut(&edge.source) {
                out.remove(&eid);
            }
            if let Some(inc) = self.incoming.get_mut(&edge.target) {
                inc.remove(&eid);
            }
            removal.edges.push(eid);
        }
    }

    fn drop_node(&mut self, id: NodeId, removal: &mut Removal) {
        let touching: Vec<EdgeId> = self
            .outgoing
            .get(&id)
            .into_iter()
            .chain(self.incoming.get(&id))
            .flatten()
            .copied()
            .collect();
        for eid in touching {
            self.drop_edge(eid, removal);
        }
        self.outgoing.remove(&id);
        self.incoming.remove(&id);
        if self.nodes.remove(&id).is_some() {
            removal.nodes.push(id);
        }
        if self.target == Some(id) {
            self.target = None;
        }
        removal.aliases.extend(self.aliases.release_node(id));
    }

    fn reachable_from_init(&self) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([self.init]);
        while let Some(id) = queue.pop_front() {
            if seen.insert(id) {
                queue.extend(self.non_cover_successors(id));
            }
        }
        seen
    }

    fn prune_unreachable(&mut self, removal: &mut Removal) {
        let live = self.reachable_from_init();
        let dead: Vec<NodeId> = self
            .nodes
            .keys()
            .copied()
            .filter(|id| !live.contains(id) && Some(*id) != self.target)
            .collect();
        for id in dead {
            self.drop_node(id, removal);
        }
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Result<&Node, ReachError> {
        self.nodes.get(&id).ok_or(ReachError::node_not_found(id))
    }

    pub fn edge(&self, id: EdgeId) -> Result<&Edge, ReachError> {
        self.edges.get(&id).ok_or(ReachError::edge_not_found(id))
    }

    #[must_use]
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Nodes in ascending id, optionally only those carrying `tag`.
    #[must_use]
    pub fn nodes(&self, tag: Option<&str>) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|n| tag.is_none_or(|t| n.has_tag(t)))
            .collect()
    }

    #[must_use]
    pub fn edges(&self, tag: Option<&str>) -> Vec<&Edge> {
        self.edges
            .values()
            .filter(|e| tag.is_none_or(|t| e.has_tag(t)))
            .collect()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if the tag was newly added.
    pub fn tag_node(&mut self, id: NodeId, tag: &str) -> Result<bool, ReachError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(ReachError::node_not_found(id))?;
        Ok(node.tags.insert(tag.to_string()))
    }

    /// Returns `true` if the tag was present.
    pub fn untag_node(&mut self, id: NodeId, tag: &str) -> Result<bool, ReachError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(ReachError::node_not_found(id))?;
        Ok(node.tags.remove(tag))
    }

    pub fn tag_edge(&mut self, id: EdgeId, tag: &str) -> Result<bool, ReachError> {
        let edge = self
            .edges
            .get_mut(&id)
            .ok_or(ReachError::edge_not_found(id))?;
        Ok(edge.tags.insert(tag.to_string()))
    }

    /// Swap a node's term in place, keeping id, constraint, and tags.
    pub fn replace_term(&mut self, id: NodeId, term: Term) -> Result<&Node, ReachError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(ReachError::node_not_found(id))?;
        node.term = term;
        Ok(node)
    }

    // ------------------------------------------------------------------------
    // Topology
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn outgoing(&self, id: NodeId) -> Vec<&Edge> {
        self.edges_in(self.outgoing.get(&id))
    }

    #[must_use]
    pub fn incoming(&self, id: NodeId) -> Vec<&Edge> {
        self.edges_in(self.incoming.get(&id))
    }

    fn edges_in(&self, ids: Option<&BTreeSet<EdgeId>>) -> Vec<&Edge> {
        ids.into_iter()
            .flatten()
            .filter_map(|eid| self.edges.get(eid))
            .collect()
    }

    #[must_use]
    pub fn successors(&self, id: NodeId) -> Vec<NodeId> {
        self.outgoing(id).into_iter().map(|e| e.target).collect()
    }

    #[must_use]
    pub fn predecessors(&self, id: NodeId) -> Vec<NodeId> {
        self.incoming(id).into_iter().map(|e| e.source).collect()
    }

    /// The smallest-id inbound non-cover edge.
    #[must_use]
    pub fn tree_parent(&self, id: NodeId) -> Option<&Edge> {
        self.incoming(id)
            .into_iter()
            .find(|e| e.kind != EdgeKind::Cover)
    }

    /// `id` followed by its tree-parent chain, ending at `init`.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        if !self.contains_node(id) {
            return chain;
        }
        let mut current = id;
        chain.push(current);
        while let Some(parent) = self.tree_parent(current) {
            current = parent.source;
            chain.push(current);
        }
        chain
    }

    pub fn node_state(&self, id: NodeId) -> Result<NodeState, ReachError> {
        let node = self.node(id)?;
        if self.target == Some(id) || node.has_tag(tags::TARGET) {
            return Ok(NodeState::Target);
        }
        let out = self.outgoing(id);
        if !out.is_empty() && out.iter().all(|e| e.kind == EdgeKind::Cover) {
            return Ok(NodeState::Covered);
        }
        if node.has_tag(tags::TERMINAL) {
            return Ok(NodeState::Terminal);
        }
        if out.is_empty() {
            Ok(NodeState::Fresh)
        } else {
            Ok(NodeState::Expanded)
        }
    }

    fn nodes_in_state(&self, wanted: NodeState) -> Vec<NodeId> {
        self.nodes
            .keys()
            .copied()
            .filter(|id| self.node_state(*id).is_ok_and(|s| s == wanted))
            .collect()
    }

    /// Nodes still open for exploration.
    #[must_use]
    pub fn frontier(&self) -> Vec<NodeId> {
        self.nodes_in_state(NodeState::Fresh)
    }

    #[must_use]
    pub fn stuck(&self) -> Vec<NodeId> {
        self.nodes_in_state(NodeState::Terminal)
    }

    #[must_use]
    pub fn covered(&self) -> Vec<NodeId> {
        self.nodes_in_state(NodeState::Covered)
    }

    /// Nodes with no outgoing edges, whatever their state.
    #[must_use]
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes
            .keys()
            .copied()
            .filter(|id| self.outgoing.get(id).is_none_or(BTreeSet::is_empty))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Aliases and references
    // ------------------------------------------------------------------------

    pub fn add_alias(&mut self, name: &str, node: NodeId) -> Result<(), ReachError> {
        self.node(node)?;
        self.aliases.bind(name, node)
    }

    pub fn remove_alias(&mut self, name: &str) -> Result<NodeId, ReachError> {
        self.aliases.unbind(name)
    }

    pub fn resolve(&self, name: &str) -> Result<NodeId, ReachError> {
        self.aliases.resolve(name)
    }

    #[must_use]
    pub fn aliases_of(&self, node: NodeId) -> Vec<&str> {
        self.aliases.names_for(node)
    }

    #[must_use]
    pub fn aliases(&self) -> &AliasRegistry {
        &self.aliases
    }

    /// Resolve `#init`, `#target`, `#frontier`, `@alias`, or a decimal id.
    pub fn resolve_ref(&self, text: &str) -> Result<NodeId, ReachError> {
        let text = text.trim();
        let missing = || ReachError::NotFound(Missing::Alias(text.to_string()));
        match text {
            "#init" => Ok(self.init),
            "#target" => self.target.ok_or_else(missing),
            "#frontier" => self.frontier().first().copied().ok_or_else(missing),
            _ => {
                if let Some(name) = text.strip_prefix('@') {
                    return self.resolve(name);
                }
                let id: NodeId = text.parse().map_err(|_| {
                    ReachError::InvalidArgument(format!("unrecognised node reference `{text}`"))
                })?;
                self.node(id).map(|n| n.id)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Invariants
    // ------------------------------------------------------------------------

    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let fail = |msg: String| Err(InvariantViolation(msg));

        if !self.nodes.contains_key(&self.init) {
            return fail(format!("init node {} missing", self.init));
        }
        if let Some(target) = self.target
            && !self.nodes.contains_key(&target)
        {
            return fail(format!("target node {target} missing"));
        }
        for (id, node) in &self.nodes {
            if node.id != *id || id.value() >= self.next_node {
                return fail(format!("node {id} has an inconsistent id"));
            }
        }
        for (eid, edge) in &self.edges {
            if edge.id != *eid || eid.value() >= self.next_edge {
                return fail(format!("edge {eid} has an inconsistent id"));
            }
            if !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target) {
                return fail(format!("edge {eid} has a dangling endpoint"));
            }
            let indexed = self
                .outgoing
                .get(&edge.source)
                .is_some_and(|s| s.contains(eid))
                && self
                    .incoming
                    .get(&edge.target)
                    .is_some_and(|s| s.contains(eid));
            if !indexed {
                return fail(format!("edge {eid} is missing from the adjacency index"));
            }
        }
        for (name, node) in self.aliases.iter() {
            if !self.nodes.contains_key(&node) {
                return fail(format!("alias `{name}` points at removed node {node}"));
            }
        }

        let live = self.reachable_from_init();
        for id in self.nodes.keys() {
            if Some(*id) != self.target && !live.contains(id) {
                return fail(format!("node {id} is unreachable from init"));
            }
        }

        // Kahn's algorithm over the non-cover subgraph.
        let mut indegree: BTreeMap<NodeId, usize> = self.nodes.keys().map(|id| (*id, 0)).collect();
        for edge in self.edges.values().filter(|e| e.kind != EdgeKind::Cover) {
            *indegree.entry(edge.target).or_default() += 1;
        }
        let mut ready: Vec<NodeId> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut visited = 0usize;
        while let Some(id) = ready.pop() {
            visited += 1;
            for next in self.non_cover_successors(id) {
                if let Some(d) = indegree.get_mut(&next) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(next);
                    }
                }
            }
        }
        if visited != self.nodes.len() {
            return fail("non-cover edges form a cycle".into());
        }
        Ok(())
    }
}
