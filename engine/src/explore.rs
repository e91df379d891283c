//! Exploration operations over a [`Graph`].
//!
//! Every operation asks the oracle first and commits afterwards, so an oracle
//! failure never leaves a partial result behind. `build_edges` commits each
//! one-step expansion as soon as it completes; when the oracle fails mid-way
//! it removes what it created before returning. A build that ends `Exhausted`,
//! `Stuck`, `Branched` or `Cancelled` keeps the nodes it explored.
//!
//! All oracle traffic goes through [`Explorer::ask`], which observes the
//! process cancel flag and applies the session timeout.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::AbortHandle;
use serde::{Deserialize, Serialize};

use reach_graph::Graph;
use reach_oracle::{Execution, HaltReason, Oracle, OracleFut};
use reach_types::{
    CellPath, EdgeId, EdgeKind, EdgeSpec, Node, NodeId, NodeState, ReachError, State,
    Substitution, Term, tags,
};

use crate::config::SessionSettings;

/// Cooperative cancellation flag for one process.
#[derive(Debug, Clone)]
pub struct CancelToken(AbortHandle);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        let (handle, _registration) = AbortHandle::new_pair();
        Self(handle)
    }

    pub fn cancel(&self) {
        self.0.abort();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.is_aborted()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a `step` stopped, without the branch payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepHalt {
    DepthReached,
    Branch { candidates: usize },
    Stuck,
    HaltTag(String),
}

impl From<&HaltReason> for StepHalt {
    fn from(reason: &HaltReason) -> Self {
        match reason {
            HaltReason::DepthReached => Self::DepthReached,
            HaltReason::Branch(candidates) => Self::Branch {
                candidates: candidates.len(),
            },
            HaltReason::Stuck => Self::Stuck,
            HaltReason::HaltTagHit(tag) => Self::HaltTag(tag.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub new_nodes: Vec<NodeId>,
    pub new_edges: Vec<EdgeId>,
    pub steps: u32,
    pub halt: StepHalt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewindOutcome {
    /// The ancestor that is now a leaf.
    pub node: NodeId,
    pub removed_nodes: Vec<NodeId>,
    pub removed_edges: Vec<EdgeId>,
    pub removed_aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSplitOutcome {
    pub positive: NodeId,
    pub negative: NodeId,
    pub positive_edge: EdgeId,
    pub negative_edge: EdgeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutcome {
    /// The summarizing `source -> target` edge.
    pub edge: EdgeId,
    pub depth: u32,
    /// Node whose state implied the target.
    pub frontier: NodeId,
    pub new_nodes: Vec<NodeId>,
    pub new_edges: Vec<EdgeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeVerdict {
    pub edge: EdgeId,
    #[serde(flatten)]
    pub verdict: Verdict,
}

impl EdgeVerdict {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionOutcome {
    /// Intermediate nodes, in execution order.
    pub nodes: Vec<NodeId>,
    /// The chain replacing the sectioned edge, closing edge last.
    pub edges: Vec<EdgeId>,
}

/// A state to be committed, or the existing node that already subsumes it.
enum Placement {
    Fresh(State),
    Covered {
        by: NodeId,
        substitution: Substitution,
    },
}

/// One `build_edges` call and the ids it has created so far.
struct BuildRun {
    source: NodeId,
    target: NodeId,
    goal: State,
    max_depth: u32,
    new_nodes: Vec<NodeId>,
    new_edges: Vec<EdgeId>,
}

pub struct Explorer {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
    default_step_depth: u32,
    build_max_depth: u32,
    halt_tags: Vec<String>,
}

impl Explorer {
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>, settings: &SessionSettings) -> Self {
        Self {
            oracle,
            timeout: settings.oracle_timeout,
            default_step_depth: settings.default_step_depth,
            build_max_depth: settings.build_max_depth,
            halt_tags: settings.halt_tags.clone(),
        }
    }

    async fn ask<T>(
        &self,
        cancel: &CancelToken,
        call: &'static str,
        fut: OracleFut<'_, T>,
    ) -> Result<T, ReachError> {
        if cancel.is_cancelled() {
            tracing::debug!(call, "Cancellation observed before oracle call");
            return Err(ReachError::Cancelled);
        }
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(oracle = self.oracle.name(), call, error = %e, "Oracle call failed");
                Err(ReachError::OracleUnavailable(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(
                    oracle = self.oracle.name(),
                    call,
                    timeout_ms = self.timeout.as_millis(),
                    "Oracle call timed out"
                );
                Err(ReachError::OracleUnavailable(format!(
                    "{call} timed out after {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }

    async fn execute(
        &self,
        cancel: &CancelToken,
        state: &State,
        depth: u32,
        halt_tags: &[String],
    ) -> Result<Execution, ReachError> {
        self.ask(
            cancel,
            "execute",
            self.oracle.execute_steps(state, depth, halt_tags),
        )
        .await
    }

    async fn implies(
        &self,
        cancel: &CancelToken,
        antecedent: &State,
        consequent: &State,
    ) -> Result<Option<Substitution>, ReachError> {
        self.ask(
            cancel,
            "implies",
            self.oracle.implies(antecedent, consequent),
        )
        .await
    }

    /// Look for an existing node that subsumes `state`, in candidate order.
    async fn place(
        &self,
        cancel: &CancelToken,
        candidates: &[(NodeId, State)],
        state: State,
    ) -> Result<Placement, ReachError> {
        for (candidate, existing) in candidates {
            if let Some(substitution) = self.implies(cancel, &state, existing).await? {
                return Ok(Placement::Covered {
                    by: *candidate,
                    substitution,
                });
            }
        }
        Ok(Placement::Fresh(state))
    }

    /// Run the semantics forward from a fresh node.
    pub async fn step(
        &self,
        graph: &mut Graph,
        node: NodeId,
        branch: bool,
        depth: Option<u32>,
        cancel: &CancelToken,
    ) -> Result<StepOutcome, ReachError> {
        let depth = depth.unwrap_or(self.default_step_depth);
        if depth == 0 {
            return Err(ReachError::InvalidArgument(
                "step depth must be at least 1".into(),
            ));
        }
        require_fresh(graph, node)?;
        let start = graph.node(node)?.state();
        let candidates = subsumption_candidates(graph, node);

        tracing::info!(node = %node, depth, branch, "Taking steps");
        let exec = self.execute(cancel, &start, depth, &self.halt_tags).await?;
        let taken = exec.depth();
        let mut outcome = StepOutcome {
            new_nodes: Vec::new(),
            new_edges: Vec::new(),
            steps: taken,
            halt: StepHalt::from(&exec.halt),
        };

        let Execution { mut steps, halt: reason } = exec;
        match reason {
            HaltReason::Branch(branches) if branch && !branches.is_empty() => {
                let pre = match steps.pop() {
                    Some(last) => Some(self.place(cancel, &candidates, last).await?),
                    None => None,
                };
                let parent_constraint = match &pre {
                    Some(Placement::Fresh(state)) => state.constraint.clone(),
                    _ => start.constraint.clone(),
                };
                let mut children = Vec::with_capacity(branches.len());
                if !matches!(pre, Some(Placement::Covered { .. })) {
                    for candidate in branches {
                        let condition = new_conjuncts(&parent_constraint, &candidate.constraint);
                        children.push((condition, self.place(cancel, &candidates, candidate).await?));
                    }
                }

                let parent = match pre {
                    Some(placement) => {
                        match commit(graph, node, placement, EdgeSpec::step(taken), &mut outcome)? {
                            Some(pre_node) => pre_node,
                            None => return Ok(outcome),
                        }
                    }
                    None => node,
                };
                for (condition, placement) in children {
                    commit(graph, parent, placement, EdgeSpec::branch(condition, 1), &mut outcome)?;
                }
            }
            HaltReason::Branch(mut branches) if !branches.is_empty() => {
                let first = branches.remove(0);
                let placement = self.place(cancel, &candidates, first).await?;
                commit(
                    graph,
                    node,
                    placement,
                    EdgeSpec::step(taken.saturating_add(1)),
                    &mut outcome,
                )?;
            }
            reason => {
                let Some(last) = steps.pop() else {
                    if matches!(reason, HaltReason::Stuck | HaltReason::Branch(_)) {
                        graph.tag_node(node, tags::TERMINAL)?;
                        tracing::debug!(node = %node, "No rule applies; node is terminal");
                    }
                    return Ok(outcome);
                };
                let placement = self.place(cancel, &candidates, last).await?;
                if let Some(created) =
                    commit(graph, node, placement, EdgeSpec::step(taken), &mut outcome)?
                {
                    match reason {
                        HaltReason::Stuck | HaltReason::Branch(_) => {
                            graph.tag_node(created, tags::TERMINAL)?;
                        }
                        HaltReason::HaltTagHit(tag) => {
                            graph.tag_node(created, &format!("{}{tag}", tags::HALT_PREFIX))?;
                        }
                        _ => {}
                    }
                }
            }
        }

        tracing::debug!(
            node = %node,
            nodes = outcome.new_nodes.len(),
            edges = outcome.new_edges.len(),
            "Step committed"
        );
        Ok(outcome)
    }

    /// Drop everything below the ancestor `depth` tree edges above `node`.
    pub fn rewind(
        &self,
        graph: &mut Graph,
        node: NodeId,
        depth: Option<u32>,
    ) -> Result<RewindOutcome, ReachError> {
        let depth = depth.unwrap_or(1);
        graph.node(node)?;
        if node == graph.init() {
            return Err(ReachError::InvalidArgument(
                "cannot rewind the init node".into(),
            ));
        }
        if depth == 0 {
            return Err(ReachError::InvalidArgument(
                "rewind depth must be at least 1".into(),
            ));
        }

        let chain = graph.ancestors(node);
        let Some(&ancestor) = chain.get(depth as usize) else {
            return Err(ReachError::InvalidArgument(format!(
                "node {node} is only {} step(s) from init",
                chain.len().saturating_sub(1)
            )));
        };

        let removal = graph.detach_successors(ancestor)?;
        tracing::info!(
            node = %node,
            ancestor = %ancestor,
            removed_nodes = removal.nodes.len(),
            "Rewound"
        );
        Ok(RewindOutcome {
            node: ancestor,
            removed_nodes: removal.nodes,
            removed_edges: removal.edges,
            removed_aliases: removal.aliases,
        })
    }

    /// Split a fresh node on `condition`.
    pub async fn case_split(
        &self,
        graph: &mut Graph,
        node: NodeId,
        condition: Term,
        cancel: &CancelToken,
    ) -> Result<CaseSplitOutcome, ReachError> {
        require_fresh(graph, node)?;
        let parent = graph.node(node)?.clone();

        let negation = Term::not(condition.clone());
        let positive_raw = Term::and(parent.constraint.clone(), condition.clone());
        let negative_raw = Term::and(parent.constraint.clone(), negation.clone());
        let top = Term::top();
        let positive_constraint = self
            .ask(cancel, "simplify", self.oracle.simplify(&positive_raw, &top))
            .await?;
        let negative_constraint = self
            .ask(cancel, "simplify", self.oracle.simplify(&negative_raw, &top))
            .await?;

        let (positive, positive_edge) = graph.add_successor(
            node,
            State::new(parent.term.clone(), positive_constraint.clone()),
            EdgeSpec::branch(condition, 0),
        )?;
        let (negative, negative_edge) = graph.add_successor(
            node,
            State::new(parent.term, negative_constraint.clone()),
            EdgeSpec::branch(negation, 0),
        )?;
        for (child, constraint) in [(positive, &positive_constraint), (negative, &negative_constraint)] {
            if constraint.is_false() {
                graph.tag_node(child, tags::VACUOUS)?;
                tracing::debug!(node = %child, "Case is infeasible");
            }
        }

        tracing::info!(node = %node, positive = %positive, negative = %negative, "Case split");
        Ok(CaseSplitOutcome {
            positive,
            negative,
            positive_edge,
            negative_edge,
        })
    }

    /// Advance from `source` until a reached state implies `target`.
    pub async fn build_edges(
        &self,
        graph: &mut Graph,
        source: NodeId,
        target: NodeId,
        max_depth: Option<u32>,
        cancel: &CancelToken,
    ) -> Result<BuildOutcome, ReachError> {
        let max_depth = max_depth.unwrap_or(self.build_max_depth);
        graph.node(source)?;
        let goal = graph.node(target)?.state();
        if source == target {
            return Err(ReachError::InvalidArgument(
                "build source and target must differ".into(),
            ));
        }
        if graph.reaches(target, source) {
            return Err(ReachError::CycleRejected {
                from: source,
                to: target,
            });
        }

        tracing::info!(source = %source, target = %target, max_depth, "Building edge");
        let mut run = BuildRun {
            source,
            target,
            goal,
            max_depth,
            new_nodes: Vec::new(),
            new_edges: Vec::new(),
        };
        match self.walk(graph, &mut run, cancel).await {
            Err(ReachError::OracleUnavailable(message)) => {
                let removal = graph.remove_edges(&run.new_edges);
                tracing::warn!(
                    source = %source,
                    nodes = removal.nodes.len(),
                    edges = removal.edges.len(),
                    "Rolled back partial build"
                );
                Err(ReachError::OracleUnavailable(message))
            }
            other => other,
        }
    }

    async fn walk(
        &self,
        graph: &mut Graph,
        run: &mut BuildRun,
        cancel: &CancelToken,
    ) -> Result<BuildOutcome, ReachError> {
        let mut frontier = run.source;
        let mut taken: u32 = 0;

        loop {
            let current = graph.node(frontier)?.state();
            if let Some(substitution) = self.implies(cancel, &current, &run.goal).await? {
                let spec = EdgeSpec {
                    kind: EdgeKind::Step,
                    condition: Term::top(),
                    substitution,
                    depth: taken,
                    tags: BTreeSet::from([tags::BUILT.to_string()]),
                };
                let edge = graph.add_edge(run.source, run.target, spec)?;
                tracing::info!(edge = %edge, depth = taken, "Built edge");
                return Ok(BuildOutcome {
                    edge,
                    depth: taken,
                    frontier,
                    new_nodes: std::mem::take(&mut run.new_nodes),
                    new_edges: std::mem::take(&mut run.new_edges),
                });
            }
            if taken >= run.max_depth {
                return Err(ReachError::Exhausted {
                    depth: taken,
                    frontier,
                });
            }

            match graph.node_state(frontier)? {
                NodeState::Fresh => {
                    let exec = self.execute(cancel, &current, 1, &self.halt_tags).await?;
                    let Execution { mut steps, halt } = exec;
                    let Some(next) = steps.pop() else {
                        return match halt {
                            HaltReason::Branch(_) => Err(ReachError::Branched { node: frontier }),
                            _ => {
                                graph.tag_node(frontier, tags::TERMINAL)?;
                                Err(ReachError::Stuck { node: frontier })
                            }
                        };
                    };
                    let candidates = subsumption_candidates(graph, frontier);
                    match self.place(cancel, &candidates, next).await? {
                        Placement::Fresh(state) => {
                            let (node, edge) =
                                graph.add_successor(frontier, state, EdgeSpec::step(1))?;
                            run.new_nodes.push(node);
                            run.new_edges.push(edge);
                            match halt {
                                HaltReason::Stuck => {
                                    graph.tag_node(node, tags::TERMINAL)?;
                                }
                                HaltReason::HaltTagHit(tag) => {
                                    graph.tag_node(node, &format!("{}{tag}", tags::HALT_PREFIX))?;
                                }
                                _ => {}
                            }
                            frontier = node;
                        }
                        Placement::Covered { by, substitution } => {
                            let edge =
                                graph.add_edge(frontier, by, EdgeSpec::cover(substitution, 1))?;
                            run.new_edges.push(edge);
                            frontier = by;
                        }
                    }
                    taken = taken.saturating_add(1);
                }
                NodeState::Expanded | NodeState::Covered => {
                    let out: Vec<_> = graph
                        .outgoing(frontier)
                        .into_iter()
                        .filter(|e| !e.tags.contains(tags::BUILT))
                        .collect();
                    let [edge] = out.as_slice() else {
                        return Err(if out.is_empty() {
                            ReachError::Stuck { node: frontier }
                        } else {
                            ReachError::Branched { node: frontier }
                        });
                    };
                    taken = taken.saturating_add(edge.depth.max(1));
                    frontier = edge.target;
                }
                NodeState::Terminal | NodeState::Target => {
                    return Err(ReachError::Stuck { node: frontier });
                }
            }
        }
    }

    /// Replace step edge `edge` with `sections` shorter step edges through
    /// fresh intermediate nodes.
    ///
    /// Each segment covers `depth / sections` steps; the closing segment takes
    /// the remainder. The source is re-executed before anything is committed.
    pub async fn section_edge(
        &self,
        graph: &mut Graph,
        edge: EdgeId,
        sections: u32,
        cancel: &CancelToken,
    ) -> Result<SectionOutcome, ReachError> {
        let recorded = graph.edge(edge)?.clone();
        if recorded.kind != EdgeKind::Step {
            return Err(ReachError::InvalidArgument(format!(
                "edge {edge} is a {} edge; only step edges can be sectioned",
                recorded.kind
            )));
        }
        if sections < 2 {
            return Err(ReachError::InvalidArgument(
                "an edge needs at least 2 sections".into(),
            ));
        }
        let section_depth = recorded.depth / sections;
        if section_depth == 0 {
            return Err(ReachError::InvalidArgument(format!(
                "edge {edge} of depth {} cannot be cut into {sections} sections",
                recorded.depth
            )));
        }

        let cuts = sections - 1;
        let replayed = cuts * section_depth;
        let start = graph.node(recorded.source)?.state();
        tracing::info!(edge = %edge, sections, section_depth, "Sectioning edge");
        let exec = self.execute(cancel, &start, replayed, &[]).await?;
        if exec.depth() < replayed {
            return Err(match exec.halt {
                HaltReason::Branch(_) => ReachError::Branched {
                    node: recorded.source,
                },
                _ => ReachError::Stuck {
                    node: recorded.source,
                },
            });
        }

        let intermediate: Vec<(State, u32)> = exec
            .steps
            .into_iter()
            .skip(section_depth as usize - 1)
            .step_by(section_depth as usize)
            .take(cuts as usize)
            .map(|state| (state, section_depth))
            .collect();
        let tail = recorded.depth - replayed;
        let (nodes, edges) = graph.section_edge(edge, intermediate, tail)?;
        Ok(SectionOutcome { nodes, edges })
    }

    /// Re-check recorded edges against the oracle. Never mutates.
    pub async fn verify_edges(
        &self,
        graph: &Graph,
        edges: &[EdgeId],
        cancel: &CancelToken,
    ) -> Result<Vec<EdgeVerdict>, ReachError> {
        let mut work = Vec::with_capacity(edges.len());
        for id in edges {
            let edge = graph.edge(*id)?;
            let source = graph.node(edge.source)?.state();
            let target = graph.node(edge.target)?.state();
            work.push((edge.clone(), source, target));
        }

        let mut verdicts = Vec::with_capacity(work.len());
        for (edge, source, target) in work {
            let reached = if edge.depth == 0 {
                vec![State::new(
                    source.term,
                    Term::and(source.constraint, edge.condition.clone()),
                )]
            } else {
                let exec = self.execute(cancel, &source, edge.depth, &[]).await?;
                match exec {
                    Execution { mut steps, .. } if steps.len() == edge.depth as usize => {
                        steps.pop().into_iter().collect()
                    }
                    Execution {
                        steps,
                        halt: HaltReason::Branch(candidates),
                    } if steps.len() + 1 == edge.depth as usize => candidates,
                    Execution { steps, halt } => {
                        verdicts.push(EdgeVerdict {
                            edge: edge.id,
                            verdict: Verdict::Fail {
                                reason: format!(
                                    "execution halted ({:?}) after {} of {} step(s)",
                                    StepHalt::from(&halt),
                                    steps.len(),
                                    edge.depth
                                ),
                            },
                        });
                        continue;
                    }
                }
            };

            let mut verdict = Verdict::Fail {
                reason: format!(
                    "no state reached in {} step(s) implies node {}",
                    edge.depth, edge.target
                ),
            };
            for state in &reached {
                if self.implies(cancel, state, &target).await?.is_some() {
                    verdict = Verdict::Pass;
                    break;
                }
            }
            tracing::debug!(edge = %edge.id, passed = verdict == Verdict::Pass, "Verified edge");
            verdicts.push(EdgeVerdict {
                edge: edge.id,
                verdict,
            });
        }
        Ok(verdicts)
    }

    /// Replace the sub-term at `path` in a fresh node.
    pub fn update_cell(
        &self,
        graph: &mut Graph,
        node: NodeId,
        path: &CellPath,
        term: Term,
    ) -> Result<Node, ReachError> {
        require_fresh(graph, node)?;
        let updated = graph.node(node)?.term.replace_at(path, term)?;
        tracing::info!(node = %node, path = %path, "Updated cell");
        graph.replace_term(node, updated).cloned()
    }
}

fn require_fresh(graph: &Graph, node: NodeId) -> Result<(), ReachError> {
    match graph.node_state(node)? {
        NodeState::Fresh => Ok(()),
        state => Err(ReachError::NodeClosed { node, state }),
    }
}

/// Nodes that may subsume a successor of `node`: its ancestors nearest
/// first, then every other live node by ascending id. The target is left out.
fn subsumption_candidates(graph: &Graph, node: NodeId) -> Vec<(NodeId, State)> {
    let ancestors = graph.ancestors(node);
    let seen: BTreeSet<NodeId> = ancestors.iter().copied().collect();
    let others = graph
        .nodes(None)
        .into_iter()
        .map(|n| n.id)
        .filter(|id| !seen.contains(id));
    ancestors
        .iter()
        .copied()
        .chain(others)
        .filter(|id| Some(*id) != graph.target())
        .filter_map(|id| graph.node(id).ok().map(|n| (id, n.state())))
        .collect()
}

/// Conjuncts of `child` that `parent` does not already carry.
fn new_conjuncts(parent: &Term, child: &Term) -> Term {
    let known: BTreeSet<&Term> = parent.conjuncts().into_iter().collect();
    Term::conjunction(
        child
            .conjuncts()
            .into_iter()
            .filter(|c| !known.contains(c))
            .cloned(),
    )
}

/// Add `placement` below `parent`. Returns the node created, if any.
fn commit(
    graph: &mut Graph,
    parent: NodeId,
    placement: Placement,
    spec: EdgeSpec,
    outcome: &mut StepOutcome,
) -> Result<Option<NodeId>, ReachError> {
    match placement {
        Placement::Fresh(state) => {
            let (node, edge) = graph.add_successor(parent, state, spec)?;
            outcome.new_nodes.push(node);
            outcome.new_edges.push(edge);
            Ok(Some(node))
        }
        Placement::Covered { by, substitution } => {
            let cover = EdgeSpec {
                kind: EdgeKind::Cover,
                condition: Term::top(),
                substitution,
                ..spec
            };
            let edge = graph.add_edge(parent, by, cover)?;
            tracing::debug!(node = %parent, covered_by = %by, "Closed with cover edge");
            outcome.new_edges.push(edge);
            Ok(None)
        }
    }
}
