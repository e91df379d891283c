//! Sessions: one graph, one oracle, one process table, one writer.
//!
//! Mutations are queued and applied strictly in arrival order by a single
//! writer task that holds the graph's write lock for the duration of each
//! operation. Local writes (aliases, tags, the target) go through the same
//! queue, so they land after every mutation submitted before them.
//! `verify_edges` runs on its own task under the read lock.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::{RwLock, mpsc, oneshot};

use reach_graph::{Graph, GraphSnapshot, InvariantViolation, ProofSummary};
use reach_oracle::{Oracle, RpcOracle};
use reach_types::{
    CellPath, Edge, EdgeId, Missing, Node, NodeId, NodeState, ProcessId, ReachError, State,
    Substitution, Term,
};

use crate::config::SessionSettings;
use crate::explore::{CancelToken, Explorer};
use crate::process::{
    Process, ProcessKind, ProcessResult, ProcessStatus, ProcessTracker, settled,
};

/// A queued graph mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Step {
        node: NodeId,
        branch: bool,
        depth: Option<u32>,
    },
    Rewind {
        node: NodeId,
        depth: Option<u32>,
    },
    CaseSplit {
        node: NodeId,
        condition: Term,
    },
    UpdateCell {
        node: NodeId,
        path: CellPath,
        term: Term,
    },
    Build {
        source: NodeId,
        target: NodeId,
        max_depth: Option<u32>,
    },
    Section {
        edge: EdgeId,
        sections: u32,
    },
}

impl Mutation {
    #[must_use]
    pub const fn kind(&self) -> ProcessKind {
        match self {
            Self::Step { .. } => ProcessKind::Step,
            Self::Rewind { .. } => ProcessKind::Rewind,
            Self::CaseSplit { .. } => ProcessKind::CaseSplit,
            Self::UpdateCell { .. } => ProcessKind::UpdateCell,
            Self::Build { .. } => ProcessKind::Build,
            Self::Section { .. } => ProcessKind::Section,
        }
    }
}

struct Job {
    id: ProcessId,
    cancel: CancelToken,
    mutation: Mutation,
}

type LocalWrite = Box<dyn FnOnce(&mut Graph) + Send>;

/// One entry in the writer queue.
enum Work {
    Job(Job),
    /// Applied in queue order without a process entry.
    Local(LocalWrite),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInput {
    Snapshot(GraphSnapshot),
    Term(Term),
}

/// Build the network oracle described by `settings`.
pub fn rpc_oracle(settings: &SessionSettings) -> Result<Arc<dyn Oracle>, ReachError> {
    let oracle = RpcOracle::new(settings.oracle_endpoint.clone(), &settings.rpc_settings())
        .map_err(|e| ReachError::OracleUnavailable(e.to_string()))?;
    Ok(Arc::new(oracle))
}

/// Explicit handle to one exploration session.
///
/// Must be created inside a Tokio runtime; the writer task is spawned on it.
pub struct Session {
    graph: Arc<RwLock<Graph>>,
    explorer: Arc<Explorer>,
    tracker: Arc<ProcessTracker>,
    queue: mpsc::UnboundedSender<Work>,
    settings: SessionSettings,
}

impl Session {
    #[must_use]
    pub fn new(settings: SessionSettings, oracle: Arc<dyn Oracle>, graph: Graph) -> Self {
        let graph = Arc::new(RwLock::new(graph));
        let explorer = Arc::new(Explorer::new(oracle, &settings));
        let tracker = Arc::new(ProcessTracker::new(settings.retention));
        let (queue, rx) = mpsc::unbounded_channel();

        tokio::spawn(run_writer(
            rx,
            Arc::clone(&graph),
            Arc::clone(&explorer),
            Arc::clone(&tracker),
        ));

        Self {
            graph,
            explorer,
            tracker,
            queue,
            settings,
        }
    }

    /// Start from `term`, replacing each `$NAME` variable with `params[NAME]`.
    #[must_use]
    pub fn load(
        settings: SessionSettings,
        oracle: Arc<dyn Oracle>,
        term: &Term,
        params: &BTreeMap<String, Term>,
    ) -> Self {
        let subst: Substitution = params
            .iter()
            .map(|(name, value)| (format!("${name}"), value.clone()))
            .collect();
        let init = State::unconstrained(term.substitute(&subst));
        tracing::info!(params = params.len(), "Loaded session");
        Self::new(settings, oracle, Graph::new(init))
    }

    /// Start from JSON holding either a [`GraphSnapshot`] or a bare [`Term`].
    pub fn load_raw(
        settings: SessionSettings,
        oracle: Arc<dyn Oracle>,
        text: &str,
    ) -> Result<Self, ReachError> {
        let raw: RawInput =
            serde_json::from_str(text).map_err(|e| ReachError::InvalidSnapshot(e.to_string()))?;
        let graph = match raw {
            RawInput::Snapshot(snapshot) => Graph::from_snapshot(snapshot)?,
            RawInput::Term(term) => Graph::new(State::unconstrained(term)),
        };
        tracing::info!(nodes = graph.node_count(), edges = graph.edge_count(), "Loaded raw session");
        Ok(Self::new(settings, oracle, graph))
    }

    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Queue `mutation` behind every mutation submitted before it.
    pub fn submit(&self, mutation: Mutation) -> ProcessId {
        let (id, cancel) = self.tracker.allocate(mutation.kind());
        self.enqueue(Job { id, cancel, mutation });
        id
    }

    fn enqueue(&self, job: Job) {
        let id = job.id;
        tracing::debug!(process = %id, mutation = ?job.mutation, "Queued mutation");
        if self.queue.send(Work::Job(job)).is_err() {
            tracing::error!(process = %id, "Session writer has stopped");
            // Settles the pending entry as CANCELLED.
            if let Err(error) = self.tracker.cancel(id) {
                tracing::warn!(process = %id, %error, "Could not settle unqueued mutation");
            }
        }
    }

    /// Run `write` on the writer task, behind everything already queued.
    async fn write_local<T, F>(&self, write: F) -> Result<T, ReachError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Graph) -> Result<T, ReachError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let work = Work::Local(Box::new(move |graph: &mut Graph| {
            if tx.send(write(graph)).is_err() {
                tracing::debug!("Local write finished after its caller left");
            }
        }));
        if self.queue.send(work).is_err() {
            tracing::error!("Session writer has stopped");
            return Err(ReachError::Cancelled);
        }
        rx.await.map_err(|_| ReachError::Cancelled)?
    }

    pub fn step(&self, node: NodeId, branch: bool, depth: Option<u32>) -> ProcessId {
        self.submit(Mutation::Step {
            node,
            branch,
            depth,
        })
    }

    pub fn rewind(&self, node: NodeId, depth: Option<u32>) -> ProcessId {
        self.submit(Mutation::Rewind { node, depth })
    }

    pub fn case_split(&self, node: NodeId, condition: Term) -> ProcessId {
        self.submit(Mutation::CaseSplit { node, condition })
    }

    pub fn update_cell(&self, node: NodeId, path: CellPath, term: Term) -> ProcessId {
        self.submit(Mutation::UpdateCell { node, path, term })
    }

    pub fn build_edges(&self, source: NodeId, target: NodeId, max_depth: Option<u32>) -> ProcessId {
        self.submit(Mutation::Build {
            source,
            target,
            max_depth,
        })
    }

    /// Cut step edge `edge` into `sections` shorter steps.
    pub fn section_edge(&self, edge: EdgeId, sections: u32) -> ProcessId {
        self.submit(Mutation::Section { edge, sections })
    }

    /// Re-check `edges` on a separate task under the read lock.
    pub fn verify_edges(&self, edges: Vec<EdgeId>) -> ProcessId {
        let (id, cancel) = self.tracker.allocate(ProcessKind::Verify);
        let graph = Arc::clone(&self.graph);
        let explorer = Arc::clone(&self.explorer);
        let tracker = Arc::clone(&self.tracker);
        tokio::spawn(async move {
            let guard = graph.read().await;
            if !tracker.start(id) {
                return;
            }
            let outcome = explorer
                .verify_edges(&guard, &edges, &cancel)
                .await
                .map(ProcessResult::Verify);
            drop(guard);
            tracker.finish(id, outcome);
        });
        id
    }

    /// Submit and wait for the result with no deadline.
    pub async fn run(&self, mutation: Mutation) -> Result<ProcessResult, ReachError> {
        let (id, cancel) = self.tracker.allocate(mutation.kind());
        let rx = self.tracker.subscribe(id)?;
        self.enqueue(Job { id, cancel, mutation });
        into_result(settled(rx).await)
    }

    /// Wait for `id` to settle and unwrap its result or error.
    pub async fn outcome(&self, id: ProcessId) -> Result<ProcessResult, ReachError> {
        into_result(self.tracker.wait_settled(id).await?)
    }

    // ------------------------------------------------------------------
    // Processes
    // ------------------------------------------------------------------

    pub async fn wait(&self, id: ProcessId, timeout: Duration) -> Result<Process, ReachError> {
        self.tracker.wait(id, timeout).await
    }

    pub fn process(&self, id: ProcessId) -> Result<Process, ReachError> {
        self.tracker.get(id)
    }

    #[must_use]
    pub fn processes(&self) -> Vec<Process> {
        self.tracker.list()
    }

    pub fn cancel(&self, id: ProcessId) -> Result<bool, ReachError> {
        self.tracker.cancel(id)
    }

    pub fn sweep(&self) -> usize {
        self.tracker.sweep()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn init(&self) -> NodeId {
        self.graph.read().await.init()
    }

    pub async fn target(&self) -> Option<NodeId> {
        self.graph.read().await.target()
    }

    pub async fn node(&self, id: NodeId) -> Result<Node, ReachError> {
        self.graph.read().await.node(id).cloned()
    }

    pub async fn node_state(&self, id: NodeId) -> Result<NodeState, ReachError> {
        self.graph.read().await.node_state(id)
    }

    pub async fn edge(&self, id: EdgeId) -> Result<Edge, ReachError> {
        self.graph.read().await.edge(id).cloned()
    }

    pub async fn nodes(&self, tag: Option<&str>) -> Vec<Node> {
        self.graph.read().await.nodes(tag).into_iter().cloned().collect()
    }

    pub async fn edges(&self, tag: Option<&str>) -> Vec<Edge> {
        self.graph.read().await.edges(tag).into_iter().cloned().collect()
    }

    pub async fn dot(&self) -> String {
        self.graph.read().await.dot()
    }

    pub async fn tree(&self) -> String {
        self.graph.read().await.tree()
    }

    pub async fn diff(&self, left: NodeId, right: NodeId) -> Result<String, ReachError> {
        self.graph.read().await.diff(left, right)
    }

    pub async fn snapshot(&self) -> GraphSnapshot {
        self.graph.read().await.snapshot()
    }

    /// Every simple path from `source` to `target`, as edge ids.
    pub async fn paths_between(
        &self,
        source: NodeId,
        target: NodeId,
        traverse_covers: bool,
    ) -> Result<Vec<Vec<EdgeId>>, ReachError> {
        self.graph
            .read()
            .await
            .paths_between(source, target, traverse_covers)
    }

    pub async fn shortest_path_between(
        &self,
        source: NodeId,
        target: NodeId,
    ) -> Result<Option<Vec<EdgeId>>, ReachError> {
        self.graph.read().await.shortest_path_between(source, target)
    }

    pub async fn path_constraint(&self, node: NodeId) -> Result<Term, ReachError> {
        self.graph.read().await.path_constraint(node)
    }

    pub async fn proof_summary(&self) -> ProofSummary {
        self.graph.read().await.proof_summary()
    }

    pub async fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.graph.read().await.check_invariants()
    }

    pub async fn resolve(&self, name: &str) -> Result<NodeId, ReachError> {
        self.graph.read().await.resolve(name)
    }

    /// `#init`, `#target`, `#frontier`, `@alias`, or a numeric id.
    pub async fn resolve_ref(&self, text: &str) -> Result<NodeId, ReachError> {
        self.graph.read().await.resolve_ref(text)
    }

    pub async fn aliases_of(&self, node: NodeId) -> Vec<String> {
        self.graph
            .read()
            .await
            .aliases_of(node)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    // ------------------------------------------------------------------
    // Local writes (no oracle traffic)
    // ------------------------------------------------------------------

    pub async fn add_alias(&self, name: &str, node: NodeId) -> Result<(), ReachError> {
        let name = name.to_string();
        self.write_local(move |g| g.add_alias(&name, node)).await
    }

    pub async fn remove_alias(&self, name: &str) -> Result<NodeId, ReachError> {
        let name = name.to_string();
        self.write_local(move |g| g.remove_alias(&name)).await
    }

    pub async fn set_target(&self, state: State) -> Result<NodeId, ReachError> {
        self.write_local(move |g| g.set_target(state)).await
    }

    pub async fn tag_node(&self, node: NodeId, tag: &str) -> Result<bool, ReachError> {
        let tag = tag.to_string();
        self.write_local(move |g| g.tag_node(node, &tag)).await
    }

    pub async fn untag_node(&self, node: NodeId, tag: &str) -> Result<bool, ReachError> {
        let tag = tag.to_string();
        self.write_local(move |g| g.untag_node(node, &tag)).await
    }
}

fn into_result(process: Process) -> Result<ProcessResult, ReachError> {
    let id = process.id;
    match process.status {
        ProcessStatus::Done => process
            .result
            .ok_or(ReachError::NotFound(Missing::Process(id))),
        ProcessStatus::Cancelled => Err(ReachError::Cancelled),
        status => Err(process.error.unwrap_or_else(|| {
            ReachError::InvalidArgument(format!("process {id} is still {status}"))
        })),
    }
}

async fn run_writer(
    mut rx: mpsc::UnboundedReceiver<Work>,
    graph: Arc<RwLock<Graph>>,
    explorer: Arc<Explorer>,
    tracker: Arc<ProcessTracker>,
) {
    while let Some(work) = rx.recv().await {
        let mut guard = graph.write().await;
        match work {
            Work::Job(job) => {
                if !tracker.start(job.id) {
                    tracing::debug!(process = %job.id, "Skipping cancelled mutation");
                    continue;
                }
                let outcome = apply(&explorer, &mut guard, job.mutation, &job.cancel).await;
                if cfg!(debug_assertions)
                    && let Err(violation) = guard.check_invariants()
                {
                    tracing::error!(process = %job.id, %violation, "Graph invariant broken");
                }
                drop(guard);
                tracker.finish(job.id, outcome);
            }
            Work::Local(write) => {
                write(&mut guard);
                if cfg!(debug_assertions)
                    && let Err(violation) = guard.check_invariants()
                {
                    tracing::error!(%violation, "Graph invariant broken by local write");
                }
            }
        }
    }
    tracing::debug!("Session writer stopped");
}

async fn apply(
    explorer: &Explorer,
    graph: &mut Graph,
    mutation: Mutation,
    cancel: &CancelToken,
) -> Result<ProcessResult, ReachError> {
    match mutation {
        Mutation::Step {
            node,
            branch,
            depth,
        } => explorer
            .step(graph, node, branch, depth, cancel)
            .await
            .map(ProcessResult::Step),
        Mutation::Rewind { node, depth } => {
            explorer.rewind(graph, node, depth).map(ProcessResult::Rewind)
        }
        Mutation::CaseSplit { node, condition } => explorer
            .case_split(graph, node, condition, cancel)
            .await
            .map(ProcessResult::CaseSplit),
        Mutation::UpdateCell { node, path, term } => explorer
            .update_cell(graph, node, &path, term)
            .map(ProcessResult::UpdateCell),
        Mutation::Build {
            source,
            target,
            max_depth,
        } => explorer
            .build_edges(graph, source, target, max_depth, cancel)
            .await
            .map(ProcessResult::Build),
        Mutation::Section { edge, sections } => explorer
            .section_edge(graph, edge, sections, cancel)
            .await
            .map(ProcessResult::Section),
    }
}
