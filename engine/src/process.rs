//! Process tracking for engine operations.
//!
//! # Lifecycle
//!
//! ```text
//! PENDING --dispatch--> RUNNING --complete--> DONE
//!    |                     |------fail------> ERROR
//!    |                     `-----cancel-----> CANCELLED
//!    `--------------------cancel-----------> CANCELLED
//! ```
//!
//! [`transition_edge`] is the only place that encodes this graph. Any other
//! transition is refused and logged.
//!
//! Each process publishes its snapshot on a `watch` channel, so waiters see the
//! settled state even if the entry is evicted right after settling.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use reach_types::{Missing, Node, ProcessId, ReachError};

use crate::explore::{
    BuildOutcome, CancelToken, CaseSplitOutcome, EdgeVerdict, RewindOutcome, SectionOutcome,
    StepOutcome,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStatus {
    Pending,
    Running,
    Done,
    Error,
    Cancelled,
}

impl ProcessStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Done => "DONE",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Neither pending nor running.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancelled)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessEdge {
    Dispatch,
    Complete,
    Fail,
    Cancel,
}

#[must_use]
pub fn transition_edge(from: ProcessStatus, to: ProcessStatus) -> Option<ProcessEdge> {
    use ProcessStatus::{Cancelled, Done, Error, Pending, Running};

    match (from, to) {
        (Pending, Running) => Some(ProcessEdge::Dispatch),
        (Running, Done) => Some(ProcessEdge::Complete),
        (Running, Error) => Some(ProcessEdge::Fail),
        (Pending | Running, Cancelled) => Some(ProcessEdge::Cancel),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    Step,
    Rewind,
    CaseSplit,
    UpdateCell,
    Build,
    Section,
    Verify,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessResult {
    Step(StepOutcome),
    Rewind(RewindOutcome),
    CaseSplit(CaseSplitOutcome),
    UpdateCell(Node),
    Build(BuildOutcome),
    Section(SectionOutcome),
    Verify(Vec<EdgeVerdict>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,
    pub kind: ProcessKind,
    pub status: ProcessStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ProcessResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReachError>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

struct Entry {
    tx: watch::Sender<Process>,
    cancel: CancelToken,
}

#[derive(Default)]
struct Table {
    next_id: u64,
    entries: BTreeMap<ProcessId, Entry>,
    /// Settled ids, oldest first.
    completed: VecDeque<ProcessId>,
}

impl Table {
    fn entry(&self, id: ProcessId) -> Result<&Entry, ReachError> {
        self.entries
            .get(&id)
            .ok_or(ReachError::NotFound(Missing::Process(id)))
    }

    /// Apply `to` if legal. Returns whether the entry moved.
    fn transition(
        &mut self,
        id: ProcessId,
        to: ProcessStatus,
        outcome: Option<Result<ProcessResult, ReachError>>,
    ) -> bool {
        let Some(entry) = self.entries.get(&id) else {
            tracing::warn!(process = %id, to = %to, "Transition for unknown process");
            return false;
        };
        let from = entry.tx.borrow().status;
        if transition_edge(from, to).is_none() {
            tracing::warn!(process = %id, from = %from, to = %to, "Ignoring illegal process transition");
            return false;
        }

        let now = Utc::now();
        entry.tx.send_modify(|p| {
            p.status = to;
            match to {
                ProcessStatus::Running => p.started_at = Some(now),
                _ => p.finished_at = Some(now),
            }
            match outcome {
                Some(Ok(result)) => p.result = Some(result),
                Some(Err(error)) => p.error = Some(error),
                None => {}
            }
        });
        tracing::debug!(process = %id, from = %from, to = %to, "Process transition");

        if to.is_settled() {
            self.completed.push_back(id);
        }
        true
    }

    fn evict(&mut self, retention: usize) {
        while self.completed.len() > retention {
            let Some(oldest) = self.completed.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            tracing::debug!(process = %oldest, "Evicted completed process");
        }
    }
}

/// Registry of the processes of one session.
pub struct ProcessTracker {
    table: Mutex<Table>,
    retention: usize,
}

impl ProcessTracker {
    #[must_use]
    pub fn new(retention: usize) -> Self {
        Self {
            table: Mutex::new(Table::default()),
            retention,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        // A poisoned table still holds consistent entries; every update is a
        // single `send_modify`.
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new `PENDING` process.
    pub fn allocate(&self, kind: ProcessKind) -> (ProcessId, CancelToken) {
        let mut table = self.lock();
        let id = ProcessId::new(table.next_id);
        table.next_id = table.next_id.saturating_add(1);
        let cancel = CancelToken::new();
        let (tx, _rx) = watch::channel(Process {
            id,
            kind,
            status: ProcessStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        });
        table.entries.insert(
            id,
            Entry {
                tx,
                cancel: cancel.clone(),
            },
        );
        tracing::debug!(process = %id, ?kind, "Allocated process");
        (id, cancel)
    }

    /// `PENDING -> RUNNING`. False when the process is gone or was cancelled.
    pub fn start(&self, id: ProcessId) -> bool {
        self.lock().transition(id, ProcessStatus::Running, None)
    }

    /// Settle a running process from its operation's result.
    pub fn finish(&self, id: ProcessId, outcome: Result<ProcessResult, ReachError>) {
        let to = match &outcome {
            Ok(_) => ProcessStatus::Done,
            Err(ReachError::Cancelled) => ProcessStatus::Cancelled,
            Err(_) => ProcessStatus::Error,
        };
        let mut table = self.lock();
        if table.transition(id, to, Some(outcome)) {
            table.evict(self.retention);
        }
    }

    /// Request cancellation. Returns whether the request was recorded.
    ///
    /// A pending process is settled `CANCELLED` at once; a running one stops at
    /// its next oracle call.
    pub fn cancel(&self, id: ProcessId) -> Result<bool, ReachError> {
        let mut table = self.lock();
        let entry = table.entry(id)?;
        let status = entry.tx.borrow().status;
        match status {
            ProcessStatus::Pending => {
                entry.cancel.cancel();
                table.transition(id, ProcessStatus::Cancelled, Some(Err(ReachError::Cancelled)));
                table.evict(self.retention);
                Ok(true)
            }
            ProcessStatus::Running => {
                entry.cancel.cancel();
                tracing::info!(process = %id, "Cancellation requested");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn get(&self, id: ProcessId) -> Result<Process, ReachError> {
        Ok(self.lock().entry(id)?.tx.borrow().clone())
    }

    /// Wait until the process settles or `timeout` elapses, then return its
    /// snapshot. Timing out is not an error.
    pub async fn wait(&self, id: ProcessId, timeout: Duration) -> Result<Process, ReachError> {
        let mut rx = self.subscribe(id)?;
        let done = tokio::time::timeout(timeout, rx.wait_for(|p| p.status.is_settled()))
            .await
            .ok()
            .and_then(Result::ok)
            .map(|p| p.clone());
        Ok(done.unwrap_or_else(|| rx.borrow().clone()))
    }

    /// Wait with no deadline.
    pub async fn wait_settled(&self, id: ProcessId) -> Result<Process, ReachError> {
        Ok(settled(self.subscribe(id)?).await)
    }

    /// Receiver for the process snapshot. It keeps the final snapshot after
    /// the entry is evicted.
    pub fn subscribe(&self, id: ProcessId) -> Result<watch::Receiver<Process>, ReachError> {
        Ok(self.lock().entry(id)?.tx.subscribe())
    }

    /// Drop every settled process. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let mut table = self.lock();
        let ids: Vec<ProcessId> = table.completed.drain(..).collect();
        for id in &ids {
            table.entries.remove(id);
        }
        tracing::debug!(removed = ids.len(), "Swept processes");
        ids.len()
    }

    /// Retained processes in ascending id.
    #[must_use]
    pub fn list(&self) -> Vec<Process> {
        self.lock()
            .entries
            .values()
            .map(|e| e.tx.borrow().clone())
            .collect()
    }
}

/// Resolve once `rx` reports a settled status.
pub async fn settled(mut rx: watch::Receiver<Process>) -> Process {
    let done = rx
        .wait_for(|p| p.status.is_settled())
        .await
        .ok()
        .map(|p| p.clone());
    done.unwrap_or_else(|| rx.borrow().clone())
}
