//! Oracle clients for reach.
//!
//! # Architecture
//!
//! The exploration engine never rewrites terms itself. It asks an [`Oracle`]:
//!
//! - [`Oracle::execute_steps`] - run the semantics forward from a state
//! - [`Oracle::implies`] - subsumption check between two states
//! - [`Oracle::simplify`] - normal form of a term under a constraint
//!
//! Two implementations ship here:
//!
//! - [`rpc::RpcOracle`] - JSON-RPC 2.0 over HTTP, with [`retry`] backoff
//! - [`fake::FakeOracle`] - deterministic in-memory rewrite table for tests
//!
//! # Execution Results
//!
//! | Halt reason | Meaning |
//! |-------------|---------|
//! | `DepthReached` | `max_depth` steps were taken |
//! | `Branch` | more than one rule applies; candidates in priority order |
//! | `Stuck` | no rule applies |
//! | `HaltTagHit` | a rule carrying one of the halt tags fired |
//!
//! # Error Handling
//!
//! Every failure is an [`OracleError`]. Timeouts are applied by the caller
//! around each call so that a single budget covers retries as well.

pub mod fake;
pub mod retry;
pub mod rpc;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use reach_types;
use reach_types::{State, Substitution, Term};

pub use fake::{FakeOracle, FakeRule};
pub use rpc::{RpcOracle, RpcSettings};

pub type OracleFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, OracleError>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    DepthReached,
    Branch(Vec<State>),
    Stuck,
    HaltTagHit(String),
}

/// Result of [`Oracle::execute_steps`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    /// State after each step taken, in order.
    pub steps: Vec<State>,
    pub halt: HaltReason,
}

impl Execution {
    #[must_use]
    pub fn depth(&self) -> u32 {
        u32::try_from(self.steps.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn last(&self) -> Option<&State> {
        self.steps.last()
    }
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("connection to oracle failed after {attempts} attempt(s): {source}")]
    Connection {
        attempts: u32,
        source: reqwest::Error,
    },
    #[error("oracle returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("oracle error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed oracle response: {0}")]
    Protocol(String),
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// The external rewrite and decision engine.
pub trait Oracle: Send + Sync {
    /// Short name used in log fields.
    fn name(&self) -> &'static str;

    fn execute_steps<'a>(
        &'a self,
        state: &'a State,
        max_depth: u32,
        halt_tags: &'a [String],
    ) -> OracleFut<'a, Execution>;

    /// `Some` when `antecedent` entails `consequent`, with the witnessing
    /// substitution for the consequent's variables.
    fn implies<'a>(
        &'a self,
        antecedent: &'a State,
        consequent: &'a State,
    ) -> OracleFut<'a, Option<Substitution>>;

    fn simplify<'a>(&'a self, term: &'a Term, constraint: &'a Term) -> OracleFut<'a, Term>;
}
