//! JSON-RPC 2.0 oracle client.
//!
//! Each trait call is one POST to the configured endpoint:
//!
//! ```json
//! {"jsonrpc": "2.0", "id": 7, "method": "execute",
//!  "params": {"state": {...}, "max-depth": 1, "halt-tags": []}}
//! ```
//!
//! | Method | Params | Result |
//! |--------|--------|--------|
//! | `execute` | `state`, `max-depth`, `halt-tags` | `reason`, `steps`, `next-states`, `rule-tag` |
//! | `implies` | `antecedent`, `consequent` | `valid`, `substitution` |
//! | `simplify` | `term`, `constraint` | `term` |

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reach_types::{State, Substitution, Term};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::retry::{self, RetryConfig, RetryOutcome};
use crate::{Execution, HaltReason, Oracle, OracleError, OracleFut};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:42412/rpc";

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;
const TCP_KEEPALIVE_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct RpcSettings {
    /// Per-attempt HTTP timeout.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }
}

pub struct RpcOracle {
    client: reqwest::Client,
    endpoint: String,
    retry: RetryConfig,
    next_id: AtomicU64,
}

impl std::fmt::Debug for RpcOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcOracle")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl RpcOracle {
    pub fn new(endpoint: impl Into<String>, settings: &RpcSettings) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| OracleError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            retry: settings.retry.clone(),
            next_id: AtomicU64::new(1),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<P, R>(&self, method: &'static str, params: P) -> Result<R, OracleError>
    where
        P: Serialize + Send + Sync,
        R: DeserializeOwned + Send,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let outcome =
            retry::send_with_retry(|| self.client.post(&self.endpoint).json(&body), &self.retry)
                .await;
        let response = match outcome {
            RetryOutcome::Success(response) => response,
            RetryOutcome::HttpError(response) => {
                let status = response.status().as_u16();
                let body = read_capped_body(response).await;
                tracing::warn!(status, method, "Oracle returned error status");
                return Err(OracleError::Http { status, body });
            }
            RetryOutcome::ConnectionError { attempts, source } => {
                tracing::warn!(%source, attempts, method, "Oracle connection failed");
                return Err(OracleError::Connection { attempts, source });
            }
        };

        let envelope: RpcResponse<R> = response
            .json()
            .await
            .map_err(|e| OracleError::Protocol(format!("{method}: {e}")))?;
        if let Some(error) = envelope.error {
            return Err(OracleError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        if let Some(got) = envelope.id
            && got != id
        {
            return Err(OracleError::Protocol(format!(
                "{method}: response id {got} does not match request id {id}"
            )));
        }
        envelope.result.ok_or_else(|| {
            OracleError::Protocol(format!("{method}: response has neither result nor error"))
        })
    }
}

async fn read_capped_body(response: reqwest::Response) -> String {
    let mut text = response.text().await.unwrap_or_default();
    if text.len() > MAX_ERROR_BODY_BYTES {
        let mut cut = MAX_ERROR_BODY_BYTES;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}

impl Oracle for RpcOracle {
    fn name(&self) -> &'static str {
        "rpc"
    }

    fn execute_steps<'a>(
        &'a self,
        state: &'a State,
        max_depth: u32,
        halt_tags: &'a [String],
    ) -> OracleFut<'a, Execution> {
        Box::pin(async move {
            let result: ExecuteResult = self
                .call(
                    "execute",
                    ExecuteParams {
                        state,
                        max_depth,
                        halt_tags,
                    },
                )
                .await?;
            result.into_execution()
        })
    }

    fn implies<'a>(
        &'a self,
        antecedent: &'a State,
        consequent: &'a State,
    ) -> OracleFut<'a, Option<Substitution>> {
        Box::pin(async move {
            let result: ImpliesResult = self
                .call(
                    "implies",
                    ImpliesParams {
                        antecedent,
                        consequent,
                    },
                )
                .await?;
            Ok(result.valid.then_some(result.substitution))
        })
    }

    fn simplify<'a>(&'a self, term: &'a Term, constraint: &'a Term) -> OracleFut<'a, Term> {
        Box::pin(async move {
            let result: SimplifyResult = self
                .call("simplify", SimplifyParams { term, constraint })
                .await?;
            Ok(result.term)
        })
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    #[serde(default)]
    id: Option<u64>,
    result: Option<R>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct ExecuteParams<'a> {
    state: &'a State,
    max_depth: u32,
    halt_tags: &'a [String],
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum StopReason {
    DepthBound,
    Branching,
    Stuck,
    HaltTag,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ExecuteResult {
    reason: StopReason,
    #[serde(default)]
    steps: Vec<State>,
    #[serde(default)]
    next_states: Vec<State>,
    #[serde(default)]
    rule_tag: Option<String>,
}

impl ExecuteResult {
    fn into_execution(self) -> Result<Execution, OracleError> {
        let halt = match self.reason {
            StopReason::DepthBound => HaltReason::DepthReached,
            StopReason::Stuck => HaltReason::Stuck,
            StopReason::Branching if self.next_states.is_empty() => {
                return Err(OracleError::Protocol(
                    "execute: branching result without next-states".into(),
                ));
            }
            StopReason::Branching => HaltReason::Branch(self.next_states),
            StopReason::HaltTag => HaltReason::HaltTagHit(self.rule_tag.ok_or_else(|| {
                OracleError::Protocol("execute: halt-tag result without rule-tag".into())
            })?),
        };
        Ok(Execution {
            steps: self.steps,
            halt,
        })
    }
}

#[derive(Serialize)]
struct ImpliesParams<'a> {
    antecedent: &'a State,
    consequent: &'a State,
}

#[derive(Deserialize)]
struct ImpliesResult {
    valid: bool,
    #[serde(default)]
    substitution: Substitution,
}

#[derive(Serialize)]
struct SimplifyParams<'a> {
    term: &'a Term,
    constraint: &'a Term,
}

#[derive(Deserialize)]
struct SimplifyResult {
    term: Term,
}
