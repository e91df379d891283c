//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use reach_engine::{FakeOracle, FakeRule, Graph, Session, SessionSettings, State, Term};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static TRACING: Once = Once::new();

/// Route engine logs to the test writer; filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn tok(value: &str) -> Term {
    Term::token(value)
}

pub fn pc(n: &str) -> Term {
    Term::apply("pc", vec![tok(n)])
}

/// `X <= 5`
pub fn le5() -> Term {
    Term::apply("_<=Int_", vec![Term::var("X"), tok("5")])
}

/// `pc(0) -> pc(1) -> pc(2)`, then `pc(3)` when `X <= 5` and `pc(4)` otherwise.
pub fn fork_rules() -> Vec<FakeRule> {
    vec![
        FakeRule::new(pc("0"), pc("1")),
        FakeRule::new(pc("1"), pc("2")),
        FakeRule::new(pc("2"), pc("3")).guarded(le5()),
        FakeRule::new(pc("2"), pc("4")).guarded(Term::not(le5())),
    ]
}

/// `n(K) -> n(s(K))` forever.
pub fn counter_rules() -> Vec<FakeRule> {
    vec![FakeRule::new(
        Term::apply("n", vec![Term::var("K")]),
        Term::apply("n", vec![Term::apply("s", vec![Term::var("K")])]),
    )]
}

pub fn settings() -> SessionSettings {
    SessionSettings {
        oracle_timeout: Duration::from_secs(2),
        build_max_depth: 50,
        ..SessionSettings::default()
    }
}

/// A session over a fake oracle, starting at `init`.
pub fn fake_session(
    settings: SessionSettings,
    oracle: FakeOracle,
    init: Term,
) -> (Session, Arc<FakeOracle>) {
    init_tracing();
    let oracle = Arc::new(oracle);
    let session = Session::new(settings, oracle.clone(), Graph::new(State::unconstrained(init)));
    (session, oracle)
}

pub fn state_json(term: &Term, constraint: &Term) -> Value {
    json!({ "term": term, "constraint": constraint })
}

/// Answer every JSON-RPC call for `rpc_method` with `result`.
pub async fn mount_rpc(server: &MockServer, rpc_method: &str, result: Value) {
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": result
        })))
        .mount(server)
        .await;
}
