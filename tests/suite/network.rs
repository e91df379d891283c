//! Sessions backed by the JSON-RPC oracle.

use std::time::Duration;

use reach_engine::{
    Mutation, ProcessResult, ProcessStatus, ReachError, Session, SessionSettings, Term, rpc_oracle,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{init_tracing, mount_rpc, pc, settings, state_json};

fn rpc_settings(server: &MockServer) -> SessionSettings {
    SessionSettings {
        oracle_endpoint: format!("{}/rpc", server.uri()),
        oracle_timeout: Duration::from_secs(2),
        max_retries: 0,
        ..settings()
    }
}

#[tokio::test]
async fn step_over_rpc_oracle() {
    init_tracing();
    let server = MockServer::start().await;
    let top = Term::top();
    mount_rpc(
        &server,
        "execute",
        json!({ "reason": "depth-bound", "steps": [state_json(&pc("1"), &top)] }),
    )
    .await;
    mount_rpc(&server, "implies", json!({ "valid": false })).await;

    let settings = rpc_settings(&server);
    let oracle = rpc_oracle(&settings).unwrap();
    let s = Session::load(settings, oracle, &pc("0"), &Default::default());
    let n0 = s.init().await;

    let ProcessResult::Step(out) = s
        .run(Mutation::Step {
            node: n0,
            branch: false,
            depth: None,
        })
        .await
        .unwrap()
    else {
        panic!("expected step result");
    };
    assert_eq!(out.steps, 1);
    assert_eq!(s.node(out.new_nodes[0]).await.unwrap().term, pc("1"));
}

#[tokio::test]
async fn server_error_fails_the_process() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let settings = rpc_settings(&server);
    let oracle = rpc_oracle(&settings).unwrap();
    let s = Session::load(settings, oracle, &pc("0"), &Default::default());
    let n0 = s.init().await;

    let id = s.step(n0, false, None);
    let process = s.wait(id, Duration::from_secs(5)).await.unwrap();
    assert_eq!(process.status, ProcessStatus::Error);
    assert!(
        matches!(process.error, Some(ReachError::OracleUnavailable(ref msg)) if msg.contains("503")),
        "{:?}",
        process.error
    );
    assert_eq!(s.nodes(None).await.len(), 1);
}
