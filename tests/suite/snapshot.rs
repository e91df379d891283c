//! Snapshot export and reload.

use std::sync::Arc;

use reach_engine::{FakeOracle, GraphSnapshot, ProcessResult, ReachError, Session, State, Term};

use crate::common::{fake_session, fork_rules, le5, pc, settings};

#[tokio::test]
async fn reload_preserves_renderings_and_counters() {
    let (s, oracle) = fake_session(settings(), FakeOracle::new(fork_rules()), pc("0"));
    let n0 = s.init().await;
    let stepped = s.step(n0, true, Some(10));
    s.outcome(stepped).await.unwrap();
    let n1 = s.resolve_ref("#frontier").await.unwrap();
    s.add_alias("left", n1).await.unwrap();
    s.set_target(State::new(pc("3"), le5())).await.unwrap();

    let json = s.snapshot().await.to_json().unwrap();
    let restored = Session::load_raw(settings(), oracle, &json).unwrap();

    assert_eq!(restored.snapshot().await, s.snapshot().await);
    assert_eq!(restored.dot().await, s.dot().await);
    assert_eq!(restored.tree().await, s.tree().await);
    assert_eq!(restored.resolve("left").await.unwrap(), n1);

    let before = s.snapshot().await;
    let max_node = before.nodes.iter().map(|n| n.id).max().unwrap();
    let fresh = restored.resolve_ref("#frontier").await.unwrap();
    let condition = Term::apply("_==Int_", vec![Term::var("Y"), Term::token("0")]);
    let split = restored.case_split(fresh, condition);
    let ProcessResult::CaseSplit(out) = restored.outcome(split).await.unwrap() else {
        panic!("expected case split result");
    };
    assert!(out.positive > max_node && out.negative > max_node);
    restored.check_invariants().await.unwrap();
}

#[tokio::test]
async fn bare_term_starts_a_fresh_graph() {
    let term = pc("0");
    let json = serde_json::to_string(&term).unwrap();
    let s = Session::load_raw(settings(), Arc::new(FakeOracle::default()), &json).unwrap();
    let init = s.node(s.init().await).await.unwrap();
    assert_eq!(init.term, term);
    assert!(init.constraint.is_top());
    assert_eq!(s.edges(None).await.len(), 0);
}

#[tokio::test]
async fn malformed_input_is_rejected() {
    let oracle = Arc::new(FakeOracle::default());
    let err = Session::load_raw(settings(), oracle.clone(), "{ not json").err().unwrap();
    assert!(matches!(err, ReachError::InvalidSnapshot(_)));

    let mut snapshot: GraphSnapshot = {
        let (s, _) = fake_session(settings(), FakeOracle::default(), Term::token("a"));
        s.snapshot().await
    };
    snapshot.version = 99;
    let json = serde_json::to_string(&snapshot).unwrap();
    let err = Session::load_raw(settings(), oracle, &json).err().unwrap();
    assert!(matches!(err, ReachError::InvalidSnapshot(_)));
}
