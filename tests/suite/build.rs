//! Building summary edges toward a target.

use reach_engine::{
    FakeOracle, Mutation, ProcessResult, ReachError, SessionSettings, State, Term, tags,
};

use crate::common::{counter_rules, fake_session, fork_rules, pc, settings};

#[tokio::test]
async fn exhausted_build_leaves_explored_nodes_only() {
    let (s, _) = fake_session(
        SessionSettings {
            build_max_depth: 4,
            ..settings()
        },
        FakeOracle::new(counter_rules()),
        Term::apply("n", vec![Term::token("z")]),
    );
    let n0 = s.init().await;
    let target = s.set_target(State::unconstrained(Term::token("done"))).await.unwrap();

    let err = s
        .run(Mutation::Build {
            source: n0,
            target,
            max_depth: None,
        })
        .await
        .unwrap_err();
    let ReachError::Exhausted { depth, frontier } = err else {
        panic!("expected Exhausted, got {err:?}");
    };
    assert_eq!(depth, 4);
    assert_ne!(frontier, n0);

    // init, four explored nodes, and the detached target.
    assert_eq!(s.nodes(None).await.len(), 6);
    assert!(s.edges(None).await.iter().all(|e| e.target != target));
    s.check_invariants().await.unwrap();
}

#[tokio::test]
async fn build_records_one_summary_edge() {
    let (s, _) = fake_session(settings(), FakeOracle::new(fork_rules()), pc("0"));
    let n0 = s.init().await;
    let target = s.set_target(State::unconstrained(pc("2"))).await.unwrap();

    let ProcessResult::Build(out) = s
        .run(Mutation::Build {
            source: n0,
            target,
            max_depth: None,
        })
        .await
        .unwrap()
    else {
        panic!("expected build result");
    };

    assert_eq!(out.depth, 2);
    let built = s.edges(Some(tags::BUILT)).await;
    assert_eq!(built.len(), 1);
    assert_eq!((built[0].source, built[0].target), (n0, target));
    assert_eq!(built[0].id, out.edge);
    assert_eq!(s.nodes(None).await.len(), 4);

    // A second build follows the recorded path and adds another summary edge.
    let ProcessResult::Build(again) = s
        .run(Mutation::Build {
            source: n0,
            target,
            max_depth: None,
        })
        .await
        .unwrap()
    else {
        panic!("expected build result");
    };
    assert!(again.new_nodes.is_empty());
    assert_eq!(s.edges(Some(tags::BUILT)).await.len(), 2);
}

#[tokio::test]
async fn build_stops_at_forks_and_dead_ends() {
    let (s, _) = fake_session(settings(), FakeOracle::new(fork_rules()), pc("0"));
    let n0 = s.init().await;
    let target = s.set_target(State::unconstrained(pc("9"))).await.unwrap();
    let err = s
        .run(Mutation::Build {
            source: n0,
            target,
            max_depth: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReachError::Branched { .. }), "{err:?}");

    let (dead, _) = fake_session(settings(), FakeOracle::new(Vec::new()), pc("0"));
    let d0 = dead.init().await;
    let target = dead.set_target(State::unconstrained(pc("9"))).await.unwrap();
    let err = dead
        .run(Mutation::Build {
            source: d0,
            target,
            max_depth: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err, ReachError::Stuck { node: d0 });
    assert!(dead.node(d0).await.unwrap().has_tag(tags::TERMINAL));
}

#[tokio::test]
async fn oracle_failure_mid_build_removes_partial_nodes() {
    let (s, oracle) = fake_session(
        settings(),
        FakeOracle::new(counter_rules()),
        Term::apply("n", vec![Term::token("z")]),
    );
    let n0 = s.init().await;
    let target = s.set_target(State::unconstrained(Term::token("done"))).await.unwrap();
    let before = s.nodes(None).await.len();

    // The first expansion commits, then the oracle drops partway through the second.
    oracle.fail_after(5);
    let err = s
        .run(Mutation::Build {
            source: n0,
            target,
            max_depth: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReachError::OracleUnavailable(_)), "{err:?}");
    assert_eq!(s.nodes(None).await.len(), before);
    assert_eq!(before, 2);
    assert!(s.edges(None).await.is_empty());
    s.check_invariants().await.unwrap();
}

#[tokio::test]
async fn build_back_to_an_ancestor_makes_no_oracle_calls() {
    let (s, oracle) = fake_session(settings(), FakeOracle::new(fork_rules()), pc("0"));
    let n0 = s.init().await;
    let ProcessResult::Step(out) = s
        .run(Mutation::Step {
            node: n0,
            branch: false,
            depth: Some(2),
        })
        .await
        .unwrap()
    else {
        panic!("expected step result");
    };
    let end = out.new_nodes[0];
    let calls = oracle.calls();

    let err = s
        .run(Mutation::Build {
            source: end,
            target: n0,
            max_depth: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err, ReachError::CycleRejected { from: end, to: n0 });
    assert_eq!(oracle.calls(), calls);
}
