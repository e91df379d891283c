//! Path queries, sectioning, and the proof summary.

use reach_engine::{
    FakeOracle, Mutation, NodeId, ProcessResult, ProofStatus, ReachError, Session, State, Term,
};

use crate::common::{fake_session, fork_rules, le5, pc, settings};

/// Step from init through the fork; returns (pre-branch node, X <= 5 child, other child).
async fn forked() -> (Session, [NodeId; 3]) {
    let (s, _) = fake_session(settings(), FakeOracle::new(fork_rules()), pc("0"));
    let ProcessResult::Step(out) = s
        .run(Mutation::Step {
            node: s.init().await,
            branch: true,
            depth: Some(10),
        })
        .await
        .unwrap()
    else {
        panic!("expected step result");
    };
    let [pre, low, high] = out.new_nodes[..] else {
        panic!("expected three nodes, got {:?}", out.new_nodes);
    };
    (s, [pre, low, high])
}

#[tokio::test]
async fn sectioned_edge_lengthens_the_path() {
    let (s, [pre, low, _]) = forked().await;
    let n0 = s.init().await;
    let before = s.paths_between(n0, low, false).await.unwrap();
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].len(), 2);
    let long_edge = before[0][0];

    let ProcessResult::Section(out) = s
        .run(Mutation::Section {
            edge: long_edge,
            sections: 2,
        })
        .await
        .unwrap()
    else {
        panic!("expected section result");
    };
    assert_eq!(s.node(out.nodes[0]).await.unwrap().term, pc("1"));
    assert!(matches!(s.edge(long_edge).await, Err(ReachError::NotFound(_))));

    let shortest = s.shortest_path_between(n0, low).await.unwrap().unwrap();
    assert_eq!(shortest.len(), 3);
    assert_eq!(&shortest[..2], &out.edges[..]);
    assert_eq!(s.path_constraint(low).await.unwrap(), le5());
    assert_eq!(s.edge(out.edges[1]).await.unwrap().target, pre);
    s.check_invariants().await.unwrap();
}

#[tokio::test]
async fn sectioning_a_branch_edge_is_rejected() {
    let (s, [pre, low, _]) = forked().await;
    let branch = s.shortest_path_between(pre, low).await.unwrap().unwrap()[0];
    let err = s
        .run(Mutation::Section {
            edge: branch,
            sections: 2,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReachError::InvalidArgument(_)), "{err:?}");
}

#[tokio::test]
async fn proof_summary_tracks_open_and_failing_leaves() {
    let (s, [_, low, high]) = forked().await;
    let summary = s.proof_summary().await;
    assert_eq!(summary.status, ProofStatus::Pending);
    assert_eq!(summary.pending, vec![low, high]);

    let target = s.set_target(State::unconstrained(pc("3"))).await.unwrap();
    s.run(Mutation::Build {
        source: low,
        target,
        max_depth: None,
    })
    .await
    .unwrap();
    let summary = s.proof_summary().await;
    assert_eq!(summary.status, ProofStatus::Pending);
    assert_eq!(summary.pending, vec![high]);
    assert!(summary.target_reached);

    // pc(4) has no rule, so the other branch is a dead end.
    s.run(Mutation::Step {
        node: high,
        branch: false,
        depth: None,
    })
    .await
    .unwrap();
    let summary = s.proof_summary().await;
    assert_eq!(summary.status, ProofStatus::Failed);
    assert_eq!(summary.failing, vec![high]);
    assert!(summary.pending.is_empty());
    assert_eq!(summary.nodes, 5);
}

#[tokio::test]
async fn path_constraint_of_unreachable_node_is_an_error() {
    let (s, _) = forked().await;
    let target = s.set_target(State::unconstrained(Term::token("goal"))).await.unwrap();
    assert!(matches!(
        s.path_constraint(target).await,
        Err(ReachError::InvalidArgument(_))
    ));
}
