//! Session-level behavior: queueing, the step example, rendering.

use std::time::Duration;

use reach_engine::{
    EdgeKind, FakeOracle, FakeRule, Mutation, NodeId, NodeState, ProcessResult, ProcessStatus,
    ReachError, Session,
};

use crate::common::{fake_session, fork_rules, pc, settings};

#[tokio::test]
async fn step_example_then_node_closed() {
    let (s, _) = fake_session(settings(), FakeOracle::new(fork_rules()), pc("0"));
    let n0 = s.init().await;

    let ProcessResult::Step(out) = s
        .run(Mutation::Step {
            node: n0,
            branch: false,
            depth: Some(1),
        })
        .await
        .unwrap()
    else {
        panic!("expected step result");
    };

    assert_eq!(out.new_nodes.len(), 1);
    assert_eq!(out.new_edges.len(), 1);
    let n1 = out.new_nodes[0];
    assert_eq!(s.node(n1).await.unwrap().term, pc("1"));
    let edge = s.edge(out.new_edges[0]).await.unwrap();
    assert_eq!((edge.source, edge.target, edge.depth), (n0, n1, 1));

    let again = s.step(n0, false, Some(1));
    let p = s.wait(again, Duration::from_secs(5)).await.unwrap();
    assert_eq!(p.status, ProcessStatus::Error);
    assert_eq!(
        p.error,
        Some(ReachError::NodeClosed {
            node: n0,
            state: NodeState::Expanded
        })
    );
}

#[tokio::test]
async fn mutations_apply_in_arrival_order() {
    let oracle = FakeOracle::new(fork_rules()).with_latency(Duration::from_millis(20));
    let (s, _) = fake_session(settings(), oracle, pc("0"));

    // Each step targets the node created by the previous one.
    let ids: Vec<_> = (0..3)
        .map(|n| s.step(NodeId::new(n), false, Some(1)))
        .collect();

    for (n, id) in ids.into_iter().enumerate() {
        let ProcessResult::Step(out) = s.outcome(id).await.unwrap() else {
            panic!("expected step result");
        };
        assert_eq!(out.new_nodes, vec![NodeId::new(n as u64 + 1)]);
    }
    let last = s.node(NodeId::new(3)).await.unwrap();
    // pc(2) forks; without branching the first candidate is followed.
    assert_eq!(last.term, pc("3"));
}

#[tokio::test]
async fn renderings_are_stable_without_mutation() {
    let (s, _) = fake_session(settings(), FakeOracle::new(fork_rules()), pc("0"));
    let n0 = s.init().await;
    s.run(Mutation::Step {
        node: n0,
        branch: true,
        depth: Some(10),
    })
    .await
    .unwrap();

    let (dot, tree) = (s.dot().await, s.tree().await);
    assert_eq!(dot, s.dot().await);
    assert_eq!(tree, s.tree().await);
    assert!(dot.starts_with("digraph proof {\n"));
    assert_eq!(tree.lines().count(), 4);
}

#[tokio::test]
async fn diff_shows_changed_lines() {
    let (s, _) = fake_session(settings(), FakeOracle::new(fork_rules()), pc("0"));
    let n0 = s.init().await;
    let ProcessResult::Step(out) = s
        .run(Mutation::Step {
            node: n0,
            branch: false,
            depth: Some(1),
        })
        .await
        .unwrap()
    else {
        panic!("expected step result");
    };

    let diff = s.diff(n0, out.new_nodes[0]).await.unwrap();
    assert!(diff.contains("- pc(0)"), "{diff}");
    assert!(diff.contains("+ pc(1)"), "{diff}");
    assert_eq!(s.diff(n0, n0).await.unwrap(), "");
}

#[tokio::test]
async fn references_resolve_through_the_session() {
    let (s, _) = fake_session(settings(), FakeOracle::new(fork_rules()), pc("0"));
    let n0 = s.init().await;
    assert_eq!(s.resolve_ref("#init").await.unwrap(), n0);
    assert_eq!(s.resolve_ref("#frontier").await.unwrap(), n0);
    assert!(matches!(
        s.resolve_ref("@nobody").await,
        Err(ReachError::NotFound(_))
    ));
    assert!(s.tag_node(n0, "interesting").await.unwrap());
    assert_eq!(s.nodes(Some("interesting")).await.len(), 1);
    assert!(s.untag_node(n0, "interesting").await.unwrap());
}

async fn step_node(s: &Session, node: NodeId, branch: bool) -> Vec<NodeId> {
    let ProcessResult::Step(out) = s
        .run(Mutation::Step {
            node,
            branch,
            depth: Some(1),
        })
        .await
        .unwrap()
    else {
        panic!("expected step result");
    };
    out.new_nodes
}

#[tokio::test]
async fn converging_branches_are_covered_by_an_existing_node() {
    // pc(r) forks to pc(a) and pc(b); both continue to pc(j).
    let rules = vec![
        FakeRule::new(pc("r"), pc("a")),
        FakeRule::new(pc("r"), pc("b")),
        FakeRule::new(pc("a"), pc("j")),
        FakeRule::new(pc("b"), pc("j")),
    ];
    let (s, _) = fake_session(settings(), FakeOracle::new(rules), pc("r"));
    let root = s.init().await;

    let children = step_node(&s, root, true).await;
    let [a, b] = children[..] else {
        panic!("expected two children, got {children:?}");
    };
    let joined = step_node(&s, a, false).await;
    assert_eq!(joined.len(), 1);
    assert!(step_node(&s, b, false).await.is_empty());

    let j_nodes: Vec<_> = s
        .nodes(None)
        .await
        .into_iter()
        .filter(|n| n.term == pc("j"))
        .collect();
    assert_eq!(j_nodes.len(), 1);
    assert_eq!(s.node_state(b).await.unwrap(), NodeState::Covered);

    // The cover edge points across the tree, not up it.
    let cover: Vec<_> = s
        .edges(None)
        .await
        .into_iter()
        .filter(|e| e.kind == EdgeKind::Cover)
        .collect();
    assert_eq!(cover.len(), 1);
    assert_eq!((cover[0].source, cover[0].target), (b, joined[0]));
    assert!(s.paths_between(joined[0], b, true).await.unwrap().is_empty());
    s.check_invariants().await.unwrap();
}
