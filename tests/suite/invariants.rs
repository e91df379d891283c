//! Structural invariants survive mixed mutation sequences.

use reach_engine::{FakeOracle, FakeRule, Mutation, NodeState, ProcessResult, Term, tags};

use crate::common::{counter_rules, fake_session, fork_rules, le5, pc, settings};

#[tokio::test]
async fn step_split_rewind_keep_graph_consistent() {
    let (s, _) = fake_session(settings(), FakeOracle::new(fork_rules()), pc("0"));
    let n0 = s.init().await;

    let ProcessResult::Step(first) = s
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
    let n1 = first.new_nodes[0];
    s.check_invariants().await.unwrap();

    let ProcessResult::CaseSplit(split) = s
        .run(Mutation::CaseSplit {
            node: n1,
            condition: le5(),
        })
        .await
        .unwrap()
    else {
        panic!("expected case split result");
    };
    s.check_invariants().await.unwrap();

    for child in [split.positive, split.negative] {
        s.run(Mutation::Step {
            node: child,
            branch: true,
            depth: Some(5),
        })
        .await
        .unwrap();
        s.check_invariants().await.unwrap();
    }

    let ProcessResult::Rewind(rewound) = s
        .run(Mutation::Rewind {
            node: n1,
            depth: None,
        })
        .await
        .unwrap()
    else {
        panic!("expected rewind result");
    };
    assert!(!rewound.removed_nodes.is_empty());
    s.check_invariants().await.unwrap();
    assert_eq!(s.node_state(rewound.node).await.unwrap(), NodeState::Fresh);
    for id in rewound.removed_nodes {
        assert!(s.node(id).await.is_err());
    }
}

#[tokio::test]
async fn cover_edges_close_loops_without_cycles_of_steps() {
    let looping = Term::apply("loop", vec![Term::var("I")]);
    let (s, _) = fake_session(
        settings(),
        FakeOracle::new(vec![FakeRule::new(looping.clone(), looping.clone())]),
        looping,
    );
    let n0 = s.init().await;
    s.run(Mutation::Step {
        node: n0,
        branch: false,
        depth: Some(1),
    })
    .await
    .unwrap();

    assert_eq!(s.node_state(n0).await.unwrap(), NodeState::Covered);
    assert_eq!(s.nodes(None).await.len(), 1);
    s.check_invariants().await.unwrap();

    let (c, _) = fake_session(
        settings(),
        FakeOracle::new(counter_rules()),
        Term::apply("n", vec![Term::token("z")]),
    );
    let c0 = c.init().await;
    c.run(Mutation::Step {
        node: c0,
        branch: false,
        depth: Some(3),
    })
    .await
    .unwrap();
    assert!(c.nodes(Some(tags::TERMINAL)).await.is_empty());
    c.check_invariants().await.unwrap();
}
