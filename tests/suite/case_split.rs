//! Case splitting and re-verification of the resulting edges.

use reach_engine::reach_oracle::fake::entails;
use reach_engine::{FakeOracle, Mutation, ProcessResult, State, Term, tags};

use crate::common::{fake_session, le5, pc, settings, tok};

#[tokio::test]
async fn split_children_entail_their_case() {
    let (s, _) = fake_session(settings(), FakeOracle::new(Vec::new()), pc("0"));
    let n0 = s.init().await;

    let ProcessResult::CaseSplit(out) = s
        .run(Mutation::CaseSplit {
            node: n0,
            condition: le5(),
        })
        .await
        .unwrap()
    else {
        panic!("expected case split result");
    };

    let pos = s.node(out.positive).await.unwrap();
    let neg = s.node(out.negative).await.unwrap();
    assert!(entails(&pos.state(), &State::new(pc("0"), le5())).is_some());
    assert!(entails(&neg.state(), &State::new(pc("0"), Term::not(le5()))).is_some());
    assert!(entails(&pos.state(), &State::new(pc("0"), Term::not(le5()))).is_none());

    for edge in [out.positive_edge, out.negative_edge] {
        let edge = s.edge(edge).await.unwrap();
        assert_eq!(edge.source, n0);
        assert!(edge.tags.contains(tags::BRANCH));
    }

    let id = s.verify_edges(vec![out.positive_edge, out.negative_edge]);
    let ProcessResult::Verify(verdicts) = s.outcome(id).await.unwrap() else {
        panic!("expected verify result");
    };
    assert_eq!(verdicts.len(), 2);
    assert!(verdicts.iter().all(|v| v.passed()), "{verdicts:?}");
}

#[tokio::test]
async fn split_law_holds_under_an_existing_constraint() {
    let base = Term::apply("_>=Int_", vec![Term::var("X"), tok("0")]);
    let (s, _) = fake_session(settings(), FakeOracle::new(Vec::new()), pc("0"));
    let n0 = s.init().await;
    let ProcessResult::CaseSplit(first) = s
        .run(Mutation::CaseSplit {
            node: n0,
            condition: base.clone(),
        })
        .await
        .unwrap()
    else {
        panic!("expected case split result");
    };

    let ProcessResult::CaseSplit(second) = s
        .run(Mutation::CaseSplit {
            node: first.positive,
            condition: le5(),
        })
        .await
        .unwrap()
    else {
        panic!("expected case split result");
    };

    assert_eq!(
        s.node(second.positive).await.unwrap().constraint,
        Term::and(base.clone(), le5())
    );
    assert_eq!(
        s.node(second.negative).await.unwrap().constraint,
        Term::and(base, Term::not(le5()))
    );
    assert_eq!(s.nodes(Some(tags::VACUOUS)).await.len(), 0);
}

#[tokio::test]
async fn contradictory_case_is_surfaced_not_dropped() {
    let (s, _) = fake_session(settings(), FakeOracle::new(Vec::new()), pc("0"));
    let n0 = s.init().await;
    let ProcessResult::CaseSplit(first) = s
        .run(Mutation::CaseSplit {
            node: n0,
            condition: le5(),
        })
        .await
        .unwrap()
    else {
        panic!("expected case split result");
    };
    let ProcessResult::CaseSplit(again) = s
        .run(Mutation::CaseSplit {
            node: first.positive,
            condition: le5(),
        })
        .await
        .unwrap()
    else {
        panic!("expected case split result");
    };

    let vacuous = s.nodes(Some(tags::VACUOUS)).await;
    assert_eq!(vacuous.len(), 1);
    assert_eq!(vacuous[0].id, again.negative);
    assert!(vacuous[0].constraint.is_bottom());
}
