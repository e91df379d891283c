//! Process lifecycle as seen through a session.

use std::time::Duration;

use reach_engine::{
    FakeOracle, Missing, Mutation, NodeId, ProcessResult, ProcessStatus, ReachError,
    SessionSettings, State, Term,
};

use crate::common::{counter_rules, fake_session, fork_rules, pc, settings};

fn counter_start() -> Term {
    Term::apply("n", vec![Term::token("z")])
}

#[tokio::test]
async fn timeout_fails_only_the_inflight_operation() {
    let oracle = FakeOracle::new(fork_rules()).with_latency(Duration::from_millis(500));
    let fast_timeout = SessionSettings {
        oracle_timeout: Duration::from_millis(50),
        ..settings()
    };
    let (s, _) = fake_session(fast_timeout, oracle, pc("0"));
    let n0 = s.init().await;

    let id = s.step(n0, false, Some(1));
    let p = s.wait(id, Duration::from_secs(5)).await.unwrap();
    assert_eq!(p.status, ProcessStatus::Error);
    assert!(matches!(p.error, Some(ReachError::OracleUnavailable(_))));

    // Nothing committed, and the write lock is free again.
    assert_eq!(s.nodes(None).await.len(), 1);
    s.add_alias("root", n0).await.unwrap();
    s.check_invariants().await.unwrap();
}

#[tokio::test]
async fn wait_timeout_returns_current_status() {
    let oracle = FakeOracle::new(fork_rules()).with_latency(Duration::from_millis(300));
    let (s, _) = fake_session(settings(), oracle, pc("0"));
    let id = s.step(s.init().await, false, Some(1));

    let early = s.wait(id, Duration::from_millis(20)).await.unwrap();
    assert!(!early.status.is_settled());

    let late = s.wait(id, Duration::from_secs(5)).await.unwrap();
    assert_eq!(late.status, ProcessStatus::Done);
    assert!(late.started_at.is_some() && late.finished_at.is_some());
}

#[tokio::test]
async fn cancelling_a_queued_mutation_skips_it() {
    let oracle = FakeOracle::new(fork_rules()).with_latency(Duration::from_millis(100));
    let (s, _) = fake_session(settings(), oracle, pc("0"));
    let n0 = s.init().await;

    let first = s.step(n0, false, Some(1));
    let second = s.step(NodeId::new(1), false, Some(1));
    assert!(s.cancel(second).unwrap());
    assert_eq!(s.process(second).unwrap().status, ProcessStatus::Cancelled);

    assert!(matches!(
        s.outcome(first).await,
        Ok(ProcessResult::Step(_))
    ));
    assert_eq!(s.outcome(second).await, Err(ReachError::Cancelled));
    // The cancelled step never ran.
    assert_eq!(s.nodes(None).await.len(), 2);
}

#[tokio::test]
async fn cancelling_a_running_build_keeps_committed_work() {
    let oracle = FakeOracle::new(counter_rules()).with_latency(Duration::from_millis(10));
    let (s, _) = fake_session(
        SessionSettings {
            build_max_depth: 10_000,
            ..settings()
        },
        oracle,
        counter_start(),
    );
    let n0 = s.init().await;
    let target = s.set_target(State::unconstrained(Term::token("never"))).await.unwrap();

    let id = s.build_edges(n0, target, None);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(s.cancel(id).unwrap());

    assert_eq!(s.outcome(id).await, Err(ReachError::Cancelled));
    assert_eq!(s.process(id).unwrap().status, ProcessStatus::Cancelled);
    assert!(s.nodes(None).await.len() > 2);
    s.check_invariants().await.unwrap();

    assert!(!s.cancel(id).unwrap());
}

#[tokio::test]
async fn completed_processes_are_evicted_past_retention() {
    let (s, _) = fake_session(
        SessionSettings {
            retention: 2,
            ..settings()
        },
        FakeOracle::new(fork_rules()),
        pc("0"),
    );
    let n0 = s.init().await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        let id = s.rewind(n0, None);
        s.wait(id, Duration::from_secs(5)).await.unwrap();
        ids.push(id);
    }

    assert_eq!(
        s.process(ids[0]),
        Err(ReachError::NotFound(Missing::Process(ids[0])))
    );
    assert!(s.wait(ids[0], Duration::from_millis(1)).await.is_err());
    assert_eq!(s.processes().len(), 2);
    assert_eq!(s.sweep(), 2);
    assert!(s.processes().is_empty());
}

#[tokio::test]
async fn verify_runs_beside_the_writer() {
    let (s, _) = fake_session(settings(), FakeOracle::new(fork_rules()), pc("0"));
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

    let id = s.verify_edges(out.new_edges.clone());
    let ProcessResult::Verify(verdicts) = s.outcome(id).await.unwrap() else {
        panic!("expected verify result");
    };
    assert_eq!(verdicts.len(), 1);
    assert!(verdicts[0].passed());
    assert_eq!(s.nodes(None).await.len(), 2);
}
