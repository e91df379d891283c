//! Deterministic in-memory oracle.
//!
//! Semantics are a rewrite table: each [`FakeRule`] rewrites any term matching
//! `from` into `to` when its guard is consistent with the current constraint.
//! The successor's constraint is the (normalized) conjunction of the two;
//! successors whose constraint collapses to bottom are infeasible and dropped.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use reach_types::{State, Substitution, Term};

use crate::{Execution, HaltReason, Oracle, OracleError, OracleFut};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeRule {
    pub from: Term,
    pub to: Term,
    pub guard: Term,
    pub tag: Option<String>,
}

impl FakeRule {
    #[must_use]
    pub fn new(from: Term, to: Term) -> Self {
        Self {
            from,
            to,
            guard: Term::top(),
            tag: None,
        }
    }

    #[must_use]
    pub fn guarded(mut self, guard: Term) -> Self {
        self.guard = guard;
        self
    }

    #[must_use]
    pub fn tagged(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }
}

pub struct FakeOracle {
    rules: Vec<FakeRule>,
    latency: Option<Duration>,
    available: AtomicBool,
    fail_after: AtomicUsize,
    calls: AtomicUsize,
}

impl Default for FakeOracle {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FakeOracle {
    #[must_use]
    pub fn new(rules: Vec<FakeRule>) -> Self {
        Self {
            rules,
            latency: None,
            available: AtomicBool::new(true),
            fail_after: AtomicUsize::new(usize::MAX),
            calls: AtomicUsize::new(0),
        }
    }

    /// Delay every reply by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Succeed for the next `calls` calls, then fail every call after.
    pub fn fail_after(&self, calls: usize) {
        let seen = self.calls.load(Ordering::SeqCst);
        self.fail_after
            .store(seen.saturating_add(calls), Ordering::SeqCst);
    }

    /// Calls received so far, including failed ones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn admit(&self) -> Result<(), OracleError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if !self.available.load(Ordering::SeqCst) || n >= self.fail_after.load(Ordering::SeqCst) {
            return Err(OracleError::Unavailable("fake oracle is switched off".into()));
        }
        Ok(())
    }

    /// Feasible one-step successors in rule order, with the firing rule's tag.
    fn successors(&self, state: &State) -> Vec<(State, Option<&str>)> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let subst = rule.from.match_onto(&state.term)?;
                let guard = rule.guard.substitute(&subst);
                let constraint = normalize(&Term::and(state.constraint.clone(), guard));
                if constraint.is_bottom() {
                    return None;
                }
                Some((
                    State::new(rule.to.substitute(&subst), constraint),
                    rule.tag.as_deref(),
                ))
            })
            .collect()
    }

    fn run(&self, state: &State, max_depth: u32, halt_tags: &[String]) -> Execution {
        let mut steps: Vec<State> = Vec::new();
        let mut current = state.clone();
        loop {
            if steps.len() >= max_depth as usize {
                return Execution {
                    steps,
                    halt: HaltReason::DepthReached,
                };
            }
            let mut next = self.successors(&current);
            match next.len() {
                0 => {
                    return Execution {
                        steps,
                        halt: HaltReason::Stuck,
                    };
                }
                1 => {
                    let (successor, tag) = next.remove(0);
                    steps.push(successor.clone());
                    if let Some(tag) = tag
                        && halt_tags.iter().any(|t| t == tag)
                    {
                        return Execution {
                            steps,
                            halt: HaltReason::HaltTagHit(tag.to_string()),
                        };
                    }
                    current = successor;
                }
                _ => {
                    return Execution {
                        steps,
                        halt: HaltReason::Branch(next.into_iter().map(|(s, _)| s).collect()),
                    };
                }
            }
        }
    }
}

/// Whether `antecedent` entails `consequent` under this table's logic: the
/// consequent term matches as a pattern and each of its conjuncts appears in
/// the antecedent. A bottom antecedent entails everything.
#[must_use]
pub fn entails(antecedent: &State, consequent: &State) -> Option<Substitution> {
    let have = normalize(&antecedent.constraint);
    if have.is_bottom() {
        return Some(Substitution::new());
    }
    let subst = consequent.term.match_onto(&antecedent.term)?;
    let need = normalize(&consequent.constraint.substitute(&subst));
    let have: BTreeSet<&Term> = have.conjuncts().into_iter().collect();
    need.conjuncts()
        .into_iter()
        .all(|c| have.contains(c))
        .then_some(subst)
}

/// Flatten, drop duplicates, and fold `P /\ not P` to bottom.
#[must_use]
pub fn normalize(term: &Term) -> Term {
    let mut seen: BTreeSet<&Term> = BTreeSet::new();
    let mut kept: Vec<Term> = Vec::new();
    for c in term.conjuncts() {
        if c.is_false() {
            return Term::bottom();
        }
        if seen.insert(c) {
            kept.push(c.clone());
        }
    }
    let contradiction = kept.iter().any(|c| {
        c.negated().is_some_and(|inner| seen.contains(inner))
    });
    if contradiction {
        return Term::bottom();
    }
    Term::conjunction(kept)
}

impl Oracle for FakeOracle {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn execute_steps<'a>(
        &'a self,
        state: &'a State,
        max_depth: u32,
        halt_tags: &'a [String],
    ) -> OracleFut<'a, Execution> {
        Box::pin(async move {
            self.admit().await?;
            Ok(self.run(state, max_depth, halt_tags))
        })
    }

    fn implies<'a>(
        &'a self,
        antecedent: &'a State,
        consequent: &'a State,
    ) -> OracleFut<'a, Option<Substitution>> {
        Box::pin(async move {
            self.admit().await?;
            Ok(entails(antecedent, consequent))
        })
    }

    fn simplify<'a>(&'a self, term: &'a Term, constraint: &'a Term) -> OracleFut<'a, Term> {
        Box::pin(async move {
            self.admit().await?;
            if normalize(constraint).is_bottom() {
                return Ok(Term::bottom());
            }
            Ok(normalize(term))
        })
    }
}
