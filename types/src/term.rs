//! Terms, constraints, and cell addressing.
//!
//! A [`Term`] is an immutable tree. Constraints are ordinary terms built from
//! the reserved connectives below; [`Term::and`] and [`Term::not`] fold the
//! trivial cases so that structurally equal constraints compare equal.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ReachError;

pub const TOP: &str = "#Top";
pub const BOTTOM: &str = "#Bottom";
pub const AND: &str = "#And";
pub const NOT: &str = "#Not";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "lowercase")]
pub enum Term {
    Var {
        name: String,
    },
    Token {
        value: String,
    },
    Apply {
        label: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<Term>,
    },
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var { name: name.into() }
    }

    pub fn token(value: impl Into<String>) -> Self {
        Self::Token {
            value: value.into(),
        }
    }

    pub fn apply(label: impl Into<String>, args: Vec<Term>) -> Self {
        Self::Apply {
            label: label.into(),
            args,
        }
    }

    pub fn constant(label: impl Into<String>) -> Self {
        Self::apply(label, Vec::new())
    }

    /// A configuration cell: `<name>(children...)`.
    pub fn cell(name: &str, children: Vec<Term>) -> Self {
        Self::apply(format!("<{name}>"), children)
    }

    #[must_use]
    pub fn top() -> Self {
        Self::constant(TOP)
    }

    #[must_use]
    pub fn bottom() -> Self {
        Self::constant(BOTTOM)
    }

    #[must_use]
    pub fn is_top(&self) -> bool {
        self.is_constant(TOP)
    }

    #[must_use]
    pub fn is_bottom(&self) -> bool {
        self.is_constant(BOTTOM)
    }

    /// Bottom, or the literal token `false`.
    #[must_use]
    pub fn is_false(&self) -> bool {
        self.is_bottom() || matches!(self, Self::Token { value } if value == "false")
    }

    fn is_constant(&self, wanted: &str) -> bool {
        matches!(self, Self::Apply { label, args } if label == wanted && args.is_empty())
    }

    #[must_use]
    pub fn and(lhs: Term, rhs: Term) -> Self {
        if lhs.is_top() {
            return rhs;
        }
        if rhs.is_top() {
            return lhs;
        }
        if lhs.is_bottom() || rhs.is_bottom() {
            return Self::bottom();
        }
        Self::apply(AND, vec![lhs, rhs])
    }

    #[must_use]
    pub fn not(inner: Term) -> Self {
        if inner.is_top() {
            return Self::bottom();
        }
        if inner.is_bottom() {
            return Self::top();
        }
        match inner {
            Self::Apply { label, mut args } if label == NOT && args.len() == 1 => args.remove(0),
            other => Self::apply(NOT, vec![other]),
        }
    }

    /// Left fold of `and` over `parts`; empty input yields top.
    pub fn conjunction(parts: impl IntoIterator<Item = Term>) -> Self {
        parts.into_iter().fold(Self::top(), Self::and)
    }

    /// Flattened conjuncts. Top has none.
    #[must_use]
    pub fn conjuncts(&self) -> Vec<&Term> {
        let mut out = Vec::new();
        self.collect_conjuncts(&mut out);
        out
    }

    fn collect_conjuncts<'a>(&'a self, out: &mut Vec<&'a Term>) {
        match self {
            Self::Apply { label, args } if label == AND => {
                for arg in args {
                    arg.collect_conjuncts(out);
                }
            }
            t if t.is_top() => {}
            t => out.push(t),
        }
    }

    /// The operand of a negation, if this is one.
    #[must_use]
    pub fn negated(&self) -> Option<&Term> {
        match self {
            Self::Apply { label, args } if label == NOT && args.len() == 1 => args.first(),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Apply { label, .. } => Some(label),
            _ => None,
        }
    }

    #[must_use]
    pub fn args(&self) -> &[Term] {
        match self {
            Self::Apply { args, .. } => args,
            _ => &[],
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.args().is_empty()
    }

    #[must_use]
    pub fn is_cell(&self, name: &str) -> bool {
        self.label()
            .and_then(|l| l.strip_prefix('<'))
            .and_then(|l| l.strip_suffix('>'))
            == Some(name)
    }

    #[must_use]
    pub fn substitute(&self, subst: &Substitution) -> Term {
        match self {
            Self::Var { name } => subst.get(name).cloned().unwrap_or_else(|| self.clone()),
            Self::Token { .. } => self.clone(),
            Self::Apply { label, args } => Self::Apply {
                label: label.clone(),
                args: args.iter().map(|a| a.substitute(subst)).collect(),
            },
        }
    }

    /// One-way match of `self` (the pattern) onto `subject`.
    ///
    /// Pattern variables bind consistently; the subject is never inspected for
    /// variables of its own.
    #[must_use]
    pub fn match_onto(&self, subject: &Term) -> Option<Substitution> {
        let mut subst = Substitution::new();
        self.match_into(subject, &mut subst).then_some(subst)
    }

    fn match_into(&self, subject: &Term, subst: &mut Substitution) -> bool {
        match (self, subject) {
            (Self::Var { name }, _) => match subst.get(name) {
                Some(bound) => bound == subject,
                None => {
                    subst.insert(name.clone(), subject.clone());
                    true
                }
            },
            (Self::Token { value: a }, Self::Token { value: b }) => a == b,
            (
                Self::Apply {
                    label: la,
                    args: pa,
                },
                Self::Apply {
                    label: lb,
                    args: sa,
                },
            ) => {
                la == lb
                    && pa.len() == sa.len()
                    && pa.iter().zip(sa).all(|(p, s)| p.match_into(s, subst))
            }
            _ => false,
        }
    }

    pub fn at(&self, path: &CellPath) -> Result<&Term, ReachError> {
        let mut current = self;
        for segment in path.segments() {
            let index = current
                .child_index(segment)
                .ok_or_else(|| path.unresolved(segment, current))?;
            current = &current.args()[index];
        }
        Ok(current)
    }

    /// Copy of `self` with the sub-term at `path` replaced.
    pub fn replace_at(&self, path: &CellPath, replacement: Term) -> Result<Term, ReachError> {
        self.replace_segments(path, path.segments(), replacement)
    }

    fn replace_segments(
        &self,
        path: &CellPath,
        segments: &[CellSegment],
        replacement: Term,
    ) -> Result<Term, ReachError> {
        let Some((first, rest)) = segments.split_first() else {
            return Ok(replacement);
        };
        let index = self
            .child_index(first)
            .ok_or_else(|| path.unresolved(first, self))?;
        match self {
            Self::Apply { label, args } => {
                let mut args = args.clone();
                args[index] = args[index].replace_segments(path, rest, replacement)?;
                Ok(Self::Apply {
                    label: label.clone(),
                    args,
                })
            }
            _ => Err(path.unresolved(first, self)),
        }
    }

    fn child_index(&self, segment: &CellSegment) -> Option<usize> {
        let args = self.args();
        match segment {
            CellSegment::Index(i) => (*i < args.len()).then_some(*i),
            CellSegment::Cell(name) => args.iter().position(|a| a.is_cell(name)),
        }
    }

    /// Indented multi-line rendering; an application whose arguments are all
    /// leaves stays on one line.
    #[must_use]
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out
    }

    fn write_pretty(&self, out: &mut String, indent: usize) {
        let pad = "  ".repeat(indent);
        match self {
            Self::Apply { label, args } if args.iter().any(|a| !a.is_leaf()) => {
                out.push_str(&format!("{pad}{label}(\n"));
                for arg in args {
                    arg.write_pretty(out, indent + 1);
                }
                out.push_str(&format!("{pad})\n"));
            }
            _ => out.push_str(&format!("{pad}{self}\n")),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var { name } => f.write_str(name),
            Self::Token { value } => f.write_str(value),
            Self::Apply { label, args } if args.is_empty() => f.write_str(label),
            Self::Apply { label, args } => {
                write!(f, "{label}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

// ============================================================================
// Substitution
// ============================================================================

/// Variable name to term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Substitution(BTreeMap<String, Term>);

impl Substitution {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, term: Term) -> Option<Term> {
        self.0.insert(name.into(), term)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.0.get(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Term)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Term)> for Substitution {
    fn from_iter<I: IntoIterator<Item = (String, Term)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// State
// ============================================================================

/// A symbolic configuration with its path condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub term: Term,
    pub constraint: Term,
}

impl State {
    #[must_use]
    pub fn new(term: Term, constraint: Term) -> Self {
        Self { term, constraint }
    }

    #[must_use]
    pub fn unconstrained(term: Term) -> Self {
        Self::new(term, Term::top())
    }

    /// Pretty term followed by one line per conjunct.
    #[must_use]
    pub fn pretty(&self) -> String {
        let mut out = self.term.pretty();
        for c in self.constraint.conjuncts() {
            out.push_str(&format!("requires {c}\n"));
        }
        out
    }
}

// ============================================================================
// Cell paths
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellSegment {
    /// First child labelled `<name>`.
    Cell(String),
    Index(usize),
}

impl fmt::Display for CellSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell(name) => f.write_str(name),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// `/`-separated address of a sub-term, e.g. `k` or `state/0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellPath(Vec<CellSegment>);

impl CellPath {
    pub fn parse(text: &str) -> Result<Self, ReachError> {
        let invalid = |reason: &str| ReachError::InvalidPath {
            path: text.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty path"));
        }
        let mut segments = Vec::new();
        for raw in trimmed.split('/') {
            let raw = raw.trim();
            if raw.is_empty() {
                return Err(invalid("empty segment"));
            }
            segments.push(match raw.parse::<usize>() {
                Ok(i) => CellSegment::Index(i),
                Err(_) => CellSegment::Cell(raw.to_string()),
            });
        }
        Ok(Self(segments))
    }

    #[must_use]
    pub fn segments(&self) -> &[CellSegment] {
        &self.0
    }

    fn unresolved(&self, segment: &CellSegment, under: &Term) -> ReachError {
        let head = under.label().map_or_else(|| under.to_string(), str::to_string);
        ReachError::InvalidPath {
            path: self.to_string(),
            reason: format!("no `{segment}` under `{head}`"),
        }
    }
}

impl fmt::Display for CellPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for CellPath {
    type Err = ReachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CellPath {
    type Error = ReachError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CellPath> for String {
    fn from(value: CellPath) -> Self {
        value.to_string()
    }
}
