//! Path queries over the proof graph.

use std::collections::BTreeSet;

use reach_types::{EdgeId, EdgeKind, NodeId, ReachError, Term};

use crate::Graph;

impl Graph {
    /// Every simple path of edge ids from `source` to `target`.
    ///
    /// Cover edges are followed only when `traverse_covers` is set. Paths are
    /// sorted by their edge id sequence. `source == target` yields one empty
    /// path.
    pub fn paths_between(
        &self,
        source: NodeId,
        target: NodeId,
        traverse_covers: bool,
    ) -> Result<Vec<Vec<EdgeId>>, ReachError> {
        self.node(source)?;
        self.node(target)?;
        if source == target {
            return Ok(vec![Vec::new()]);
        }

        let mut paths = Vec::new();
        // (node reached, edges taken, nodes on the path)
        let mut work = vec![(source, Vec::new(), BTreeSet::from([source]))];
        while let Some((at, path, visited)) = work.pop() {
            let next = self
                .outgoing(at)
                .into_iter()
                .filter(|e| traverse_covers || e.kind != EdgeKind::Cover)
                .filter(|e| !visited.contains(&e.target));
            for edge in next {
                let mut extended = path.clone();
                extended.push(edge.id);
                if edge.target == target {
                    paths.push(extended);
                    continue;
                }
                let mut seen = visited.clone();
                seen.insert(edge.target);
                work.push((edge.target, extended, seen));
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// The path with the fewest edges; ties go to the smallest edge ids.
    pub fn shortest_path_between(
        &self,
        source: NodeId,
        target: NodeId,
    ) -> Result<Option<Vec<EdgeId>>, ReachError> {
        let paths = self.paths_between(source, target, false)?;
        Ok(paths.into_iter().min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b))))
    }

    /// Conjunction of the edge conditions along the shortest path from init.
    pub fn path_constraint(&self, node: NodeId) -> Result<Term, ReachError> {
        let Some(path) = self.shortest_path_between(self.init, node)? else {
            return Err(ReachError::InvalidArgument(format!(
                "no path from init to node {node}"
            )));
        };
        let mut seen = BTreeSet::new();
        let mut parts = Vec::new();
        for id in path {
            for conjunct in self.edge(id)?.condition.conjuncts() {
                if seen.insert(conjunct.clone()) {
                    parts.push(conjunct.clone());
                }
            }
        }
        Ok(Term::conjunction(parts))
    }
}
