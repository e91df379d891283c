//! Read-only text projections of a graph.
//!
//! Output depends only on graph contents and is ordered by ascending id, so
//! two renderings without an intervening mutation are byte-identical.

use reach_types::{Edge, EdgeKind, NodeId, ReachError, State, tags};
use similar::{ChangeTag, TextDiff};

use crate::Graph;

/// Unchanged lines kept around each changed region.
const DIFF_CONTEXT: usize = 2;

impl Graph {
    /// `id (attr, attr, @alias)`, where attrs are the init marker, the node
    /// state, and user tags.
    #[must_use]
    pub fn node_label(&self, id: NodeId) -> String {
        let Ok(node) = self.node(id) else {
            return id.to_string();
        };
        let mut attrs: Vec<String> = Vec::new();
        if id == self.init() {
            attrs.push("init".into());
        }
        if let Ok(state) = self.node_state(id) {
            attrs.push(state.as_str().into());
        }
        attrs.extend(
            node.tags
                .iter()
                .filter(|t| t.as_str() != tags::TERMINAL && t.as_str() != tags::TARGET)
                .cloned(),
        );
        attrs.extend(self.aliases_of(id).into_iter().map(|a| format!("@{a}")));
        format!("{id} ({})", attrs.join(", "))
    }

    /// Graphviz description: one line per node, then one per edge.
    #[must_use]
    pub fn dot(&self) -> String {
        let mut out = String::from("digraph proof {\n");
        for node in self.nodes(None) {
            out.push_str(&format!(
                "  {} [label=\"{}\"];\n",
                node.id,
                escape(&self.node_label(node.id))
            ));
        }
        for edge in self.edges(None) {
            let style = if edge.kind == EdgeKind::Cover {
                ", style=dashed"
            } else {
                ""
            };
            out.push_str(&format!(
                "  {} -> {} [label=\"{}\"{style}];\n",
                edge.source,
                edge.target,
                escape(&edge_summary(edge))
            ));
        }
        out.push_str("}\n");
        out
    }

    /// Rooted tree from init.
    ///
    /// A node reached by several edges is expanded under its tree parent (the
    /// smallest-id inbound non-cover edge); every other inbound edge prints a
    /// `(ref)` line. A detached target follows as a second root.
    #[must_use]
    pub fn tree(&self) -> String {
        let mut out = format!("{}\n", self.node_label(self.init()));
        self.write_children(self.init(), &mut out);
        if let Some(target) = self.target()
            && self.incoming(target).is_empty()
        {
            out.push_str(&format!("{}\n", self.node_label(target)));
        }
        out
    }

    fn write_children(&self, root: NodeId, out: &mut String) {
        let mut stack = vec![Frame {
            edges: self.outgoing(root),
            next: 0,
            prefix: String::new(),
        }];
        while let Some(frame) = stack.last_mut() {
            let Some(edge) = frame.edges.get(frame.next).copied() else {
                stack.pop();
                continue;
            };
            frame.next += 1;
            let last = frame.next == frame.edges.len();
            let (branch, extension) = if last {
                ("`-- ", "    ")
            } else {
                ("+-- ", "|   ")
            };
            out.push_str(&format!("{}{branch}{} -> ", frame.prefix, edge_summary(edge)));
            let owns = self.tree_parent(edge.target).map(|p| p.id) == Some(edge.id);
            if owns {
                out.push_str(&format!("{}\n", self.node_label(edge.target)));
                let prefix = format!("{}{extension}", frame.prefix);
                stack.push(Frame {
                    edges: self.outgoing(edge.target),
                    next: 0,
                    prefix,
                });
            } else {
                out.push_str(&format!("{} (ref)\n", edge.target));
            }
        }
    }

    /// Line diff of two nodes' pretty-printed states.
    pub fn diff(&self, left: NodeId, right: NodeId) -> Result<String, ReachError> {
        let a = self.node(left)?.state();
        let b = self.node(right)?.state();
        Ok(diff_states(
            &format!("node {left}"),
            &a,
            &format!("node {right}"),
            &b,
        ))
    }
}

/// Pending children of one node in [`Graph::tree`].
struct Frame<'a> {
    edges: Vec<&'a Edge>,
    next: usize,
    prefix: String,
}

/// `e3 branch(0) [cond]`; the condition is omitted when trivially true.
#[must_use]
pub fn edge_summary(edge: &Edge) -> String {
    let mut text = format!("{} {}({})", edge.id, edge.kind, edge.depth);
    if !edge.condition.is_top() {
        text.push_str(&format!(" [{}]", edge.condition));
    }
    text
}

/// Returns an empty string when the states render identically.
#[must_use]
pub fn diff_states(left_name: &str, left: &State, right_name: &str, right: &State) -> String {
    let old = left.pretty();
    let new = right.pretty();
    if old == new {
        return String::new();
    }

    let diff = TextDiff::from_lines(&old, &new);
    let mut out = format!("--- {left_name}\n+++ {right_name}\n");
    for (i, group) in diff.grouped_ops(DIFF_CONTEXT).iter().enumerate() {
        if i > 0 {
            out.push_str("...\n");
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let marker = match change.tag() {
                    ChangeTag::Equal => ' ',
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                };
                out.push(marker);
                out.push(' ');
                out.push_str(change.value().trim_end_matches('\n'));
                out.push('\n');
            }
        }
    }
    out
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
