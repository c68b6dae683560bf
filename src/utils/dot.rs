//! Graphviz rendering of a folded automaton.
//!
//! Conventions expected by downstream tooling: the top state comes first and
//! is named `all`, every other state is `T<i>`, initial states carry an
//! `_init` suffix, rejecting states are double-circled, and every factored
//! guard clause becomes its own edge.

use crate::uvw::{StateId, Uvw};
use itertools::Itertools;

type Node = String;
type Edge = (String, String, String);

impl Uvw {
    /// Produce the DOT of the automaton.
    pub fn dot(&self) -> String {
        let mut buf = Vec::new();
        dot::render(self, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn render_name(&self, s: StateId) -> String {
        let name = self.state_name(s);
        if self.is_initial(s) {
            format!("{name}_init")
        } else {
            name
        }
    }
}

impl<'a> dot::Labeller<'a, Node, Edge> for Uvw {
    fn graph_id(&'a self) -> dot::Id<'a> {
        dot::Id::new("uvw").unwrap()
    }

    fn node_id(&'a self, n: &Node) -> dot::Id<'a> {
        dot::Id::new(n.clone()).unwrap()
    }

    fn node_label<'b>(&'b self, n: &Node) -> dot::LabelText<'b> {
        dot::LabelText::LabelStr(n.to_string().into())
    }

    fn edge_label<'b>(&'b self, e: &Edge) -> dot::LabelText<'b> {
        dot::LabelText::LabelStr(e.1.clone().into())
    }

    fn node_shape<'b>(&'b self, n: &Node) -> Option<dot::LabelText<'b>> {
        let is_rejecting = self
            .states()
            .any(|s| self.is_rejecting(s) && self.render_name(s) == *n);

        if is_rejecting {
            Some(dot::LabelText::LabelStr("doublecircle".into()))
        } else {
            None
        }
    }
}

impl<'a> dot::GraphWalk<'a, Node, Edge> for Uvw {
    fn nodes(&self) -> dot::Nodes<'a, Node> {
        // index order puts the top state first
        self.states()
            .map(|s| self.render_name(s))
            .collect_vec()
            .into()
    }

    fn edges(&self) -> dot::Edges<'a, Edge> {
        let mut edges = Vec::new();
        for source in self.states() {
            for (target, guard) in self.out(source) {
                for clause in self.alphabet().factor_clauses(guard) {
                    edges.push((
                        self.render_name(source),
                        self.alphabet().clause_label(&clause),
                        self.render_name(*target),
                    ));
                }
            }
        }
        edges.into()
    }

    fn source(&self, e: &Edge) -> Node {
        e.0.clone()
    }

    fn target(&self, e: &Edge) -> Node {
        e.2.clone()
    }
}
