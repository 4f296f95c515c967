//! The symbolic DFA object.
//!
//! An [`Mtdfa`] is a vector of MTBDD roots, one per state, over the Boolean
//! variables of the atomic propositions.  State 0 is initial.  A leaf of
//! `states[i]` is either a constant (`0` = reject everything from here,
//! `1` = accept everything) or a terminal `(dst, may_stop)`: reading the
//! cube moves to state `dst`, and the trace may end accepting right there
//! iff `may_stop` is set.
//!
//! The diagrams live in the translator session that produced the automaton;
//! operations that need to walk them take the session's [`Mtbdd`].

use hashbrown::HashSet;

use crate::formula::{FormulaId, Formulas};
use crate::dict::VarDict;
use crate::mtbdd::Mtbdd;
use crate::node::NodeKind;
use crate::types::{Leaf, NodeRef, Var};

/// A symbolic DFA with multi-terminal transition diagrams.
pub struct Mtdfa {
    /// The atomic propositions used, sorted by variable.
    pub aps: Vec<Var>,
    /// Transition diagram per state; state 0 is initial.
    pub states: Vec<NodeRef>,
    /// Optional display label per state (empty when not tracked).
    pub names: Vec<FormulaId>,
    /// Variables owned by the output player, sorted.  Empty when the
    /// automaton carries no game interpretation.
    controllable: Vec<Var>,
    /// Identity of the owning translator session.
    pub(crate) session: u32,
}

impl Mtdfa {
    pub(crate) fn new(session: u32) -> Self {
        Mtdfa {
            aps: Vec::new(),
            states: Vec::new(),
            names: Vec::new(),
            controllable: Vec::new(),
            session,
        }
    }

    /// Number of states (MTBDD roots).
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// The controllable (output) variables, sorted.
    pub fn controllable_variables(&self) -> &[Var] {
        &self.controllable
    }

    pub fn set_controllable(&mut self, mut vars: Vec<Var>) {
        vars.sort_unstable();
        vars.dedup();
        self.controllable = vars;
    }

    /// Whether the automaton accepts no trace at all: no accepting leaf is
    /// reachable from any state diagram.
    pub fn is_empty(&self, bdd: &Mtbdd) -> bool {
        !bdd.find_leaf(&self.states, |leaf| leaf.is_accepting())
    }

    /// Run a finite trace through the automaton.  Each letter lists the
    /// atomic propositions that hold; all others are false.  Traces are
    /// non-empty by convention: the empty word is rejected.
    pub fn accepts(&self, bdd: &Mtbdd, word: &[&[Var]]) -> bool {
        let mut state = 0usize;
        for (i, letter) in word.iter().enumerate() {
            let leaf = bdd.eval(self.states[state], &|v| letter.contains(&v));
            match bdd.kind(leaf) {
                NodeKind::Const(accept) => return accept,
                NodeKind::Terminal(t) => {
                    if i + 1 == word.len() {
                        return t.may_stop();
                    }
                    debug_assert!(
                        (t.ordinal() as usize) < self.states.len(),
                        "terminal {} escapes the automaton",
                        t
                    );
                    state = t.ordinal() as usize;
                }
                NodeKind::Internal { .. } => unreachable!("eval returned an internal node"),
            }
        }
        false
    }

    /// Gather size statistics.  Node counting and path counting are
    /// optional because path counts can be exponential.
    pub fn stats(&self, bdd: &Mtbdd, nodes: bool, paths: bool) -> MtdfaStats {
        let mut res = MtdfaStats {
            states: self.states.len(),
            aps: self.aps.len(),
            ..MtdfaStats::default()
        };
        if nodes {
            let mut internal = 0;
            let mut terminals = 0;
            for n in bdd.descendants(self.states.iter().copied()) {
                match bdd.kind(n) {
                    NodeKind::Internal { .. } => internal += 1,
                    NodeKind::Terminal(_) => terminals += 1,
                    NodeKind::Const(true) => res.has_true = true,
                    NodeKind::Const(false) => res.has_false = true,
                }
            }
            res.nodes = Some(internal);
            res.terminals = Some(terminals);
        }
        if paths {
            let mut num_paths = 0;
            let mut num_edges = 0;
            let mut leaves_seen = HashSet::new();
            for &root in &self.states {
                leaves_seen.clear();
                for (_, leaf) in bdd.paths(root) {
                    num_paths += 1;
                    leaves_seen.insert(leaf);
                }
                num_edges += leaves_seen.len();
            }
            res.paths = Some(num_paths);
            res.edges = Some(num_edges);
        }
        res
    }

    /// Render the automaton in DOT format.  Controllable variables are
    /// drawn as diamonds; accepting leaves get a double border.
    pub fn to_dot(&self, bdd: &Mtbdd, dict: &VarDict, formulas: Option<&Formulas>) -> String {
        use std::fmt::Write as _;

        let mut dot = String::new();
        let mut edges = String::new();
        writeln!(dot, "digraph mtdfa {{").unwrap();
        writeln!(dot, "  rankdir=TB;").unwrap();
        writeln!(dot, "  node [shape=circle];").unwrap();
        writeln!(dot, "  I [label=\"\", style=invis, width=0];").unwrap();
        writeln!(edges, "  I -> S0;").unwrap();

        for (i, &root) in self.states.iter().enumerate() {
            let label = match (formulas, self.names.get(i)) {
                (Some(fs), Some(&name)) => fs.display(name).to_string(),
                _ => i.to_string(),
            };
            writeln!(
                dot,
                "  S{} [shape=box, style=rounded, label=\"{}\"];",
                i,
                escape(&label)
            )
            .unwrap();
            writeln!(edges, "  S{} -> B{};", i, root.index()).unwrap();
        }

        for n in bdd.descendants(self.states.iter().copied()) {
            match bdd.kind(n) {
                NodeKind::Const(accept) => {
                    writeln!(
                        dot,
                        "  B{} [shape=square, label=\"{}\"{}];",
                        n.index(),
                        accept as u8,
                        if accept { ", peripheries=2" } else { "" }
                    )
                    .unwrap();
                }
                NodeKind::Terminal(t) => {
                    writeln!(
                        dot,
                        "  B{} [shape=box, style=rounded, label=\"{}\"{}];",
                        n.index(),
                        t.ordinal(),
                        if t.may_stop() { ", peripheries=2" } else { "" }
                    )
                    .unwrap();
                }
                NodeKind::Internal { var, low, high } => {
                    let shape = if self.controllable.contains(&var) {
                        "diamond"
                    } else {
                        "circle"
                    };
                    writeln!(
                        dot,
                        "  B{} [shape={}, label=\"{}\"];",
                        n.index(),
                        shape,
                        escape(&dict.display_name(var))
                    )
                    .unwrap();
                    writeln!(edges, "  B{} -> B{} [style=dotted];", n.index(), low.index()).unwrap();
                    writeln!(edges, "  B{} -> B{};", n.index(), high.index()).unwrap();
                }
            }
        }

        dot.push_str(&edges);
        dot.push_str("}\n");
        dot
    }

    /// Iterate the distinct leaves of one state's diagram.
    pub fn state_leaves(&self, bdd: &Mtbdd, state: usize) -> Vec<Leaf> {
        bdd.leaves(self.states[state])
            .into_iter()
            .map(|n| bdd.leaf(n).unwrap())
            .collect()
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Size statistics of an [`Mtdfa`].
#[derive(Debug, Default, Clone)]
pub struct MtdfaStats {
    pub states: usize,
    pub aps: usize,
    /// Internal (decision) node count, shared nodes counted once.
    pub nodes: Option<usize>,
    /// Distinct terminal leaves.
    pub terminals: Option<usize>,
    pub has_true: bool,
    pub has_false: bool,
    /// Distinct (state, leaf) pairs.
    pub edges: Option<usize>,
    /// Total path count across all states.
    pub paths: Option<usize>,
}
