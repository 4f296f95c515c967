//! Game solving over MTDFAs.
//!
//! Three solving routes compute the same winning region:
//!
//! 1. **Arena backpropagation** ([`BackpropEncoder`]): every MTBDD node of
//!    every state diagram becomes a vertex of a [`BackpropGraph`]; output
//!    variables are existential vertices, input variables universal ones,
//!    accepting terminals link to the shared winning vertex and
//!    non-accepting terminals link back to their state's vertex.  The
//!    encoder is incremental, so it doubles as the engine of the on-the-fly
//!    synthesis loops.
//! 2. **Eager state-level fixed point** ([`Translator::winning_region`]):
//!    repeatedly game-evaluate every state diagram until quiescence.
//! 3. **Lazy fixed point** ([`Translator::winning_region_lazy`]): only
//!    re-evaluate states whose successors changed, walking a reverse graph
//!    of the states that can reach an accepting leaf, and stop as soon as
//!    the initial state is determined.  A three-valued variant
//!    distinguishes undetermined states from losing ones.
//!
//! Strategy extraction rewrites each winning state's diagram: the branch
//! chosen by the arena is kept at output nodes, accepting leaves become
//! `1`, losing leaves `0`.  An unrealizable specification yields the
//! 1-state `ff` automaton — a value, not an error.

use std::collections::VecDeque;

use bitvec::bitvec;
use bitvec::slice::BitSlice;
use bitvec::vec::BitVec;
use hashbrown::{HashMap, HashSet};
use log::{debug, info};

use crate::backprop::{BackpropGraph, VertexId};
use crate::cache::dedicated_cache_bits;
use crate::dfa::Mtdfa;
use crate::mtbdd::{Apply1Op, BoolCache, Cache1, LeafValue, LeafValue3, Mtbdd, SynthCache, SynthesisOp, TrivalCache};
use crate::translate::{StrategyOp, Translator};
use crate::types::{Leaf, NodeRef, Terminal};

/// Encodes MTDFA states into a backpropagation arena, node by node.
///
/// Vertices are created for every reachable MTBDD node (shared nodes share
/// their vertex) and for every state ordinal found on a terminal.  A state
/// ordinal's vertex has a single successor, the vertex of its diagram; the
/// resulting back edges are what lets determination flow between states.
pub struct BackpropEncoder {
    pub graph: BackpropGraph,
    rootnum_to_vertex: HashMap<u32, VertexId>,
    node_to_vertex: HashMap<NodeRef, VertexId>,
    /// Nodes already re-traversed in the current `encode_state` call
    /// (recompute mode only).
    seen: HashSet<NodeRef>,
}

impl BackpropEncoder {
    pub fn new(stop_asap: bool) -> Self {
        BackpropEncoder {
            graph: BackpropGraph::new(stop_asap),
            rootnum_to_vertex: HashMap::new(),
            node_to_vertex: HashMap::new(),
            seen: HashSet::new(),
        }
    }

    /// Whether the state ordinal has a determined vertex.
    pub fn root_is_determined(&self, rootnum: u32) -> bool {
        self.rootnum_to_vertex
            .get(&rootnum)
            .is_some_and(|&v| self.graph.is_determined(v))
    }

    /// Whether the state ordinal is determined *winning*.  Unknown or
    /// undetermined ordinals count as losing.
    pub fn root_winner(&self, rootnum: u32) -> bool {
        self.rootnum_to_vertex
            .get(&rootnum)
            .is_some_and(|&v| self.graph.is_determined(v) && self.graph.winner(v))
    }

    fn vertex_of_rootnum(
        &mut self,
        rootnum: u32,
        new_rootnums: &mut Vec<u32>,
        old_rootnums: &mut Option<&mut Vec<u32>>,
    ) -> VertexId {
        if let Some(&v) = self.rootnum_to_vertex.get(&rootnum) {
            if let Some(old) = old_rootnums.as_deref_mut() {
                old.push(rootnum);
            }
            return v;
        }
        // A state vertex has exactly one successor (its diagram), so the
        // owner does not matter.
        let v = self.graph.new_vertex(false);
        self.rootnum_to_vertex.insert(rootnum, v);
        new_rootnums.push(rootnum);
        v
    }

    #[allow(clippy::too_many_arguments)]
    fn vertex_of_node(
        &mut self,
        bdd: &Mtbdd,
        b: NodeRef,
        recompute: bool,
        todo: &mut VecDeque<(VertexId, NodeRef, NodeRef)>,
        new_rootnums: &mut Vec<u32>,
        old_rootnums: &mut Option<&mut Vec<u32>>,
        want_names: bool,
    ) -> VertexId {
        let existing = self.node_to_vertex.get(&b).copied();
        if let Some(v) = existing {
            if !recompute || b.is_const() {
                return v;
            }
        }
        if b.is_const() {
            let v = self.graph.new_vertex(!b.is_true());
            self.node_to_vertex.insert(b, v);
            if want_names {
                self.graph.set_name(v, if b.is_true() { "true" } else { "false" });
            }
            self.graph.set_winner(v, b.is_true(), VertexId::NONE);
            return v;
        }
        if recompute && !self.seen.insert(b) {
            // Each node is re-traversed at most once per encode_state call.
            return self.node_to_vertex[&b];
        }
        if bdd.is_terminal(b) {
            let t = bdd.terminal_value(b);
            if existing.is_some() {
                // Recompute re-visit: report the successor state again.
                if t.may_stop() {
                    return existing.unwrap();
                }
                return self.vertex_of_rootnum(t.ordinal(), new_rootnums, old_rootnums);
            }
            if t.may_stop() {
                // Accepting terminals all share the winning vertex.
                let v = self.vertex_of_node(
                    bdd,
                    NodeRef::TRUE,
                    recompute,
                    todo,
                    new_rootnums,
                    old_rootnums,
                    want_names,
                );
                self.node_to_vertex.insert(b, v);
                return v;
            }
            let v = self.vertex_of_rootnum(t.ordinal(), new_rootnums, old_rootnums);
            self.node_to_vertex.insert(b, v);
            return v;
        }
        let (owner, low, high) = bdd.quantified_children(b);
        if let Some(v) = existing {
            if self.graph.is_determined(v) {
                return v;
            }
            // Re-traverse an already-encoded, still-undetermined node to
            // collect its undetermined successors.
            todo.push_back((v, low, high));
            return v;
        }
        let v = self.graph.new_vertex(owner);
        self.node_to_vertex.insert(b, v);
        todo.push_back((v, low, high));
        v
    }

    /// Encode one state and its diagram into the arena.
    ///
    /// `rootnum` identifies the state (interning ordinal on-the-fly, state
    /// ordinal offline).  State ordinals found on freshly-created terminal
    /// vertices are appended to `new_rootnums`; ordinals that already had a
    /// vertex go to `old_rootnums` when provided.  With `recompute`,
    /// already-encoded undetermined nodes are traversed again so *all*
    /// undetermined successors are reported (needed by the strict DFS).
    ///
    /// Returns `true` as soon as the initial vertex becomes determined.
    #[allow(clippy::too_many_arguments)]
    pub fn encode_state(
        &mut self,
        bdd: &Mtbdd,
        rootnum: u32,
        root: NodeRef,
        name: Option<&str>,
        new_rootnums: &mut Vec<u32>,
        mut old_rootnums: Option<&mut Vec<u32>>,
        recompute: bool,
    ) -> bool {
        if recompute {
            self.seen.clear();
        }
        let mut todo: VecDeque<(VertexId, NodeRef, NodeRef)> = VecDeque::new();

        let root_vertex = self.vertex_of_rootnum(rootnum, new_rootnums, &mut old_rootnums);
        if let Some(name) = name {
            self.graph.set_name(root_vertex, name);
        }
        debug!("encoding state {} on {}", rootnum, root_vertex);

        // Link the state vertex to the diagram root, as its only child.
        let node_vertex = self.vertex_of_node(
            bdd,
            root,
            recompute,
            &mut todo,
            new_rootnums,
            &mut old_rootnums,
            name.is_some(),
        );
        if self.graph.new_edge(root_vertex, node_vertex) {
            return true;
        }
        if self.graph.freeze(root_vertex) {
            return true;
        }

        while let Some((vertex, low, high)) = todo.pop_front() {
            if recompute && self.graph.is_frozen(vertex) {
                debug_assert!(!self.graph.is_determined(vertex));
                self.vertex_of_node(bdd, low, recompute, &mut todo, new_rootnums, &mut old_rootnums, name.is_some());
                self.vertex_of_node(bdd, high, recompute, &mut todo, new_rootnums, &mut old_rootnums, name.is_some());
                continue;
            }
            let low_vertex = self.vertex_of_node(
                bdd,
                low,
                recompute,
                &mut todo,
                new_rootnums,
                &mut old_rootnums,
                name.is_some(),
            );
            if self.graph.new_edge(vertex, low_vertex) {
                return true;
            }
            // If the low edge determined the vertex, skip the other branch.
            if self.graph.is_determined(vertex) {
                continue;
            }
            let high_vertex = self.vertex_of_node(
                bdd,
                high,
                recompute,
                &mut todo,
                new_rootnums,
                &mut old_rootnums,
                name.is_some(),
            );
            if self.graph.new_edge(vertex, high_vertex) {
                return true;
            }
            if self.graph.freeze(vertex) {
                return true;
            }
        }
        false
    }

    /// The child of `node` the solved arena commits to, when `node`'s
    /// vertex is winning and has a recorded choice.
    pub fn choice_child(&self, bdd: &Mtbdd, node: NodeRef) -> Option<NodeRef> {
        let &v = self.node_to_vertex.get(&node)?;
        if !self.graph.is_determined(v) || !self.graph.winner(v) {
            return None;
        }
        let choice = self.graph.choice(v);
        if choice == VertexId::NONE {
            return None;
        }
        let low = bdd.low(node);
        if self.node_to_vertex.get(&low) == Some(&choice) {
            return Some(low);
        }
        let high = bdd.high(node);
        debug_assert_eq!(
            self.node_to_vertex.get(&high),
            Some(&choice),
            "recorded choice is not a child of the node"
        );
        Some(high)
    }
}

/// Leaf valuation for the Boolean fixed points: a leaf wins if it accepts
/// or leads to a state already known to be winning.
struct WinningLeaf<'a> {
    winning: &'a BitSlice,
}

impl LeafValue for WinningLeaf<'_> {
    fn value(&mut self, leaf: Leaf) -> bool {
        match leaf {
            Leaf::False => false,
            Leaf::True => true,
            Leaf::Terminal(t) => t.may_stop() || self.winning[t.ordinal() as usize],
        }
    }
}

/// Three-valued leaf valuation; `None` marks still-undetermined states.
struct WinningLeaf3<'a> {
    winning: &'a [Option<bool>],
}

impl LeafValue3 for WinningLeaf3<'_> {
    fn value(&mut self, leaf: Leaf) -> Option<bool> {
        match leaf {
            Leaf::False => Some(false),
            Leaf::True => Some(true),
            Leaf::Terminal(t) => {
                if t.may_stop() {
                    Some(true)
                } else {
                    self.winning[t.ordinal() as usize]
                }
            }
        }
    }
}

/// Leaf rewrite for strategy-by-refinement: accepting leaves become `1`,
/// other terminals keep their identity and report the current knowledge.
struct RefineStrategyOp<'a> {
    winning: &'a BitSlice,
}

impl SynthesisOp for RefineStrategyOp<'_> {
    fn map_leaf(&mut self, bdd: &mut Mtbdd, leaf: Leaf) -> (NodeRef, bool) {
        match leaf {
            Leaf::False => (NodeRef::FALSE, false),
            Leaf::True => (NodeRef::TRUE, true),
            Leaf::Terminal(t) => {
                if t.may_stop() {
                    (NodeRef::TRUE, true)
                } else {
                    (bdd.terminal(t), self.winning[t.ordinal() as usize])
                }
            }
        }
    }
}

/// Leaf rewrite for game restriction: renumber surviving terminals in
/// discovery order, scheduling their states for rewriting.
struct RestrictGameOp<'a, F: Fn(u32) -> bool> {
    keep: &'a F,
    term_map: &'a mut HashMap<u32, u32>,
    todo: &'a mut VecDeque<u32>,
}

impl<F: Fn(u32) -> bool> Apply1Op for RestrictGameOp<'_, F> {
    fn map_leaf(&mut self, bdd: &mut Mtbdd, leaf: Leaf) -> NodeRef {
        match leaf {
            Leaf::False => NodeRef::FALSE,
            Leaf::True => NodeRef::TRUE,
            Leaf::Terminal(t) => {
                if t.may_stop() {
                    return NodeRef::TRUE;
                }
                if !(self.keep)(t.ordinal()) {
                    return NodeRef::FALSE;
                }
                let next = match self.term_map.get(&t.ordinal()) {
                    Some(&v) => v,
                    None => {
                        let v = self.term_map.len() as u32;
                        self.term_map.insert(t.ordinal(), v);
                        self.todo.push_back(t.ordinal());
                        v
                    }
                };
                bdd.terminal(Terminal::new(next, false))
            }
        }
    }
}

impl Translator {
    /// The reverse graph of the states reachable from state 0 without
    /// crossing an accepting terminal.  By convention, the predecessors of
    /// state 0 list the states that can reach an accepting leaf (the
    /// predecessors of the initial state are never needed otherwise).
    fn reverse_reachable(&self, dfa: &Mtdfa) -> Vec<Vec<usize>> {
        let n = dfa.num_states();
        let mut reverse = vec![Vec::new(); n];
        let mut seen = bitvec![0; n];
        let mut todo = VecDeque::new();
        todo.push_back(0usize);
        seen.set(0, true);
        while let Some(src) = todo.pop_front() {
            let mut has_acc = false;
            for leaf_node in self.bdd.leaves(dfa.states[src]) {
                match self.bdd.leaf(leaf_node).unwrap() {
                    Leaf::False => {}
                    Leaf::True => {
                        if !has_acc {
                            reverse[0].push(src);
                            has_acc = true;
                        }
                    }
                    Leaf::Terminal(t) => {
                        if t.may_stop() {
                            if !has_acc {
                                reverse[0].push(src);
                                has_acc = true;
                            }
                            continue;
                        }
                        let dst = t.ordinal() as usize;
                        if dst == 0 {
                            continue;
                        }
                        reverse[dst].push(src);
                        if !seen[dst] {
                            seen.set(dst, true);
                            todo.push_back(dst);
                        }
                    }
                }
            }
        }
        reverse
    }

    /// The winning region, by the eager fixed point: game-evaluate every
    /// state until quiescence.
    pub fn winning_region(&mut self, dfa: &Mtdfa) -> BitVec {
        self.bdd.quantify_prepare(dfa.controllable_variables(), self.dict.len());
        let n = dfa.num_states();
        let mut winning = bitvec![0; n];
        let mut cache = BoolCache::new(dedicated_cache_bits(n, dfa.aps.len()));
        let mut iteration: u32 = 0;
        loop {
            let mut changed = false;
            for i in 0..n {
                if winning[i] {
                    continue;
                }
                // Within one round the cache may serve values computed from
                // the previous knowledge; that only delays a win to the
                // next round, it never invents one.
                let value = {
                    let mut vals = WinningLeaf { winning: &winning };
                    self.bdd.quantify_bool(dfa.states[i], &mut vals, &mut cache, iteration)
                };
                if value {
                    winning.set(i, true);
                    changed = true;
                }
            }
            iteration += 1;
            if !changed {
                break;
            }
        }
        info!("winning region: {}/{} states", winning.count_ones(), n);
        winning
    }

    /// The winning region, by the lazy fixed point: only re-evaluate the
    /// predecessors of states that changed, and stop as soon as state 0 is
    /// determined winning.
    pub fn winning_region_lazy(&mut self, dfa: &Mtdfa) -> BitVec {
        self.bdd.quantify_prepare(dfa.controllable_variables(), self.dict.len());
        let n = dfa.num_states();
        let rev = self.reverse_reachable(dfa);
        let mut winning = bitvec![0; n];
        let mut seen = vec![-1i64; n];
        let mut cache = BoolCache::new(dedicated_cache_bits(n, dfa.aps.len()));

        let mut todo: VecDeque<usize> = rev[0].iter().copied().collect();
        let mut changed: Vec<usize> = Vec::new();
        let mut iteration: i64 = 0;
        'outer: while !todo.is_empty() {
            while let Some(i) = todo.pop_front() {
                if winning[i] {
                    continue;
                }
                let value = {
                    let mut vals = WinningLeaf { winning: &winning };
                    self.bdd
                        .quantify_bool(dfa.states[i], &mut vals, &mut cache, iteration as u32)
                };
                if value {
                    winning.set(i, true);
                    if i == 0 {
                        break 'outer;
                    }
                    changed.push(i);
                }
            }
            for i in changed.drain(..) {
                for &p in &rev[i] {
                    if !winning[p] && seen[p] != iteration {
                        seen[p] = iteration;
                        todo.push_front(p);
                    }
                }
            }
            iteration += 1;
        }
        winning
    }

    /// Three-valued lazy winning region: `Some(true)` won, `Some(false)`
    /// lost, `None` undetermined (e.g. when state 0 was decided first).
    pub fn winning_region_lazy3(&mut self, dfa: &Mtdfa) -> Vec<Option<bool>> {
        self.bdd.quantify_prepare(dfa.controllable_variables(), self.dict.len());
        let n = dfa.num_states();
        let rev = self.reverse_reachable(dfa);
        let mut winning: Vec<Option<bool>> = vec![None; n];
        let mut seen = vec![-1i64; n];
        let mut cache = TrivalCache::new(dedicated_cache_bits(n, dfa.aps.len()));

        let mut todo: VecDeque<usize> = rev[0].iter().copied().collect();
        let mut changed: Vec<usize> = Vec::new();
        let mut iteration: i64 = 0;
        'outer: while !todo.is_empty() {
            while let Some(i) = todo.pop_front() {
                if winning[i].is_some() {
                    continue;
                }
                let value = {
                    let mut vals = WinningLeaf3 { winning: &winning };
                    self.bdd
                        .quantify_trival(dfa.states[i], &mut vals, &mut cache, iteration as u32)
                };
                if let Some(verdict) = value {
                    winning[i] = Some(verdict);
                    if i == 0 {
                        break 'outer;
                    }
                    changed.push(i);
                }
            }
            for i in changed.drain(..) {
                for &p in &rev[i] {
                    if winning[p].is_none() && seen[p] != iteration {
                        seen[p] = iteration;
                        todo.push_front(p);
                    }
                }
            }
            iteration += 1;
        }
        winning
    }

    /// Rewrite an automaton as a game: accepting leaves become `1`,
    /// reachable states are renumbered in discovery order.
    pub fn restrict_as_game(&mut self, dfa: &Mtdfa) -> Mtdfa {
        self.restrict_game_inner(dfa, |_| true)
    }

    /// Like [`Translator::restrict_as_game`], additionally blanking every
    /// state outside the winning region.
    pub fn restrict_to_winning(&mut self, dfa: &Mtdfa, winning: &BitSlice) -> Mtdfa {
        self.restrict_game_inner(dfa, |dst| winning[dst as usize])
    }

    /// Three-valued variant: only keep states known winning.
    pub fn restrict_to_winning3(&mut self, dfa: &Mtdfa, winning: &[Option<bool>]) -> Mtdfa {
        self.restrict_game_inner(dfa, |dst| winning[dst as usize] == Some(true))
    }

    fn restrict_game_inner(&mut self, dfa: &Mtdfa, keep: impl Fn(u32) -> bool) -> Mtdfa {
        let mut res = Mtdfa::new(self.session);
        res.aps = dfa.aps.clone();
        res.set_controllable(dfa.controllable_variables().to_vec());
        let keep_names = dfa.names.len() == dfa.states.len();

        let mut term_map: HashMap<u32, u32> = HashMap::new();
        term_map.insert(0, 0);
        let mut todo: VecDeque<u32> = VecDeque::new();
        todo.push_back(0);
        let mut cache = Cache1::new(dedicated_cache_bits(dfa.num_states(), dfa.aps.len()));

        while let Some(state) = todo.pop_front() {
            let b = {
                let mut op = RestrictGameOp {
                    keep: &keep,
                    term_map: &mut term_map,
                    todo: &mut todo,
                };
                self.bdd.apply1(dfa.states[state as usize], &mut op, &mut cache, 0)
            };
            res.states.push(b);
            if keep_names {
                res.names.push(dfa.names[state as usize]);
            }
        }
        res
    }

    /// Extract a winning strategy from a solved game.
    ///
    /// With `backprop` the automaton is encoded into an arena and the
    /// recorded choices are committed; otherwise the lazy refinement
    /// computes the winning region and losing states are blanked.  In both
    /// cases an unrealizable game yields the 1-state `ff` automaton.
    pub fn winning_strategy(&mut self, dfa: &Mtdfa, backprop: bool) -> Mtdfa {
        if backprop {
            self.winning_strategy_by_backprop(dfa)
        } else {
            self.winning_strategy_by_refinement(dfa)
        }
    }

    fn winning_strategy_by_backprop(&mut self, dfa: &Mtdfa) -> Mtdfa {
        self.bdd.quantify_prepare(dfa.controllable_variables(), self.dict.len());
        let mut enc = BackpropEncoder::new(true);
        let mut scratch = Vec::new();
        for i in 0..dfa.num_states() {
            if enc.encode_state(&self.bdd, i as u32, dfa.states[i], None, &mut scratch, None, false) {
                break;
            }
            scratch.clear();
        }
        if !enc.root_winner(0) {
            let mut res = self.verdict_dfa(false);
            res.set_controllable(dfa.controllable_variables().to_vec());
            return res;
        }

        let mut res = Mtdfa::new(self.session);
        res.aps = dfa.aps.clone();
        res.set_controllable(dfa.controllable_variables().to_vec());
        res.names = dfa.names.clone();
        res.states = dfa.states.clone();
        let mut cache = Cache1::new(dedicated_cache_bits(dfa.num_states(), dfa.aps.len()));
        let mut op = StrategyOp {
            enc: &enc,
            remap: None,
        };
        for state in res.states.iter_mut() {
            *state = self.bdd.restrict_with_choice(*state, &mut op, &mut cache, 0);
        }
        res
    }

    fn winning_strategy_by_refinement(&mut self, dfa: &Mtdfa) -> Mtdfa {
        self.bdd.quantify_prepare(dfa.controllable_variables(), self.dict.len());
        let n = dfa.num_states();
        let rev = self.reverse_reachable(dfa);
        let mut states = dfa.states.clone();
        let mut winning = bitvec![0; n];
        let mut seen = vec![-1i64; n];
        let mut cache = SynthCache::new(dedicated_cache_bits(n, dfa.aps.len()));

        let mut todo: VecDeque<usize> = rev[0].iter().copied().collect();
        let mut changed: Vec<usize> = Vec::new();
        let mut iteration: i64 = 0;
        'outer: while !todo.is_empty() {
            while let Some(i) = todo.pop_front() {
                // A state may be scheduled before it was known winning.
                if winning[i] {
                    continue;
                }
                let (rewritten, value) = {
                    let mut op = RefineStrategyOp { winning: &winning };
                    self.bdd
                        .restrict_winning(states[i], &mut op, &mut cache, iteration as u32)
                };
                states[i] = rewritten;
                if value {
                    winning.set(i, true);
                    if i == 0 {
                        break 'outer;
                    }
                    changed.push(i);
                }
            }
            for i in changed.drain(..) {
                for &p in &rev[i] {
                    if !winning[p] && seen[p] != iteration {
                        seen[p] = iteration;
                        todo.push_front(p);
                    }
                }
            }
            iteration += 1;
        }

        if !winning[0] {
            let mut res = self.verdict_dfa(false);
            res.set_controllable(dfa.controllable_variables().to_vec());
            return res;
        }
        for i in 0..n {
            if !winning[i] {
                states[i] = NodeRef::FALSE;
            }
        }
        let mut res = Mtdfa::new(self.session);
        res.aps = dfa.aps.clone();
        res.set_controllable(dfa.controllable_variables().to_vec());
        res.names = dfa.names.clone();
        res.states = states;
        res
    }

    /// Encode a whole automaton into an arena, e.g. for visualization.
    /// With `early_stop`, encoding ends as soon as the initial vertex is
    /// determined.
    pub fn to_arena(&mut self, dfa: &Mtdfa, early_stop: bool, preserve_names: bool) -> BackpropGraph {
        self.bdd.quantify_prepare(dfa.controllable_variables(), self.dict.len());
        let mut enc = BackpropEncoder::new(early_stop);
        let mut scratch = Vec::new();
        for i in 0..dfa.num_states() {
            let name = if preserve_names {
                Some(match dfa.names.get(i) {
                    Some(&f) => self.formulas.display(f).to_string(),
                    None => format!("state {}", i),
                })
            } else {
                None
            };
            let determined = enc.encode_state(
                &self.bdd,
                i as u32,
                dfa.states[i],
                name.as_deref(),
                &mut scratch,
                None,
                false,
            );
            scratch.clear();
            if determined && early_stop {
                break;
            }
        }
        enc.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::Semantics;
    use crate::translate::{SolveMode, SynthesisOptions, TranslateOptions, Translator};

    use test_log::test;

    /// G(req -> X grant) with input req and output grant is realizable.
    fn request_grant(t: &mut Translator) -> crate::formula::FormulaId {
        let req = t.formulas_mut().ap("req");
        let grant = t.formulas_mut().ap("grant");
        let xg = t.formulas_mut().next(grant);
        let imp = t.formulas_mut().implies(req, xg);
        t.formulas_mut().globally(imp)
    }

    #[test]
    fn test_winning_region_eager_vs_lazy() {
        let mut t = Translator::new();
        let f = request_grant(&mut t);
        let game = {
            let dfa = t.to_mtdfa(f, &TranslateOptions::default());
            let mut game = t.restrict_as_game(&dfa);
            game.set_controllable(vec![t.dict().lookup("grant").unwrap()]);
            game
        };
        let eager = t.winning_region(&game);
        let lazy = t.winning_region_lazy(&game);
        assert_eq!(eager[0], lazy[0]);
        assert!(eager[0], "the request/grant game is realizable");
    }

    #[test]
    fn test_three_valued_region_consistent() {
        let mut t = Translator::new();
        let f = request_grant(&mut t);
        let dfa = t.to_mtdfa(f, &TranslateOptions::default());
        let mut game = t.restrict_as_game(&dfa);
        game.set_controllable(vec![t.dict().lookup("grant").unwrap()]);
        let eager = t.winning_region(&game);
        let lazy3 = t.winning_region_lazy3(&game);
        for (i, w3) in lazy3.iter().enumerate() {
            if let Some(w) = w3 {
                assert_eq!(*w, eager[i], "state {} disagrees", i);
            }
        }
        assert_eq!(lazy3[0], Some(true));
    }

    #[test]
    fn test_synthesis_modes_agree_on_realizability() {
        for realizable in [true, false] {
            let mut results = Vec::new();
            for mode in [
                SolveMode::BfsNodeBackprop,
                SolveMode::DfsNodeBackprop,
                SolveMode::DfsStrictNodeBackprop,
                SolveMode::StateRefine,
            ] {
                let mut t = Translator::new();
                let f = if realizable {
                    request_grant(&mut t)
                } else {
                    // G req over the input req: the environment falsifies
                    // it on the very first letter.
                    let req = t.formulas_mut().ap("req");
                    t.formulas_mut().globally(req)
                };
                let opts = SynthesisOptions {
                    mode,
                    realizability: true,
                    ..SynthesisOptions::default()
                };
                let dfa = t.to_mtdfa_for_synthesis(f, &["grant"], &opts).unwrap();
                results.push(dfa.states[0] == NodeRef::TRUE);
            }
            assert!(
                results.iter().all(|&r| r == results[0]),
                "modes disagree: {:?}",
                results
            );
            assert_eq!(results[0], realizable);
        }
    }

    #[test]
    fn test_unrealizable_yields_ff_strategy() {
        // grant <-> req is unrealizable under Mealy semantics reversed:
        // with Moore ordering the controller commits grant before seeing
        // req, so it cannot match it.
        let mut t = Translator::new();
        let req = t.formulas_mut().ap("req");
        let grant = t.formulas_mut().ap("grant");
        let f = t.formulas_mut().equiv(grant, req);
        let opts = SynthesisOptions {
            semantics: Semantics::Moore,
            ..SynthesisOptions::default()
        };
        let dfa = t.to_mtdfa_for_synthesis(f, &["grant"], &opts).unwrap();
        assert_eq!(dfa.num_states(), 1);
        assert_eq!(dfa.states[0], NodeRef::FALSE);
    }

    #[test]
    fn test_mealy_matching_is_realizable() {
        // Under Mealy semantics the controller sees req first and can
        // match it, so grant <-> req is realizable.
        let mut t = Translator::new();
        let req = t.formulas_mut().ap("req");
        let grant = t.formulas_mut().ap("grant");
        let f = t.formulas_mut().equiv(grant, req);
        let dfa = t
            .to_mtdfa_for_synthesis(f, &["grant"], &SynthesisOptions::default())
            .unwrap();
        assert!(dfa.states[0] != NodeRef::FALSE);
        // The strategy accepts exactly the matched letters.
        let vreq = t.dict().lookup("req").unwrap();
        let vgrant = t.dict().lookup("grant").unwrap();
        assert!(dfa.accepts(t.bdd(), &[&[vreq, vgrant]]));
        assert!(dfa.accepts(t.bdd(), &[&[]]));
        assert!(!dfa.accepts(t.bdd(), &[&[vreq]]));
    }
}
