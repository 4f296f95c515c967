//! Boolean combinations of MTDFAs.
//!
//! `product` explores the reachable part of the pairing of two automata
//! under a Boolean connective.  Product states are pairs `(i, j)` of state
//! ordinals with two *sink* shortcuts: `-2` stands for the `ff` automaton
//! and `-1` for `tt`, so a pair can outlive one operand hitting a constant
//! (e.g. `(ff, j)` under `⇔`).  Pairs are interned on first sight and
//! queued; the `(tt,tt)` / `(ff,ff)` pairs collapse to the constants when
//! the combined may-stop bit allows.
//!
//! `complement` flips every leaf's may-stop bit (and swaps the constants);
//! determinism makes this a complete complementation.

use std::collections::VecDeque;

use hashbrown::HashMap;
use log::info;

use crate::cache::{dedicated_cache_bits, product_cache_bits};
use crate::dfa::Mtdfa;
use crate::error::Result;
use crate::formula::FormulaId;
use crate::mtbdd::{Apply1Op, Apply2Op, Cache1, Cache2, Mtbdd};
use crate::translate::{BoolOp, Translator};
use crate::types::{Leaf, NodeRef, Terminal};

/// Sink state standing for the `ff` automaton.
const SINK_FF: i32 = -2;
/// Sink state standing for the `tt` automaton.
const SINK_TT: i32 = -1;

struct PairInterner {
    map: HashMap<(i32, i32), u32>,
    todo: VecDeque<(i32, i32)>,
}

impl PairInterner {
    fn new() -> Self {
        PairInterner {
            map: HashMap::new(),
            todo: VecDeque::new(),
        }
    }

    /// The product-state ordinal of a pair, enqueueing it when new.
    fn ordinal(&mut self, left: i32, right: i32) -> u32 {
        if let Some(&v) = self.map.get(&(left, right)) {
            return v;
        }
        let v = self.map.len() as u32;
        self.map.insert((left, right), v);
        self.todo.push_back((left, right));
        v
    }
}

fn leaf_to_pair(leaf: Leaf) -> (i32, bool) {
    match leaf {
        Leaf::False => (SINK_FF, false),
        Leaf::True => (SINK_TT, true),
        Leaf::Terminal(t) => (t.ordinal() as i32, t.may_stop()),
    }
}

struct ProductCombine<'a> {
    pairs: &'a mut PairInterner,
    op: BoolOp,
}

impl Apply2Op for ProductCombine<'_> {
    fn shortcut(&self, left: NodeRef, right: NodeRef) -> Option<NodeRef> {
        match self.op {
            BoolOp::And if left.is_false() || right.is_false() => Some(NodeRef::FALSE),
            BoolOp::Or if left.is_true() || right.is_true() => Some(NodeRef::TRUE),
            BoolOp::Implies if left.is_false() || right.is_true() => Some(NodeRef::TRUE),
            _ => None,
        }
    }

    fn combine(&mut self, bdd: &mut Mtbdd, left: Leaf, right: Leaf) -> NodeRef {
        // Two constants settle immediately for every connective.
        if let (Leaf::False | Leaf::True, Leaf::False | Leaf::True) = (left, right) {
            let l = matches!(left, Leaf::True);
            let r = matches!(right, Leaf::True);
            return bdd.constant(self.op.stop_bit(l, r));
        }
        let (ls, lb) = leaf_to_pair(left);
        let (rs, rb) = leaf_to_pair(right);
        let stop = self.op.stop_bit(lb, rb);
        if ls == SINK_FF && rs == SINK_FF && !stop {
            return NodeRef::FALSE;
        }
        if ls == SINK_TT && rs == SINK_TT && stop {
            return NodeRef::TRUE;
        }
        bdd.terminal(Terminal::new(self.pairs.ordinal(ls, rs), stop))
    }
}

fn state_bdd(dfa: &Mtdfa, s: i32) -> NodeRef {
    match s {
        SINK_FF => NodeRef::FALSE,
        SINK_TT => NodeRef::TRUE,
        _ => dfa.states[s as usize],
    }
}

struct FlipOp;

impl Apply1Op for FlipOp {
    fn map_leaf(&mut self, bdd: &mut Mtbdd, leaf: Leaf) -> NodeRef {
        match leaf {
            Leaf::False => NodeRef::TRUE,
            Leaf::True => NodeRef::FALSE,
            Leaf::Terminal(t) => bdd.terminal(t.flipped()),
        }
    }
}

impl Translator {
    /// The synchronous product of two automata of this session under a
    /// Boolean connective.  Fails with
    /// [`DictionaryMismatch`](crate::error::Error::DictionaryMismatch) if
    /// either automaton comes from a different session.
    pub fn product(&mut self, left: &Mtdfa, right: &Mtdfa, op: BoolOp) -> Result<Mtdfa> {
        self.check_session(left)?;
        self.check_session(right)?;

        let mut res = Mtdfa::new(self.session);
        res.aps = {
            let mut aps = left.aps.clone();
            aps.extend_from_slice(&right.aps);
            aps.sort_unstable();
            aps.dedup();
            aps
        };
        let want_names = left.names.len() == left.states.len()
            && right.names.len() == right.states.len();

        let mut pairs = PairInterner::new();
        pairs.ordinal(0, 0); // seed the worklist with the initial pair
        let mut cache = Cache2::new(product_cache_bits(
            left.num_states(),
            right.num_states(),
            res.aps.len(),
        ));

        while let Some((ls, rs)) = pairs.todo.pop_front() {
            let lb = state_bdd(left, ls);
            let rb = state_bdd(right, rs);
            let b = {
                let mut comb = ProductCombine {
                    pairs: &mut pairs,
                    op,
                };
                self.bdd.apply2(lb, rb, &mut comb, &mut cache, 0)
            };
            res.states.push(b);
            if want_names {
                let ln = self.pair_name(left, ls);
                let rn = self.pair_name(right, rs);
                let name = match op {
                    BoolOp::And => self.formulas.and([ln, rn]),
                    BoolOp::Or => self.formulas.or([ln, rn]),
                    BoolOp::Implies => self.formulas.implies(ln, rn),
                    BoolOp::Equiv => self.formulas.equiv(ln, rn),
                    BoolOp::Xor => self.formulas.xor(ln, rn),
                };
                res.names.push(name);
            }
        }
        info!(
            "product({:?}): {}x{} -> {} states",
            op,
            left.num_states(),
            right.num_states(),
            res.num_states()
        );
        Ok(res)
    }

    fn pair_name(&self, dfa: &Mtdfa, s: i32) -> FormulaId {
        match s {
            SINK_FF => self.formulas.ff(),
            SINK_TT => self.formulas.tt(),
            _ => dfa.names[s as usize],
        }
    }

    /// The complement automaton: same diagrams with every may-stop bit
    /// flipped and the constants swapped.
    pub fn complement(&mut self, dfa: &Mtdfa) -> Result<Mtdfa> {
        self.check_session(dfa)?;
        let mut res = Mtdfa::new(self.session);
        res.aps = dfa.aps.clone();
        res.set_controllable(dfa.controllable_variables().to_vec());

        let mut cache = Cache1::new(dedicated_cache_bits(dfa.num_states(), dfa.aps.len()));
        for &state in &dfa.states {
            let flipped = self.bdd.apply1(state, &mut FlipOp, &mut cache, 0);
            res.states.push(flipped);
        }
        for &name in &dfa.names {
            let negated = self.formulas.not(name);
            res.names.push(negated);
        }
        Ok(res)
    }
}
