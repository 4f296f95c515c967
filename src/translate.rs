//! The LTLf → MTDFA translator.
//!
//! A [`Translator`] is a *session*: it owns the formula arena, the variable
//! dictionary, the MTBDD manager, the terminal-interning table and the
//! operation caches.  Sessions are single-threaded and independent; automata
//! from different sessions cannot be combined.
//!
//! The central operation is `τ` ([`Translator::tau`]): for a formula `f` it
//! builds an MTBDD over the atomic propositions whose leaves are terminals
//! `(g, b)` — after reading a letter satisfying the cube, the rest of the
//! trace must satisfy `g`, and the trace may stop right there (accepted)
//! iff `b`.  States are discovered by exploring the formulas found on
//! leaves; [`Translator::to_mtdfa`] drives this as a BFS or DFS worklist.
//!
//! For synthesis, [`Translator::to_mtdfa_for_synthesis`] fuses translation
//! with game solving: each new state is encoded into a backpropagation
//! arena the moment it is translated, and exploration stops as soon as the
//! initial state is determined.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use hashbrown::{HashMap, HashSet};
use log::{debug, info};

use crate::cache::{dedicated_cache_bits, Cache};
use crate::dfa::Mtdfa;
use crate::dict::{Semantics, VarDict};
use crate::error::{Error, Result};
use crate::formula::{FormulaId, FormulaKind, Formulas};
use crate::games::BackpropEncoder;
use crate::mtbdd::{
    AcceptingValue, Apply1Op, Apply2Op, BoolCache, Cache1, Cache2, ChoiceOp, Mtbdd, SynthCache,
    SynthesisOp,
};
use crate::onestep::{one_step_sat_rewrite, one_step_unsat_rewrite};
use crate::types::{Leaf, NodeRef, Terminal, Var};

static NEXT_SESSION: AtomicU32 = AtomicU32::new(0);

// Operations sharing the session apply cache are distinguished by key.
const KEY_AND: u32 = 1;
const KEY_OR: u32 = 2;
const KEY_IMPLIES: u32 = 3;
const KEY_EQUIV: u32 = 4;
const KEY_XOR: u32 = 5;

/// A Boolean connective usable to meld two automata or two successor
/// diagrams.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BoolOp {
    And,
    Or,
    Implies,
    Equiv,
    Xor,
}

impl BoolOp {
    fn cache_key(self) -> u32 {
        match self {
            BoolOp::And => KEY_AND,
            BoolOp::Or => KEY_OR,
            BoolOp::Implies => KEY_IMPLIES,
            BoolOp::Equiv => KEY_EQUIV,
            BoolOp::Xor => KEY_XOR,
        }
    }

    /// Combine two may-stop bits.
    pub fn stop_bit(self, l: bool, r: bool) -> bool {
        match self {
            BoolOp::And => l && r,
            BoolOp::Or => l || r,
            BoolOp::Implies => !l || r,
            BoolOp::Equiv => l == r,
            BoolOp::Xor => l != r,
        }
    }
}

/// Options for plain translation.
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    /// Fuse states whose successor diagrams are structurally equal.
    pub fuse_same_bdds: bool,
    /// Collapse automata without accepting (resp. rejecting) leaves to the
    /// 1-state `ff` (resp. `tt`) automaton.
    pub detect_empty_universal: bool,
    /// Breadth-first exploration; depth-first otherwise.
    pub bfs: bool,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        TranslateOptions {
            fuse_same_bdds: true,
            detect_empty_universal: true,
            bfs: true,
        }
    }
}

/// How the synthesis game is solved.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SolveMode {
    /// On-the-fly BFS exploration with node-level backpropagation.
    #[default]
    BfsNodeBackprop,
    /// On-the-fly DFS exploration with node-level backpropagation,
    /// re-traversing shared nodes to collect all undetermined successors.
    DfsNodeBackprop,
    /// Strict DFS: never propagates through already-seen states.
    DfsStrictNodeBackprop,
    /// Translate the full (game-restricted) automaton first, then solve by
    /// lazy state-level refinement.
    StateRefine,
}

/// Options for synthesis.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    pub mode: SolveMode,
    /// Only decide realizability; the result is the 1-state `tt` or `ff`
    /// automaton.
    pub realizability: bool,
    /// Try the one-step sat/unsat shortcuts before translating a state.
    pub one_step_preprocess: bool,
    pub fuse_same_bdds: bool,
    pub semantics: Semantics,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        SynthesisOptions {
            mode: SolveMode::default(),
            realizability: false,
            one_step_preprocess: true,
            fuse_same_bdds: true,
            semantics: Semantics::Mealy,
        }
    }
}

/// A translation session.
pub struct Translator {
    pub(crate) formulas: Formulas,
    pub(crate) dict: VarDict,
    pub(crate) bdd: Mtbdd,
    /// State ordinal → canonical formula.
    pub(crate) int_to_formula: Vec<FormulaId>,
    formula_to_int: HashMap<FormulaId, u32>,
    /// Formula → fingerprint variable (APs and anonymous stand-ins).
    formula_to_var: HashMap<FormulaId, Var>,
    /// Propositional fingerprint → canonical representative.
    propeq: HashMap<NodeRef, FormulaId>,
    /// τ memoization.
    formula_to_bdd: HashMap<FormulaId, NodeRef>,
    /// Shared cache for the leaf-combining melds of τ.
    apply_cache: Cache2,
    /// Session-lived caches for game projection during on-the-fly solving.
    strat_cache: SynthCache,
    value_cache: BoolCache,
    simplify_terms: bool,
    pub(crate) session: u32,
}

impl Default for Translator {
    fn default() -> Self {
        Translator::new()
    }
}

impl Translator {
    pub fn new() -> Self {
        Self::with_simplify_terms(true)
    }

    /// `simplify_terms` enables the cheap temporal absorptions applied
    /// before propositional canonicalization.
    pub fn with_simplify_terms(simplify_terms: bool) -> Self {
        Translator {
            formulas: Formulas::new(),
            dict: VarDict::new(),
            bdd: Mtbdd::default(),
            int_to_formula: Vec::with_capacity(32),
            formula_to_int: HashMap::new(),
            formula_to_var: HashMap::new(),
            propeq: HashMap::new(),
            formula_to_bdd: HashMap::new(),
            apply_cache: Cache::new(18),
            strat_cache: Cache::new(16),
            value_cache: Cache::new(16),
            simplify_terms,
            session: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn formulas(&self) -> &Formulas {
        &self.formulas
    }

    pub fn formulas_mut(&mut self) -> &mut Formulas {
        &mut self.formulas
    }

    pub fn dict(&self) -> &VarDict {
        &self.dict
    }

    pub fn bdd(&self) -> &Mtbdd {
        &self.bdd
    }

    /// The canonical formula behind a state (interning) ordinal.
    pub fn state_formula(&self, ordinal: u32) -> FormulaId {
        self.int_to_formula[ordinal as usize]
    }

    /// The `(next formula, may-stop)` reading of a leaf.
    pub fn leaf_formula(&self, leaf: Leaf) -> (FormulaId, bool) {
        match leaf {
            Leaf::False => (self.formulas.ff(), false),
            Leaf::True => (self.formulas.tt(), true),
            Leaf::Terminal(t) => (self.int_to_formula[t.ordinal() as usize], t.may_stop()),
        }
    }

    fn parts(&mut self) -> (&mut Mtbdd, &mut Cache2, TermOps<'_>) {
        (
            &mut self.bdd,
            &mut self.apply_cache,
            TermOps {
                formulas: &mut self.formulas,
                dict: &mut self.dict,
                int_to_formula: &mut self.int_to_formula,
                formula_to_int: &mut self.formula_to_int,
                formula_to_var: &mut self.formula_to_var,
                propeq: &mut self.propeq,
                simplify_terms: self.simplify_terms,
            },
        )
    }

    /// A representative of the propositional equivalence class of `f`
    /// (identity for non-Boolean top operators).
    pub fn propeq_representative(&mut self, f: FormulaId) -> FormulaId {
        let (bdd, _, mut ops) = self.parts();
        ops.representative(bdd, f)
    }

    /// The interning ordinal of a formula, canonicalizing first.
    pub fn formula_ordinal(&mut self, f: FormulaId) -> u32 {
        let (bdd, _, mut ops) = self.parts();
        ops.state_ordinal(bdd, f)
    }

    /// The terminal MTBDD for `(f, may_stop)`, with the `(tt,⊤) → 1` and
    /// `(ff,⊥) → 0` collapses applied.
    pub fn terminal_bdd(&mut self, f: FormulaId, may_stop: bool) -> NodeRef {
        let (bdd, _, mut ops) = self.parts();
        ops.terminal_bdd(bdd, f, may_stop)
    }

    fn combine2(&mut self, left: NodeRef, right: NodeRef, op: BoolOp) -> NodeRef {
        let key = op.cache_key();
        let (bdd, cache, mut ops) = self.parts();
        let mut comb = BoolCombine { ops: &mut ops, op };
        bdd.apply2(left, right, &mut comb, cache, key)
    }

    fn combine_not(&mut self, b: NodeRef) -> NodeRef {
        // Negation rewrites each leaf independently; no cache needed beyond
        // the structural sharing of the result.
        let (bdd, _, mut ops) = self.parts();
        let mut comb = NotCombine { ops: &mut ops };
        let mut cache = Cache1::new(14);
        bdd.apply1(b, &mut comb, &mut cache, 0)
    }

    /// The symbolic successor function τ.
    ///
    /// The result is an MTBDD over the atomic propositions of `f` whose
    /// leaves encode `(next formula, may-stop)` pairs.  Memoized for the
    /// whole session.
    pub fn tau(&mut self, f: FormulaId) -> NodeRef {
        if let Some(&b) = self.formula_to_bdd.get(&f) {
            return b;
        }
        let boolean = self.formulas.is_boolean(f);
        let res = match self.formulas.kind(f).clone() {
            FormulaKind::True => NodeRef::TRUE,
            FormulaKind::False => NodeRef::FALSE,
            FormulaKind::Ap(name) => {
                let v = self.dict.register(&name);
                self.bdd.mk_var(v)
            }
            FormulaKind::Not(a) => {
                // Purely Boolean subformulas use the regular BDD operators
                // so the cache entries are long lived.
                let sub = self.tau(a);
                if boolean {
                    self.bdd.apply_not(sub)
                } else {
                    self.combine_not(sub)
                }
            }
            FormulaKind::And(subs) => {
                let mut res = self.tau(subs[0]);
                for &sub in &subs[1..] {
                    let r = self.tau(sub);
                    res = if boolean {
                        self.bdd.apply_and(res, r)
                    } else {
                        self.combine2(res, r, BoolOp::And)
                    };
                }
                res
            }
            FormulaKind::Or(subs) => {
                let mut res = self.tau(subs[0]);
                for &sub in &subs[1..] {
                    let r = self.tau(sub);
                    res = if boolean {
                        self.bdd.apply_or(res, r)
                    } else {
                        self.combine2(res, r, BoolOp::Or)
                    };
                }
                res
            }
            FormulaKind::Xor(a, b) => {
                let l = self.tau(a);
                let r = self.tau(b);
                if boolean {
                    self.bdd.apply_xor(l, r)
                } else {
                    self.combine2(l, r, BoolOp::Xor)
                }
            }
            FormulaKind::Implies(a, b) => {
                let l = self.tau(a);
                let r = self.tau(b);
                if boolean {
                    self.bdd.apply_imp(l, r)
                } else {
                    self.combine2(l, r, BoolOp::Implies)
                }
            }
            FormulaKind::Equiv(a, b) => {
                let l = self.tau(a);
                let r = self.tau(b);
                if boolean {
                    self.bdd.apply_eq(l, r)
                } else {
                    self.combine2(l, r, BoolOp::Equiv)
                }
            }
            FormulaKind::Next(a) => self.terminal_bdd(a, true),
            FormulaKind::StrongNext(a) => self.terminal_bdd(a, false),
            FormulaKind::Until(a, b) => {
                // τ(b) ∨ (τ(a) ∧ (f, continue))
                let ta = self.tau(a);
                let tb = self.tau(b);
                let term = self.terminal_bdd(f, false);
                let cont = self.combine2(ta, term, BoolOp::And);
                self.combine2(tb, cont, BoolOp::Or)
            }
            FormulaKind::WeakUntil(a, b) => {
                let ta = self.tau(a);
                let tb = self.tau(b);
                let term = self.terminal_bdd(f, true);
                let cont = self.combine2(ta, term, BoolOp::And);
                self.combine2(tb, cont, BoolOp::Or)
            }
            FormulaKind::Release(a, b) => {
                // τ(b) ∧ (τ(a) ∨ (f, may stop))
                let ta = self.tau(a);
                let tb = self.tau(b);
                let term = self.terminal_bdd(f, true);
                let rel = self.combine2(ta, term, BoolOp::Or);
                self.combine2(tb, rel, BoolOp::And)
            }
            FormulaKind::StrongRelease(a, b) => {
                let ta = self.tau(a);
                let tb = self.tau(b);
                let term = self.terminal_bdd(f, false);
                let rel = self.combine2(ta, term, BoolOp::Or);
                self.combine2(tb, rel, BoolOp::And)
            }
            FormulaKind::Globally(a) => {
                let ta = self.tau(a);
                let term = self.terminal_bdd(f, true);
                self.combine2(ta, term, BoolOp::And)
            }
            FormulaKind::Finally(a) => {
                let ta = self.tau(a);
                let term = self.terminal_bdd(f, false);
                self.combine2(ta, term, BoolOp::Or)
            }
        };
        self.formula_to_bdd.insert(f, res);
        res
    }

    fn quantify_prepare_maybe(&mut self, outputs: &[Var]) {
        // Translating can register new variables as a side effect; the
        // quantification flags must then be rebuilt.
        let n = self.dict.len();
        if self.bdd.prepared_vars() != n {
            self.bdd.quantify_prepare(outputs, n);
        }
    }

    /// Translate `f` into an MTDFA.
    pub fn to_mtdfa(&mut self, f: FormulaId, opts: &TranslateOptions) -> Mtdfa {
        self.translate_worklist(
            f,
            opts.fuse_same_bdds,
            opts.detect_empty_universal,
            opts.bfs,
            None,
        )
    }

    /// Translate `f` and solve the synthesis game over the given output
    /// propositions.  Every atomic proposition of `f` not listed is an
    /// input.
    ///
    /// With `realizability` the result is the 1-state `tt` (realizable) or
    /// `ff` (unrealizable) automaton; otherwise it is a winning-strategy
    /// MTDFA, the 1-state `ff` automaton signalling unrealizability.
    pub fn to_mtdfa_for_synthesis(
        &mut self,
        f: FormulaId,
        outputs: &[&str],
        opts: &SynthesisOptions,
    ) -> Result<Mtdfa> {
        // The game-projection caches are only valid for one partition.
        self.strat_cache.clear();
        self.value_cache.clear();

        let output_set: HashSet<&str> = outputs.iter().copied().collect();
        let aps = self.formulas.aps(f);
        let ins: Vec<&str> = aps
            .iter()
            .map(|n| n.as_str())
            .filter(|n| !output_set.contains(n))
            .collect();
        let outs: Vec<&str> = aps
            .iter()
            .map(|n| n.as_str())
            .filter(|n| output_set.contains(n))
            .collect();
        // The registration order decides the variable order: whoever moves
        // first sits above.
        let out_vars: Vec<Var> = match opts.semantics {
            Semantics::Mealy => {
                for name in &ins {
                    self.dict.register(name);
                }
                outs.iter().map(|name| self.dict.register(name)).collect()
            }
            Semantics::Moore => {
                let vars = outs.iter().map(|name| self.dict.register(name)).collect();
                for name in &ins {
                    self.dict.register(name);
                }
                vars
            }
        };
        self.bdd.quantify_prepare(&out_vars, self.dict.len());

        let setup = SynthSetup {
            outputs: out_vars.clone(),
            do_backprop: !matches!(opts.mode, SolveMode::StateRefine),
            realizability: opts.realizability,
            preprocess: opts.one_step_preprocess,
        };
        let mut dfa = match opts.mode {
            SolveMode::BfsNodeBackprop => {
                self.translate_worklist(f, opts.fuse_same_bdds, false, true, Some(setup))
            }
            SolveMode::DfsNodeBackprop => {
                self.translate_worklist(f, opts.fuse_same_bdds, false, false, Some(setup))
            }
            SolveMode::DfsStrictNodeBackprop => self.synthesis_dfs_strict(f, &setup),
            SolveMode::StateRefine => {
                let mut game = self.translate_worklist(f, opts.fuse_same_bdds, true, true, Some(setup));
                game.set_controllable(out_vars.clone());
                if opts.realizability {
                    let region = self.winning_region_lazy(&game);
                    let verdict = region[0];
                    self.verdict_dfa(verdict)
                } else {
                    self.winning_strategy(&game, false)
                }
            }
        };
        dfa.set_controllable(out_vars);
        Ok(dfa)
    }

    /// A fresh 1-state `tt`/`ff` automaton.
    pub(crate) fn verdict_dfa(&mut self, winning: bool) -> Mtdfa {
        let mut dfa = Mtdfa::new(self.session);
        if winning {
            dfa.states.push(NodeRef::TRUE);
            dfa.names.push(self.formulas.tt());
        } else {
            dfa.states.push(NodeRef::FALSE);
            dfa.names.push(self.formulas.ff());
        }
        dfa
    }

    /// Project a successor diagram for game solving: accepting leaves
    /// become `1`; the Boolean game value of the root is returned with it.
    fn restrict_map_true(&mut self, b: NodeRef) -> (NodeRef, bool) {
        let Translator { bdd, strat_cache, .. } = self;
        bdd.restrict_winning(b, &mut MapTrueOp, strat_cache, 0)
    }

    /// The Boolean game value of a diagram where only accepting leaves win.
    fn accepting_value(&mut self, b: NodeRef) -> bool {
        let Translator { bdd, value_cache, .. } = self;
        bdd.quantify_bool(b, &mut AcceptingValue, value_cache, 0)
    }

    /// The shared worklist of translation and on-the-fly synthesis.
    fn translate_worklist(
        &mut self,
        f: FormulaId,
        fuse_same_bdds: bool,
        detect_empty_universal: bool,
        bfs: bool,
        synth: Option<SynthSetup>,
    ) -> Mtdfa {
        let mut dfa = Mtdfa::new(self.session);
        {
            let ap_names = self.formulas.aps(f);
            let mut vars: Vec<Var> = ap_names.iter().map(|n| self.dict.register(n)).collect();
            vars.sort_unstable();
            dfa.aps = vars;
        }

        let mut encoder = match &synth {
            Some(s) if s.do_backprop => Some(BackpropEncoder::new(true)),
            _ => None,
        };

        let mut bdd_to_state: HashMap<NodeRef, u32> = HashMap::new();
        let mut terminal_to_state: HashMap<u32, u32> = HashMap::new();
        let mut states: Vec<NodeRef> = Vec::new();
        let mut names: Vec<FormulaId> = Vec::new();
        let mut new_rootnums: Vec<u32> = Vec::new();
        let mut todo: VecDeque<FormulaId> = VecDeque::new();

        let init_term = self.formula_ordinal(f);
        let mut has_accepting = false;
        let mut has_rejecting = false;

        todo.push_back(f);
        while !todo.is_empty() {
            let label = if bfs {
                todo.pop_front().unwrap()
            } else {
                todo.pop_back().unwrap()
            };
            let label_term = self.formula_ordinal(label);
            if terminal_to_state.contains_key(&label_term) {
                continue; // already processed
            }

            let mut b = NodeRef::FALSE;
            let mut b_done = false;

            if let Some(s) = &synth {
                if s.preprocess && !self.formulas.is_boolean(label) {
                    let outputs = s.outputs.clone();
                    // Can the trace be allowed to end right now?
                    let g = one_step_sat_rewrite(&mut self.formulas, label);
                    b = self.tau(g);
                    self.quantify_prepare_maybe(&outputs);
                    if self.accepting_value(b) {
                        b_done = true;
                        if s.realizability {
                            b = NodeRef::TRUE;
                        }
                        if let Some(enc) = &mut encoder {
                            enc.encode_state(&self.bdd, label_term, b, None, &mut new_rootnums, None, false);
                        }
                    } else {
                        // Is the whole state a lost cause?
                        let g = one_step_unsat_rewrite(&mut self.formulas, label, false);
                        let b2 = self.tau(g);
                        self.quantify_prepare_maybe(&outputs);
                        if !self.accepting_value(b2) {
                            b_done = true;
                            b = NodeRef::FALSE;
                            if let Some(enc) = &mut encoder {
                                enc.encode_state(
                                    &self.bdd,
                                    label_term,
                                    b,
                                    None,
                                    &mut new_rootnums,
                                    None,
                                    false,
                                );
                            }
                        }
                    }
                }
            }

            if !b_done {
                b = self.tau(label);
                if let Some(s) = &synth {
                    let outputs = s.outputs.clone();
                    self.quantify_prepare_maybe(&outputs);
                    if s.realizability && self.formulas.is_boolean(label) {
                        let av = self.accepting_value(b);
                        b = self.bdd.constant(av);
                    } else {
                        let (restricted, _) = self.restrict_map_true(b);
                        b = restricted;
                    }
                    if let Some(enc) = &mut encoder {
                        enc.encode_state(&self.bdd, label_term, b, None, &mut new_rootnums, None, false);
                    }
                }
            }

            if fuse_same_bdds {
                if let Some(&s) = bdd_to_state.get(&b) {
                    terminal_to_state.insert(label_term, s);
                    continue;
                }
            }
            let n = states.len() as u32;
            debug!("state {} <- {}", n, self.formulas.display(label));
            bdd_to_state.insert(b, n);
            states.push(b);
            names.push(label);
            terminal_to_state.insert(label_term, n);

            if let Some(enc) = &encoder {
                if enc.root_is_determined(init_term) {
                    break;
                }
                if enc.root_is_determined(label_term) {
                    new_rootnums.clear();
                    continue;
                }
                for root in new_rootnums.drain(..) {
                    todo.push_back(self.int_to_formula[root as usize]);
                }
                continue;
            }

            for leaf_node in self.bdd.leaves(b) {
                match self.bdd.leaf(leaf_node).unwrap() {
                    Leaf::False => has_rejecting = true,
                    Leaf::True => has_accepting = true,
                    Leaf::Terminal(t) => {
                        if t.may_stop() {
                            has_accepting = true;
                        } else {
                            has_rejecting = true;
                        }
                        if !terminal_to_state.contains_key(&t.ordinal()) {
                            todo.push_back(self.int_to_formula[t.ordinal() as usize]);
                        }
                    }
                }
            }
        }

        if let Some(s) = &synth {
            if let Some(enc) = encoder {
                if s.realizability {
                    let winning = enc.root_winner(init_term);
                    info!(
                        "on-the-fly solving: {} after {} states",
                        if winning { "realizable" } else { "unrealizable" },
                        states.len()
                    );
                    let verdict = self.verdict_dfa(winning);
                    dfa.states = verdict.states;
                    dfa.names = verdict.names;
                    return dfa;
                }
                if !enc.root_winner(init_term) {
                    // Unrealizable: the strategy is the 1-state ff automaton.
                    let verdict = self.verdict_dfa(false);
                    dfa.states = verdict.states;
                    dfa.names = verdict.names;
                    return dfa;
                }
                self.finalize_strategy(&mut states, &enc, &terminal_to_state, dfa.aps.len());
                dfa.states = states;
                dfa.names = names;
                return dfa;
            }
        }

        if detect_empty_universal {
            if !has_accepting {
                let verdict = self.verdict_dfa(false);
                dfa.states = verdict.states;
                dfa.names = verdict.names;
                return dfa;
            }
            if !has_rejecting {
                let verdict = self.verdict_dfa(true);
                dfa.states = verdict.states;
                dfa.names = verdict.names;
                return dfa;
            }
        }

        // The terminals still carry interning ordinals; remap them to the
        // state numbering.
        let bits = dedicated_cache_bits(states.len(), dfa.aps.len());
        let mut cache = Cache1::new(bits);
        let mut rename = RenameOp {
            map: &terminal_to_state,
        };
        for state in states.iter_mut() {
            *state = self.bdd.apply1(*state, &mut rename, &mut cache, 0);
        }
        info!("translated {} states over {} APs", states.len(), dfa.aps.len());
        dfa.states = states;
        dfa.names = names;
        dfa
    }

    /// Strict-DFS on-the-fly synthesis: successors of a state are explored
    /// before backtracking, and propagation never re-traverses states that
    /// are already on the path (avoiding cycles).
    fn synthesis_dfs_strict(&mut self, f: FormulaId, setup: &SynthSetup) -> Mtdfa {
        let mut dfa = Mtdfa::new(self.session);
        {
            let ap_names = self.formulas.aps(f);
            let mut vars: Vec<Var> = ap_names.iter().map(|n| self.dict.register(n)).collect();
            vars.sort_unstable();
            dfa.aps = vars;
        }

        let mut encoder = BackpropEncoder::new(true);
        let mut terminal_to_state: HashMap<u32, u32> = HashMap::new();
        let mut states: Vec<NodeRef> = Vec::new();
        let mut names: Vec<FormulaId> = Vec::new();
        let mut new_rootnums: Vec<u32> = Vec::new();
        let mut old_rootnums: Vec<u32> = Vec::new();
        // Stack of interning ordinals left to process.
        let mut todo: Vec<u32> = Vec::new();
        // An entry (state, size) means: when todo is back down to `size`,
        // all successors of `state` have been processed; backtrack.
        let mut prev: Vec<(u32, usize)> = Vec::new();

        let init_term = self.formula_ordinal(f);
        prev.push((init_term, 0));
        todo.push(init_term);

        while !todo.is_empty() || !prev.is_empty() {
            let Some(&(prev_state, size)) = prev.last() else {
                break;
            };
            if todo.len() >= size && encoder.root_is_determined(prev_state) {
                // No need to explore the remaining successors.
                todo.truncate(size);
                prev.pop();
                continue;
            }
            if todo.len() == size {
                // All successors explored without determining prev_state.
                // It cannot be declared losing: some successors may sit on
                // the path leading here.
                prev.pop();
                continue;
            }
            let label_term = todo.pop().unwrap();
            if terminal_to_state.contains_key(&label_term) {
                continue;
            }
            let label = self.int_to_formula[label_term as usize];

            let mut b = NodeRef::FALSE;
            let mut b_done = false;
            if setup.preprocess && !self.formulas.is_boolean(label) {
                let g = one_step_sat_rewrite(&mut self.formulas, label);
                b = self.tau(g);
                self.quantify_prepare_maybe(&setup.outputs);
                if self.accepting_value(b) {
                    b_done = true;
                    if setup.realizability {
                        b = NodeRef::TRUE;
                    }
                    encoder.encode_state(
                        &self.bdd,
                        label_term,
                        b,
                        None,
                        &mut new_rootnums,
                        Some(&mut old_rootnums),
                        false,
                    );
                } else {
                    let g = one_step_unsat_rewrite(&mut self.formulas, label, false);
                    let b2 = self.tau(g);
                    self.quantify_prepare_maybe(&setup.outputs);
                    if !self.accepting_value(b2) {
                        b_done = true;
                        b = NodeRef::FALSE;
                        encoder.encode_state(
                            &self.bdd,
                            label_term,
                            b,
                            None,
                            &mut new_rootnums,
                            Some(&mut old_rootnums),
                            false,
                        );
                    }
                }
            }
            if !b_done {
                b = self.tau(label);
                self.quantify_prepare_maybe(&setup.outputs);
                if setup.realizability && self.formulas.is_boolean(label) {
                    let av = self.accepting_value(b);
                    b = self.bdd.constant(av);
                } else {
                    let (restricted, _) = self.restrict_map_true(b);
                    b = restricted;
                }
                encoder.encode_state(
                    &self.bdd,
                    label_term,
                    b,
                    None,
                    &mut new_rootnums,
                    Some(&mut old_rootnums),
                    true,
                );
            }

            let n = states.len() as u32;
            states.push(b);
            names.push(label);
            terminal_to_state.insert(label_term, n);

            if encoder.root_is_determined(init_term) {
                break;
            }
            if encoder.root_is_determined(label_term) {
                new_rootnums.clear();
                old_rootnums.clear();
                continue;
            }
            // Schedule all successors in DFS order.
            prev.push((label_term, todo.len()));
            for root in new_rootnums.drain(..) {
                todo.push(root);
            }
            for root in old_rootnums.drain(..) {
                if !terminal_to_state.contains_key(&root) {
                    todo.push(root);
                }
            }
        }

        if setup.realizability {
            let winning = encoder.root_winner(init_term);
            let verdict = self.verdict_dfa(winning);
            dfa.states = verdict.states;
            dfa.names = verdict.names;
            return dfa;
        }
        if !encoder.root_winner(init_term) {
            let verdict = self.verdict_dfa(false);
            dfa.states = verdict.states;
            dfa.names = verdict.names;
            return dfa;
        }
        self.finalize_strategy(&mut states, &encoder, &terminal_to_state, dfa.aps.len());
        dfa.states = states;
        dfa.names = names;
        dfa
    }

    /// Rewrite explored states into the strategy automaton: committed
    /// choices at output nodes, `1` for accepting leaves, `0` for losing
    /// ones, state-renumbered terminals for the rest.
    fn finalize_strategy(
        &mut self,
        states: &mut [NodeRef],
        enc: &BackpropEncoder,
        terminal_to_state: &HashMap<u32, u32>,
        num_aps: usize,
    ) {
        let bits = dedicated_cache_bits(states.len(), num_aps);
        let mut cache = Cache1::new(bits);
        let mut op = StrategyOp {
            enc,
            remap: Some(terminal_to_state),
        };
        for state in states.iter_mut() {
            *state = self.bdd.restrict_with_choice(*state, &mut op, &mut cache, 0);
        }
    }
}

/// Parameters of a synthesis run, after registration of the partition.
pub(crate) struct SynthSetup {
    pub outputs: Vec<Var>,
    pub do_backprop: bool,
    pub realizability: bool,
    pub preprocess: bool,
}

////////////////////////////////////////////////////////////////////////
//              terminal interning and canonicalization               //
////////////////////////////////////////////////////////////////////////

/// The split-borrow view of the translator used by leaf combiners: the
/// MTBDD manager travels separately so apply callbacks can create nodes.
pub(crate) struct TermOps<'a> {
    pub formulas: &'a mut Formulas,
    pub dict: &'a mut VarDict,
    pub int_to_formula: &'a mut Vec<FormulaId>,
    pub formula_to_int: &'a mut HashMap<FormulaId, u32>,
    pub formula_to_var: &'a mut HashMap<FormulaId, Var>,
    pub propeq: &'a mut HashMap<NodeRef, FormulaId>,
    pub simplify_terms: bool,
}

impl TermOps<'_> {
    /// Propositional-equivalence canonicalization with cheap temporal
    /// absorptions.  Returns `f` unchanged when its top operator is not
    /// Boolean.
    ///
    /// Each maximal non-Boolean subformula gets its own anonymous
    /// fingerprint variable, so two formulas that differ in distinct (even
    /// propositionally-similar) temporal subformulas fingerprint apart.
    /// That keeps the canonicalization sound but incomplete; completing it
    /// would not merge states anyway, because distinct temporal subformulas
    /// have distinct successor behaviour.
    fn representative(&mut self, bdd: &mut Mtbdd, mut f: FormulaId) -> FormulaId {
        loop {
            match self.formulas.kind(f).clone() {
                FormulaKind::And(subs) => {
                    if !self.simplify_terms {
                        break;
                    }
                    // (α M β) ∧ β ≡ (α M β)
                    // (α R β) ∧ β ≡ (α R β)
                    // Gα ∧ α ≡ Gα
                    let mut removable: HashSet<FormulaId> = HashSet::new();
                    for &sub in &subs {
                        match self.formulas.kind(sub) {
                            FormulaKind::StrongRelease(_, b) | FormulaKind::Release(_, b) => {
                                removable.insert(*b);
                            }
                            FormulaKind::Globally(a) => {
                                removable.insert(*a);
                            }
                            _ => {}
                        }
                    }
                    if removable.is_empty() {
                        break;
                    }
                    let kept: Vec<FormulaId> =
                        subs.iter().copied().filter(|s| !removable.contains(s)).collect();
                    if kept.len() == subs.len() {
                        break;
                    }
                    f = self.formulas.and(kept);
                }
                FormulaKind::Or(subs) => {
                    if !self.simplify_terms {
                        break;
                    }
                    // (α U β) ∨ β ≡ (α U β)
                    // (α W β) ∨ β ≡ (α W β)
                    // Fα ∨ α ≡ Fα
                    let mut removable: HashSet<FormulaId> = HashSet::new();
                    for &sub in &subs {
                        match self.formulas.kind(sub) {
                            FormulaKind::Until(_, b) | FormulaKind::WeakUntil(_, b) => {
                                removable.insert(*b);
                            }
                            FormulaKind::Finally(a) => {
                                removable.insert(*a);
                            }
                            _ => {}
                        }
                    }
                    if removable.is_empty() {
                        break;
                    }
                    let kept: Vec<FormulaId> =
                        subs.iter().copied().filter(|s| !removable.contains(s)).collect();
                    if kept.len() == subs.len() {
                        break;
                    }
                    f = self.formulas.or(kept);
                }
                FormulaKind::Not(_)
                | FormulaKind::Xor(_, _)
                | FormulaKind::Implies(_, _)
                | FormulaKind::Equiv(_, _) => break,
                // Abort immediately if the top operator is not Boolean.
                _ => return f,
            }
        }

        let enc = self.encode_bool(bdd, f);
        if enc.is_true() {
            f = self.formulas.tt();
        } else if enc.is_false() {
            f = self.formulas.ff();
        }
        // First insertion wins as the canonical representative.
        *self.propeq.entry(enc).or_insert(f)
    }

    /// The fingerprint variable of an atomic proposition (its dictionary
    /// variable) or of a non-Boolean subformula (a fresh anonymous one).
    fn fingerprint_var(&mut self, f: FormulaId) -> Var {
        if let Some(&v) = self.formula_to_var.get(&f) {
            return v;
        }
        let v = match self.formulas.kind(f) {
            FormulaKind::Ap(name) => {
                let name = name.to_string();
                self.dict.register(&name)
            }
            _ => self.dict.register_anonymous(),
        };
        self.formula_to_var.insert(f, v);
        v
    }

    /// The propositional fingerprint of `f` as a plain BDD.
    fn encode_bool(&mut self, bdd: &mut Mtbdd, f: FormulaId) -> NodeRef {
        match self.formulas.kind(f).clone() {
            FormulaKind::True => NodeRef::TRUE,
            FormulaKind::False => NodeRef::FALSE,
            FormulaKind::Ap(_) => {
                let v = self.fingerprint_var(f);
                bdd.mk_var(v)
            }
            FormulaKind::Not(a) => match self.formulas.kind(a).clone() {
                // Skip one BDD negation for leaves.
                FormulaKind::True => NodeRef::FALSE,
                FormulaKind::False => NodeRef::TRUE,
                FormulaKind::Ap(_) => {
                    let v = self.fingerprint_var(a);
                    bdd.mk_nvar(v)
                }
                _ => {
                    let e = self.encode_bool(bdd, a);
                    bdd.apply_not(e)
                }
            },
            FormulaKind::And(subs) => {
                let mut res = NodeRef::TRUE;
                for &sub in subs.iter() {
                    let e = self.encode_bool(bdd, sub);
                    res = bdd.apply_and(res, e);
                }
                res
            }
            FormulaKind::Or(subs) => {
                let mut res = NodeRef::FALSE;
                for &sub in subs.iter() {
                    let e = self.encode_bool(bdd, sub);
                    res = bdd.apply_or(res, e);
                }
                res
            }
            FormulaKind::Xor(a, b) => {
                let l = self.encode_bool(bdd, a);
                let r = self.encode_bool(bdd, b);
                bdd.apply_xor(l, r)
            }
            FormulaKind::Implies(a, b) => {
                let l = self.encode_bool(bdd, a);
                let r = self.encode_bool(bdd, b);
                bdd.apply_imp(l, r)
            }
            FormulaKind::Equiv(a, b) => {
                let l = self.encode_bool(bdd, a);
                let r = self.encode_bool(bdd, b);
                bdd.apply_eq(l, r)
            }
            // Any non-Boolean subformula becomes an opaque variable.
            _ => {
                let v = self.fingerprint_var(f);
                bdd.mk_var(v)
            }
        }
    }

    /// The interning ordinal of the canonical representative of `f`.
    fn state_ordinal(&mut self, bdd: &mut Mtbdd, f: FormulaId) -> u32 {
        if let Some(&v) = self.formula_to_int.get(&f) {
            return v;
        }
        let g = self.representative(bdd, f);
        if g != f {
            if let Some(&v) = self.formula_to_int.get(&g) {
                self.formula_to_int.insert(f, v);
                return v;
            }
            // The representative can be a simplification never seen before.
            let v = self.int_to_formula.len() as u32;
            self.int_to_formula.push(g);
            self.formula_to_int.insert(g, v);
            self.formula_to_int.insert(f, v);
            return v;
        }
        let v = self.int_to_formula.len() as u32;
        self.int_to_formula.push(f);
        self.formula_to_int.insert(f, v);
        v
    }

    fn terminal_bdd(&mut self, bdd: &mut Mtbdd, f: FormulaId, may_stop: bool) -> NodeRef {
        if self.formulas.is_ff(f) && !may_stop {
            return NodeRef::FALSE;
        }
        if self.formulas.is_tt(f) && may_stop {
            return NodeRef::TRUE;
        }
        let k = self.state_ordinal(bdd, f);
        // The canonicalizer may have reduced the formula to a constant.
        let g = self.int_to_formula[k as usize];
        if self.formulas.is_ff(g) && !may_stop {
            return NodeRef::FALSE;
        }
        if self.formulas.is_tt(g) && may_stop {
            return NodeRef::TRUE;
        }
        bdd.terminal(Terminal::new(k, may_stop))
    }

    fn leaf_formula(&self, leaf: Leaf) -> (FormulaId, bool) {
        match leaf {
            Leaf::False => (self.formulas.ff(), false),
            Leaf::True => (self.formulas.tt(), true),
            Leaf::Terminal(t) => (self.int_to_formula[t.ordinal() as usize], t.may_stop()),
        }
    }
}

/// Binary leaf combiner of τ: `(g₁,b₁) ⊕ (g₂,b₂) = (g₁ ⊕ g₂, b₁ ⊕ b₂)`.
struct BoolCombine<'o, 'a> {
    ops: &'o mut TermOps<'a>,
    op: BoolOp,
}

impl Apply2Op for BoolCombine<'_, '_> {
    fn shortcut(&self, left: NodeRef, right: NodeRef) -> Option<NodeRef> {
        match self.op {
            BoolOp::And if left.is_false() || right.is_false() => Some(NodeRef::FALSE),
            BoolOp::Or if left.is_true() || right.is_true() => Some(NodeRef::TRUE),
            BoolOp::Implies if left.is_false() || right.is_true() => Some(NodeRef::TRUE),
            _ => None,
        }
    }

    fn combine(&mut self, bdd: &mut Mtbdd, left: Leaf, right: Leaf) -> NodeRef {
        let (lf, lb) = self.ops.leaf_formula(left);
        let (rf, rb) = self.ops.leaf_formula(right);
        let res = match self.op {
            BoolOp::And => self.ops.formulas.and([lf, rf]),
            BoolOp::Or => self.ops.formulas.or([lf, rf]),
            BoolOp::Implies => self.ops.formulas.implies(lf, rf),
            BoolOp::Equiv => self.ops.formulas.equiv(lf, rf),
            BoolOp::Xor => self.ops.formulas.xor(lf, rf),
        };
        let stop = self.op.stop_bit(lb, rb);
        self.ops.terminal_bdd(bdd, res, stop)
    }
}

/// Unary leaf rewriter of τ for negation.
struct NotCombine<'o, 'a> {
    ops: &'o mut TermOps<'a>,
}

impl Apply1Op for NotCombine<'_, '_> {
    fn map_leaf(&mut self, bdd: &mut Mtbdd, leaf: Leaf) -> NodeRef {
        match leaf {
            Leaf::False => NodeRef::TRUE,
            Leaf::True => NodeRef::FALSE,
            Leaf::Terminal(t) => {
                let f = self.ops.int_to_formula[t.ordinal() as usize];
                let neg = self.ops.formulas.not(f);
                self.ops.terminal_bdd(bdd, neg, !t.may_stop())
            }
        }
    }
}

/// Renames interning ordinals into state ordinals after exploration.
struct RenameOp<'a> {
    map: &'a HashMap<u32, u32>,
}

impl Apply1Op for RenameOp<'_> {
    fn map_leaf(&mut self, bdd: &mut Mtbdd, leaf: Leaf) -> NodeRef {
        match leaf {
            Leaf::False => NodeRef::FALSE,
            Leaf::True => NodeRef::TRUE,
            Leaf::Terminal(t) => {
                let state = *self
                    .map
                    .get(&t.ordinal())
                    .expect("terminal references an unexplored state");
                bdd.terminal(Terminal::new(state, t.may_stop()))
            }
        }
    }
}

/// Game projection during on-the-fly solving: accepting leaves become `1`.
struct MapTrueOp;

impl SynthesisOp for MapTrueOp {
    fn map_leaf(&mut self, bdd: &mut Mtbdd, leaf: Leaf) -> (NodeRef, bool) {
        match leaf {
            Leaf::False => (NodeRef::FALSE, false),
            Leaf::True => (NodeRef::TRUE, true),
            Leaf::Terminal(t) => {
                if t.may_stop() {
                    (NodeRef::TRUE, true)
                } else {
                    (bdd.terminal(t), false)
                }
            }
        }
    }
}

/// Strategy extraction against a solved arena: commits the recorded choice
/// at output nodes, accepting leaves become `1`, losing leaves `0`, and
/// surviving terminals are renumbered to state ordinals.
pub(crate) struct StrategyOp<'a> {
    pub enc: &'a BackpropEncoder,
    /// Interning-ordinal → state-ordinal map; `None` when terminals are
    /// already state-numbered.
    pub remap: Option<&'a HashMap<u32, u32>>,
}

impl ChoiceOp for StrategyOp<'_> {
    fn choose(&mut self, bdd: &Mtbdd, node: NodeRef) -> Option<NodeRef> {
        self.enc.choice_child(bdd, node)
    }

    fn map_leaf(&mut self, bdd: &mut Mtbdd, leaf: Leaf) -> NodeRef {
        match leaf {
            Leaf::False => NodeRef::FALSE,
            Leaf::True => NodeRef::TRUE,
            Leaf::Terminal(t) => {
                if t.may_stop() {
                    return NodeRef::TRUE;
                }
                if !self.enc.root_winner(t.ordinal()) {
                    return NodeRef::FALSE;
                }
                let ordinal = match self.remap {
                    Some(map) => *map
                        .get(&t.ordinal())
                        .expect("winning terminal references an unexplored state"),
                    None => t.ordinal(),
                };
                bdd.terminal(Terminal::new(ordinal, false))
            }
        }
    }
}

impl Translator {
    /// Check that an automaton belongs to this session.
    pub(crate) fn check_session(&self, dfa: &Mtdfa) -> Result<()> {
        if dfa.session != self.session {
            return Err(Error::DictionaryMismatch);
        }
        Ok(())
    }
}
