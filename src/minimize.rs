//! MTDFA minimization by partition refinement on MTBDDs.
//!
//! Moore's algorithm, symbolically: every state gets a class, initially the
//! same for all.  Each round rewrites every state's diagram, replacing each
//! terminal `(dst, b)` by `(class[dst], b)` — the result is the state's
//! *signature*, and states are regrouped by signature until no class
//! splits.  Because diagrams are hash-consed, comparing signatures is
//! pointer equality.
//!
//! Two synthetic states stand for the constants: rewriting maps the leaf
//! `0` to the terminal `(class[ff], ⊥)` and `1` to `(class[tt], ⊤)`, so
//! states equivalent to a constant fall into the synthetic class and the
//! collapse propagates to their predecessors.  After the fixpoint the
//! synthetic terminals are turned back into constants, unless some real
//! terminal still needs the class (a `(ff, ⊤)` or `(tt, ⊥)` leaf), in
//! which case the constant keeps a state number.
//!
//! Classes are relabelled in signature-discovery order each round, which
//! pins the initial state's class to 0.

use hashbrown::HashMap;
use log::debug;

use crate::cache::dedicated_cache_bits;
use crate::dfa::Mtdfa;
use crate::formula::FormulaId;
use crate::mtbdd::{Apply1Op, Cache1, Mtbdd};
use crate::translate::Translator;
use crate::types::{Leaf, NodeRef, Terminal};

/// Rewrites terminals through the current class assignment.  The leaf `0`
/// becomes `false_rep`, the leaf `1` becomes `true_rep` (synthetic
/// terminals during refinement, plain constants for the final remap).
struct ClassRename<'a> {
    classes: &'a [u32],
    /// Number of real states; classes `n` and `n + 1` are the synthetic
    /// `tt` and `ff` states.
    n: usize,
    false_rep: NodeRef,
    true_rep: NodeRef,
    /// A terminal `(ff, ⊤)` was seen: the `ff` class must stay a state.
    accepting_false_seen: &'a mut bool,
    /// A terminal `(tt, ⊥)` was seen: the `tt` class must stay a state.
    rejecting_true_seen: &'a mut bool,
}

impl Apply1Op for ClassRename<'_> {
    fn map_leaf(&mut self, bdd: &mut Mtbdd, leaf: Leaf) -> NodeRef {
        match leaf {
            Leaf::False => self.false_rep,
            Leaf::True => self.true_rep,
            Leaf::Terminal(t) => {
                let accepting = t.may_stop();
                let class = self.classes[t.ordinal() as usize];
                if class as usize == self.n + accepting as usize {
                    if accepting {
                        *self.accepting_false_seen = true;
                    } else {
                        *self.rejecting_true_seen = true;
                    }
                }
                bdd.terminal(Terminal::new(class, accepting))
            }
        }
    }
}

/// Replaces the two synthetic terminals by the constants; everything else
/// is untouched.
struct SyntheticToConst {
    false_term: NodeRef,
    true_term: NodeRef,
}

impl Apply1Op for SyntheticToConst {
    fn map_leaf(&mut self, bdd: &mut Mtbdd, leaf: Leaf) -> NodeRef {
        let node = match leaf {
            Leaf::False => NodeRef::FALSE,
            Leaf::True => NodeRef::TRUE,
            Leaf::Terminal(t) => bdd.terminal(t),
        };
        if node == self.false_term {
            NodeRef::FALSE
        } else if node == self.true_term {
            NodeRef::TRUE
        } else {
            node
        }
    }
}

impl Translator {
    /// Minimize an automaton.  The result accepts the same language with
    /// the fewest states; minimizing again is a no-op up to renumbering.
    pub fn minimize(&mut self, dfa: &Mtdfa) -> Mtdfa {
        let n = dfa.num_states();
        // Two extra classes for the synthetic tt/ff states.
        let mut classes: Vec<u32> = vec![0; n + 2];
        let mut cache = Cache1::new(dedicated_cache_bits(n, dfa.aps.len()));
        let mut iteration: u32 = 0;

        // Signatures in discovery order, and the states sharing each.
        let mut signatures: Vec<NodeRef> = Vec::new();
        let mut groups: HashMap<NodeRef, Vec<usize>> = HashMap::new();
        let mut accepting_false_seen = false;
        let mut rejecting_true_seen = false;

        loop {
            iteration += 1;
            let true_term = self.bdd.terminal(Terminal::new(classes[n], true));
            let false_term = self.bdd.terminal(Terminal::new(classes[n + 1], false));
            accepting_false_seen = false;
            rejecting_true_seen = false;

            for i in 0..n {
                let sig = {
                    let mut op = ClassRename {
                        classes: &classes,
                        n,
                        false_rep: false_term,
                        true_rep: true_term,
                        accepting_false_seen: &mut accepting_false_seen,
                        rejecting_true_seen: &mut rejecting_true_seen,
                    };
                    self.bdd.apply1(dfa.states[i], &mut op, &mut cache, iteration)
                };
                let group = groups.entry(sig).or_default();
                if group.is_empty() {
                    signatures.push(sig);
                }
                group.push(i);
            }
            // The synthetic states are grouped after all real ones, so the
            // last member of a group tells whether it contains one.
            {
                let group = groups.entry(true_term).or_default();
                if group.is_empty() {
                    signatures.push(true_term);
                }
                group.push(n);
            }
            {
                let group = groups.entry(false_term).or_default();
                if group.is_empty() {
                    signatures.push(false_term);
                }
                group.push(n + 1);
            }

            debug!("refinement round {}: {} classes", iteration, signatures.len());

            // Relabel classes in signature-discovery order; groups holding
            // a synthetic state keep the reserved indices n / n + 1.
            let mut curclass: u32 = 0;
            let mut changed = false;
            for &sig in &signatures {
                let mut mapclass = curclass;
                curclass += 1;
                let group = &groups[&sig];
                let last = *group.last().unwrap();
                if last >= n {
                    mapclass = last as u32;
                }
                for &i in group {
                    if classes[i] != mapclass {
                        changed = true;
                        classes[i] = mapclass;
                    }
                }
            }
            if !changed {
                break;
            }
            groups.clear();
            signatures.clear();
        }

        // The final signatures are the minimized diagrams; walk them in
        // discovery order, dropping synthetic classes no real terminal
        // needs and compacting state numbers.
        let want_names = dfa.names.len() == n;
        let mut names: Vec<FormulaId> = Vec::new();
        let sz = signatures.len();
        let mut next_state: usize = 0;
        iteration += 1;
        let true_term = self.bdd.terminal(Terminal::new(classes[n], true));
        let false_term = self.bdd.terminal(Terminal::new(classes[n + 1], false));
        let mut need_remap = false;

        for i in 0..sz {
            let mut sig = signatures[i];
            let group = &groups[&sig];
            let last = *group.last().unwrap();
            if last == n + 1 {
                // This class is equivalent to ff.
                if i == 0 {
                    // The initial state itself: the automaton is empty.
                    debug_assert_eq!(group[0], 0);
                    if want_names {
                        names.push(self.formulas.ff());
                    }
                    signatures[0] = NodeRef::FALSE;
                    next_state = 1;
                    break;
                }
                if !accepting_false_seen {
                    continue;
                }
                // Some (ff, ⊤) terminal exists, so ff keeps a state number.
                classes[n + 1] = next_state as u32;
                need_remap = true;
            }
            if last == n {
                // This class is equivalent to tt.
                if i == 0 {
                    debug_assert_eq!(group[0], 0);
                    if want_names {
                        names.push(self.formulas.tt());
                    }
                    signatures[0] = NodeRef::TRUE;
                    next_state = 1;
                    break;
                }
                if !rejecting_true_seen {
                    continue;
                }
                classes[n] = next_state as u32;
                need_remap = true;
            }
            if want_names {
                let name = if group[0] < n {
                    dfa.names[group[0]]
                } else if last == n {
                    self.formulas.tt()
                } else {
                    self.formulas.ff()
                };
                names.push(name);
            }
            // Turn the synthetic terminals back into constants; real
            // terminals (including (ff, ⊤) and (tt, ⊥)) are preserved.
            sig = {
                let mut op = SyntheticToConst {
                    false_term,
                    true_term,
                };
                self.bdd.apply1(sig, &mut op, &mut cache, iteration)
            };
            classes[i] = next_state as u32;
            if i != next_state {
                need_remap = true;
            }
            signatures[next_state] = sig;
            next_state += 1;
        }
        signatures.truncate(next_state);

        if need_remap {
            // Classes were compacted; route every terminal once more.
            iteration += 1;
            let mut dummy_a = false;
            let mut dummy_r = false;
            for sig in signatures.iter_mut() {
                let mut op = ClassRename {
                    classes: &classes,
                    n,
                    false_rep: NodeRef::FALSE,
                    true_rep: NodeRef::TRUE,
                    accepting_false_seen: &mut dummy_a,
                    rejecting_true_seen: &mut dummy_r,
                };
                *sig = self.bdd.apply1(*sig, &mut op, &mut cache, iteration);
            }
        }

        let mut res = Mtdfa::new(self.session);
        // Unless the automaton collapsed to a constant without a game
        // attached, it still uses its atomic propositions.
        let controllable = dfa.controllable_variables().to_vec();
        if (signatures[0] != NodeRef::FALSE && signatures[0] != NodeRef::TRUE)
            || !controllable.is_empty()
        {
            res.aps = dfa.aps.clone();
        }
        res.set_controllable(controllable);
        res.names = names;
        res.states = signatures;
        res
    }
}

/// Sanity helper for tests: every reachable terminal must point inside the
/// automaton.
#[cfg(test)]
fn check_terminals(bdd: &Mtbdd, dfa: &Mtdfa) {
    for &root in &dfa.states {
        for leaf_node in bdd.leaves(root) {
            if let Leaf::Terminal(t) = bdd.leaf(leaf_node).unwrap() {
                assert!((t.ordinal() as usize) < dfa.num_states());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::TranslateOptions;
    use crate::types::Var;

    fn accepts_same(
        t: &Translator,
        a: &Mtdfa,
        b: &Mtdfa,
        vars: &[Var],
        max_len: usize,
    ) -> bool {
        // Enumerate every word up to max_len over the full alphabet.
        let letters: Vec<Vec<Var>> = (0..1usize << vars.len())
            .map(|bits| {
                vars.iter()
                    .enumerate()
                    .filter(|(i, _)| bits & (1 << i) != 0)
                    .map(|(_, &v)| v)
                    .collect()
            })
            .collect();
        let mut words: Vec<Vec<usize>> = vec![Vec::new()];
        for _ in 0..max_len {
            let mut next = Vec::new();
            for w in &words {
                for l in 0..letters.len() {
                    let mut w2 = w.clone();
                    w2.push(l);
                    next.push(w2);
                }
            }
            for w in &next {
                let word: Vec<&[Var]> = w.iter().map(|&l| letters[l].as_slice()).collect();
                if a.accepts(t.bdd(), &word) != b.accepts(t.bdd(), &word) {
                    return false;
                }
            }
            words = next;
        }
        true
    }

    #[test]
    fn test_minimize_keeps_language() {
        let mut t = Translator::new();
        let p = t.formulas_mut().ap("p");
        let q = t.formulas_mut().ap("q");
        let fp = t.formulas_mut().finally(p);
        let gq = t.formulas_mut().globally(q);
        let f = t.formulas_mut().and([fp, gq]);
        // Disable fusing so minimization has something to merge.
        let opts = TranslateOptions {
            fuse_same_bdds: false,
            ..TranslateOptions::default()
        };
        let dfa = t.to_mtdfa(f, &opts);
        let min = t.minimize(&dfa);
        assert!(min.num_states() <= dfa.num_states());
        check_terminals(t.bdd(), &min);
        let vars = [t.dict().lookup("p").unwrap(), t.dict().lookup("q").unwrap()];
        assert!(accepts_same(&t, &dfa, &min, &vars, 3));
    }

    #[test]
    fn test_minimize_idempotent() {
        let mut t = Translator::new();
        let p = t.formulas_mut().ap("p");
        let q = t.formulas_mut().ap("q");
        let u = t.formulas_mut().until(p, q);
        let xq = t.formulas_mut().next(q);
        let f = t.formulas_mut().or([u, xq]);
        let dfa = t.to_mtdfa(f, &TranslateOptions::default());
        let min1 = t.minimize(&dfa);
        let min2 = t.minimize(&min1);
        assert_eq!(min1.num_states(), min2.num_states());
    }

    #[test]
    fn test_minimize_collapses_to_constant() {
        let mut t = Translator::new();
        let p = t.formulas_mut().ap("p");
        // F(p | !p) is a tautology over non-empty traces.
        let np = t.formulas_mut().not(p);
        let any = t.formulas_mut().or([p, np]);
        let f = t.formulas_mut().finally(any);
        let opts = TranslateOptions {
            detect_empty_universal: false,
            ..TranslateOptions::default()
        };
        let dfa = t.to_mtdfa(f, &opts);
        let min = t.minimize(&dfa);
        assert_eq!(min.num_states(), 1);
        assert_eq!(min.states[0], NodeRef::TRUE);
    }

    #[test]
    fn test_minimize_merges_equivalent_states() {
        let mut t = Translator::new();
        let p = t.formulas_mut().ap("p");
        let q = t.formulas_mut().ap("q");
        // X(p U q) and X[!](p U q) | X(q) have overlapping behaviours that
        // leave syntactically distinct but equivalent states around.
        let u = t.formulas_mut().until(p, q);
        let a = t.formulas_mut().next(u);
        let b = t.formulas_mut().strong_next(u);
        let f = t.formulas_mut().or([a, b]);
        let opts = TranslateOptions {
            fuse_same_bdds: false,
            ..TranslateOptions::default()
        };
        let dfa = t.to_mtdfa(f, &opts);
        let min = t.minimize(&dfa);
        assert!(min.num_states() <= dfa.num_states());
        let vars = [t.dict().lookup("p").unwrap(), t.dict().lookup("q").unwrap()];
        assert!(accepts_same(&t, &dfa, &min, &vars, 3));
    }
}
