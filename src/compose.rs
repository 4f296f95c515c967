//! Bottom-up translation by automata composition.
//!
//! Instead of running the worklist on a whole formula, the Boolean skeleton
//! can be evaluated over *automata*: translate the temporal subformulas
//! separately, then combine the pieces with products, minimizing between
//! steps so intermediate automata stay small.  Products are taken smallest
//! pair first, and minimization is skipped when the operands share no
//! atomic proposition (the product is then already minimal).
//!
//! This pays off on wide conjunctions where the monolithic state space is
//! exponential but each conjunct is tiny.

use log::info;

use crate::dfa::Mtdfa;
use crate::formula::{FormulaId, FormulaKind};
use crate::translate::{BoolOp, TranslateOptions, Translator};

/// Options for [`Translator::to_mtdfa_compose`].
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Minimize intermediate products (skipped when the operands share no
    /// atomic proposition).
    pub minimize: bool,
    pub fuse_same_bdds: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        ComposeOptions {
            minimize: true,
            fuse_same_bdds: true,
        }
    }
}

impl Translator {
    /// Translate `f` bottom-up: temporal subformulas become automata, the
    /// Boolean skeleton becomes products.
    pub fn to_mtdfa_compose(&mut self, f: FormulaId, opts: &ComposeOptions) -> Mtdfa {
        let topts = TranslateOptions {
            fuse_same_bdds: opts.fuse_same_bdds,
            ..TranslateOptions::default()
        };
        self.compose_rec(f, opts, &topts)
    }

    fn compose_rec(&mut self, f: FormulaId, opts: &ComposeOptions, topts: &TranslateOptions) -> Mtdfa {
        if self.formulas.is_boolean(f) {
            return self.to_mtdfa(f, topts);
        }
        match self.formulas.kind(f).clone() {
            FormulaKind::Not(a) => {
                let sub = self.compose_rec(a, opts, topts);
                self.complement(&sub).expect("complement within one session")
            }
            FormulaKind::And(subs) | FormulaKind::Or(subs) => {
                let conjunction = matches!(self.formulas.kind(f), FormulaKind::And(_));
                let op = if conjunction { BoolOp::And } else { BoolOp::Or };
                let mut dfas: Vec<Mtdfa> = subs
                    .iter()
                    .map(|&sub| self.compose_rec(sub, opts, topts))
                    .collect();
                // Combine by increasing size: sort descending, pop the two
                // smallest off the tail.
                while dfas.len() > 1 {
                    dfas.sort_by_key(|d| std::cmp::Reverse(d.num_states()));
                    let left = dfas.pop().unwrap();
                    let right = dfas.pop().unwrap();
                    let prod = self
                        .product(&left, &right, op)
                        .expect("product within one session");
                    let disjoint = left.aps.len() + right.aps.len() == prod.aps.len();
                    info!(
                        "compose: {} x {} -> {} states{}",
                        left.num_states(),
                        right.num_states(),
                        prod.num_states(),
                        if disjoint { " (disjoint APs)" } else { "" }
                    );
                    let next = if opts.minimize && !disjoint {
                        self.minimize(&prod)
                    } else {
                        prod
                    };
                    dfas.push(next);
                }
                dfas.pop().unwrap()
            }
            FormulaKind::Xor(a, b) | FormulaKind::Implies(a, b) | FormulaKind::Equiv(a, b) => {
                let op = match self.formulas.kind(f) {
                    FormulaKind::Xor(_, _) => BoolOp::Xor,
                    FormulaKind::Implies(_, _) => BoolOp::Implies,
                    _ => BoolOp::Equiv,
                };
                let left = self.compose_rec(a, opts, topts);
                let right = self.compose_rec(b, opts, topts);
                let prod = self
                    .product(&left, &right, op)
                    .expect("product within one session");
                if !opts.minimize || left.aps.len() + right.aps.len() == prod.aps.len() {
                    prod
                } else {
                    self.minimize(&prod)
                }
            }
            _ => {
                // A temporal leaf of the Boolean skeleton.
                let dfa = self.to_mtdfa(f, topts);
                if opts.minimize {
                    self.minimize(&dfa)
                } else {
                    dfa
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Var;

    fn exhaustive_agree(
        t: &Translator,
        a: &Mtdfa,
        b: &Mtdfa,
        vars: &[Var],
        max_len: usize,
    ) -> bool {
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
    fn test_compose_matches_direct_translation() {
        let mut t = Translator::new();
        let p = t.formulas_mut().ap("p");
        let q = t.formulas_mut().ap("q");
        let gp = t.formulas_mut().globally(p);
        let fq = t.formulas_mut().finally(q);
        let u = t.formulas_mut().until(p, q);
        let f = t.formulas_mut().and([gp, fq, u]);
        let direct = t.to_mtdfa(f, &TranslateOptions::default());
        let composed = t.to_mtdfa_compose(f, &ComposeOptions::default());
        let vars = [t.dict().lookup("p").unwrap(), t.dict().lookup("q").unwrap()];
        assert!(exhaustive_agree(&t, &direct, &composed, &vars, 4));
    }

    #[test]
    fn test_compose_negation() {
        let mut t = Translator::new();
        let p = t.formulas_mut().ap("p");
        let q = t.formulas_mut().ap("q");
        let u = t.formulas_mut().until(p, q);
        let gq = t.formulas_mut().globally(q);
        let or = t.formulas_mut().or([u, gq]);
        let f = t.formulas_mut().not(or);
        let direct = t.to_mtdfa(f, &TranslateOptions::default());
        let composed = t.to_mtdfa_compose(f, &ComposeOptions::default());
        let vars = [t.dict().lookup("p").unwrap(), t.dict().lookup("q").unwrap()];
        assert!(exhaustive_agree(&t, &direct, &composed, &vars, 4));
    }

    #[test]
    fn test_compose_disjoint_conjuncts() {
        // Conjuncts over disjoint APs: products skip minimization and the
        // result is still correct.
        let mut t = Translator::new();
        let conjuncts: Vec<_> = (0..3)
            .map(|i| {
                let p = t.formulas_mut().ap(&format!("p{}", i));
                t.formulas_mut().finally(p)
            })
            .collect();
        let f = t.formulas_mut().and(conjuncts);
        let direct = t.to_mtdfa(f, &TranslateOptions::default());
        let composed = t.to_mtdfa_compose(f, &ComposeOptions::default());
        let vars: Vec<Var> = (0..3)
            .map(|i| t.dict().lookup(&format!("p{}", i)).unwrap())
            .collect();
        assert!(exhaustive_agree(&t, &direct, &composed, &vars, 3));
    }
}
