//! Rewriting simplifications for LTLf formulas.
//!
//! [`LtlfSimplifier`] applies a set of language-preserving rewritings that
//! shrink the formula before translation: negations are pushed through the
//! weak/strong operator pairs (`X`/`X[!]`, `F`/`G`, `U`/`R`, `W`/`M`),
//! alternating `FG`/`GF` prefixes collapse using the one-step view of their
//! body, like-shaped conjuncts and disjuncts are grouped
//! (`Fa | Fb = F(a|b)`, `Ga & Gb = G(a&b)`, `Xa & Xb = X(a&b)`,
//! `(a->b) & (a->c) = a -> (b&c)`), and a shared subformula is factored out
//! of clause sets (`(a&b) | (a&c) = a & (b|c)`).
//!
//! All rewritings are sound over finite traces; results are memoized per
//! `(formula, polarity)`.

use hashbrown::HashMap;

use crate::formula::{FormulaId, FormulaKind, Formulas};
use crate::onestep::one_step_sat_rewrite;

/// A memoizing LTLf simplifier.
#[derive(Default)]
pub struct LtlfSimplifier {
    positive: HashMap<FormulaId, FormulaId>,
    negative: HashMap<FormulaId, FormulaId>,
}

/// If `vec` = `[Xa, Fb, Fc, Gd, e]`, `match_finally` and `combine_and`,
/// this returns `[F(b & c), Xa, Gd, e]`.
fn group_op(
    fs: &mut Formulas,
    vec: Vec<FormulaId>,
    match_finally: bool,
    combine_and: bool,
) -> Vec<FormulaId> {
    let mut matched = Vec::new();
    for &f in &vec {
        match fs.kind(f) {
            FormulaKind::Finally(a) if match_finally => matched.push(*a),
            FormulaKind::Globally(a) if !match_finally => matched.push(*a),
            _ => {}
        }
    }
    if matched.is_empty() {
        return vec;
    }
    let inner = if combine_and {
        fs.and(matched)
    } else {
        fs.or(matched)
    };
    let grouped = if match_finally {
        fs.finally(inner)
    } else {
        fs.globally(inner)
    };
    let mut out = vec![grouped];
    for &f in &vec {
        let keep = !matches!(
            (match_finally, fs.kind(f)),
            (true, FormulaKind::Finally(_)) | (false, FormulaKind::Globally(_))
        );
        if keep {
            out.push(f);
        }
    }
    out
}

impl LtlfSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simplify `f`; the result denotes the same finite-trace language.
    pub fn simplify(&mut self, fs: &mut Formulas, f: FormulaId) -> FormulaId {
        self.simplify_rec(fs, f, false)
    }

    fn simplify_rec(&mut self, fs: &mut Formulas, f: FormulaId, negated: bool) -> FormulaId {
        let cache = if negated { &self.negative } else { &self.positive };
        if let Some(&res) = cache.get(&f) {
            return res;
        }
        let res = self.simplify_aux(fs, f, negated);
        let cache = if negated {
            &mut self.negative
        } else {
            &mut self.positive
        };
        cache.insert(f, res);
        res
    }

    fn simplify_aux(&mut self, fs: &mut Formulas, f: FormulaId, negated: bool) -> FormulaId {
        let kind = fs.kind(f).clone();
        match kind {
            FormulaKind::False => {
                if negated {
                    fs.tt()
                } else {
                    f
                }
            }
            FormulaKind::True => {
                if negated {
                    fs.ff()
                } else {
                    f
                }
            }
            FormulaKind::Ap(_) => {
                if negated {
                    fs.not(f)
                } else {
                    f
                }
            }
            FormulaKind::Not(a) => self.simplify_rec(fs, a, !negated),
            FormulaKind::Next(a) | FormulaKind::StrongNext(a) => {
                let res = self.simplify_rec(fs, a, negated);
                let weak = matches!(kind, FormulaKind::Next(_));
                // Negation turns the weak next into the strong one.
                if negated == weak {
                    fs.strong_next(res)
                } else {
                    fs.next(res)
                }
            }
            FormulaKind::Finally(a) | FormulaKind::Globally(a) => {
                let res = self.simplify_rec(fs, a, negated);
                let outer_finally = matches!(kind, FormulaKind::Finally(_));
                // Alternating FG / GF prefixes collapse: over finite traces
                // only the last position matters for the innermost layer.
                let res_kind = fs.kind(res).clone();
                match res_kind {
                    FormulaKind::Finally(b) if !outer_finally => {
                        let body = one_step_sat_rewrite(fs, b);
                        let fb = fs.finally(body);
                        return fs.globally(fb);
                    }
                    FormulaKind::Globally(b) if outer_finally => {
                        let body = one_step_sat_rewrite(fs, b);
                        let fb = fs.finally(body);
                        return fs.globally(fb);
                    }
                    _ => {}
                }
                if negated == outer_finally {
                    fs.globally(res)
                } else {
                    fs.finally(res)
                }
            }
            FormulaKind::Until(a, b) | FormulaKind::Release(a, b) => {
                let res1 = self.simplify_rec(fs, a, negated);
                let res2 = self.simplify_rec(fs, b, negated);
                let until = matches!(kind, FormulaKind::Until(_, _));
                if negated == until {
                    fs.release(res1, res2)
                } else {
                    fs.until(res1, res2)
                }
            }
            FormulaKind::WeakUntil(a, b) | FormulaKind::StrongRelease(a, b) => {
                let res1 = self.simplify_rec(fs, a, negated);
                let res2 = self.simplify_rec(fs, b, negated);
                let weak = matches!(kind, FormulaKind::WeakUntil(_, _));
                if negated == weak {
                    fs.strong_release(res1, res2)
                } else {
                    fs.weak_until(res1, res2)
                }
            }
            FormulaKind::Xor(a, b) | FormulaKind::Equiv(a, b) => {
                // Negations on either side flip the connective.
                let mut negated = negated;
                let mut left = a;
                if let FormulaKind::Not(inner) = fs.kind(left) {
                    left = *inner;
                    negated = !negated;
                }
                let mut right = b;
                if let FormulaKind::Not(inner) = fs.kind(right) {
                    right = *inner;
                    negated = !negated;
                }
                let res1 = self.simplify_rec(fs, left, false);
                let res2 = self.simplify_rec(fs, right, false);
                let is_xor = matches!(kind, FormulaKind::Xor(_, _));
                if negated == is_xor {
                    fs.equiv(res1, res2)
                } else {
                    fs.xor(res1, res2)
                }
            }
            FormulaKind::Implies(a, b) => {
                if negated {
                    // !(a -> b) = s(a) & s(!b)
                    let left = self.simplify_rec(fs, a, false);
                    let right = self.simplify_rec(fs, b, true);
                    return fs.and([left, right]);
                }
                // !a -> b = s(a) | s(b)
                if let FormulaKind::Not(inner) = fs.kind(a) {
                    let inner = *inner;
                    let left = self.simplify_rec(fs, inner, false);
                    let right = self.simplify_rec(fs, b, false);
                    return fs.or([left, right]);
                }
                // A Boolean side makes the disjunction form cheaper.
                if fs.is_boolean(a) || fs.is_boolean(b) {
                    let left = self.simplify_rec(fs, a, true);
                    let right = self.simplify_rec(fs, b, false);
                    return fs.or([left, right]);
                }
                let left = self.simplify_rec(fs, a, false);
                let right = self.simplify_rec(fs, b, false);
                fs.implies(left, right)
            }
            FormulaKind::And(subs) | FormulaKind::Or(subs) => {
                let mut positive_and = matches!(fs.kind(f), FormulaKind::And(_));
                if negated {
                    positive_and = !positive_and;
                }
                let res: Vec<FormulaId> = subs
                    .iter()
                    .map(|&sub| self.simplify_rec(fs, sub, negated))
                    .collect();
                self.simplify_nary(fs, f, res, positive_and)
            }
        }
    }

    /// The n-ary groupings and the shared-subformula factoring.  `res`
    /// holds the already-simplified children, `conjunction` tells which
    /// connective they now form.
    fn simplify_nary(
        &mut self,
        fs: &mut Formulas,
        f: FormulaId,
        res: Vec<FormulaId>,
        conjunction: bool,
    ) -> FormulaId {
        if conjunction {
            // (a -> b1) & (a -> b2) & rest  =  (a -> (b1 & b2)) & rest
            // G(a) & G(b) & GF(c) & GF(d) & rest = G(a & b & F(c & d)) & rest
            let mut implications: HashMap<FormulaId, Vec<FormulaId>> = HashMap::new();
            let mut implication_order: Vec<FormulaId> = Vec::new();
            let mut in_g = Vec::new();
            let mut in_xs = Vec::new();
            let mut in_xw = Vec::new();
            let mut rest = Vec::new();
            let mut found = false;
            for &sub in &res {
                match fs.kind(sub) {
                    FormulaKind::Implies(a, b) => {
                        let entry = implications.entry(*a).or_default();
                        if entry.is_empty() {
                            implication_order.push(*a);
                        }
                        entry.push(*b);
                        if entry.len() == 2 {
                            found = true;
                        }
                    }
                    FormulaKind::Globally(a) => {
                        in_g.push(*a);
                        if in_g.len() == 2 {
                            found = true;
                        }
                    }
                    FormulaKind::StrongNext(a) => {
                        in_xs.push(*a);
                        if in_xs.len() == 2 {
                            found = true;
                        }
                    }
                    FormulaKind::Next(a) => {
                        in_xw.push(*a);
                        if in_xw.len() == 2 {
                            found = true;
                        }
                    }
                    _ => rest.push(sub),
                }
            }
            if found {
                let mut regrouped = Vec::new();
                for a in implication_order {
                    let bodies = implications.remove(&a).unwrap();
                    let body = fs.and(bodies);
                    regrouped.push(fs.implies(a, body));
                }
                if !in_g.is_empty() {
                    let in_g = group_op(fs, in_g, true, true);
                    let body = fs.and(in_g);
                    regrouped.push(fs.globally(body));
                }
                if !in_xs.is_empty() {
                    let body = fs.and(in_xs);
                    regrouped.push(fs.strong_next(body));
                }
                if !in_xw.is_empty() {
                    let body = fs.and(in_xw);
                    regrouped.push(fs.next(body));
                }
                regrouped.extend(rest);
                let g = fs.and(regrouped);
                if g != f {
                    return self.simplify_rec(fs, g, false);
                }
            }
        } else {
            // (a1 -> b) | (a2 -> b) | rest  =  !a1 | !a2 | b | rest
            // F(a) | F(b) | rest  =  F(a | b) | rest
            let mut in_f = Vec::new();
            let mut in_xs = Vec::new();
            let mut in_xw = Vec::new();
            let mut rest = Vec::new();
            let mut implications: Vec<(FormulaId, FormulaId)> = Vec::new();
            let mut found = false;
            for &sub in &res {
                match fs.kind(sub) {
                    FormulaKind::Implies(a, b) => {
                        found = true;
                        implications.push((*a, *b));
                    }
                    FormulaKind::Finally(a) => {
                        in_f.push(*a);
                        if in_f.len() == 2 {
                            found = true;
                        }
                    }
                    FormulaKind::StrongNext(a) => {
                        in_xs.push(*a);
                        if in_xs.len() == 2 {
                            found = true;
                        }
                    }
                    FormulaKind::Next(a) => {
                        in_xw.push(*a);
                        if in_xw.len() == 2 {
                            found = true;
                        }
                    }
                    _ => rest.push(sub),
                }
            }
            if found {
                // An implication in a disjunction dissolves into literals.
                for (a, b) in implications.drain(..) {
                    let na = fs.not(a);
                    rest.push(na);
                    rest.push(b);
                }
                let mut regrouped = Vec::new();
                if !in_f.is_empty() {
                    let in_f = group_op(fs, in_f, false, false);
                    let body = fs.or(in_f);
                    regrouped.push(fs.finally(body));
                }
                if !in_xs.is_empty() {
                    let body = fs.or(in_xs);
                    regrouped.push(fs.strong_next(body));
                }
                if !in_xw.is_empty() {
                    let body = fs.or(in_xw);
                    regrouped.push(fs.next(body));
                }
                regrouped.extend(rest);
                let g = fs.or(regrouped);
                if g != f {
                    return self.simplify_rec(fs, g, false);
                }
            }
        }

        // Factor the most-shared non-Boolean subformula out of the clauses:
        // (a & b) | (a & c) | rest  =  (a & (b | c)) | rest
        // (a | b) & (a | c) & rest  =  (a | (b & c)) & rest
        let mut count: HashMap<FormulaId, u32> = HashMap::new();
        let mut largest = 0;
        let mut largest_sub = None;
        {
            let mut remember = |fs: &Formulas, sub: FormulaId| {
                if fs.is_boolean(sub) {
                    return;
                }
                let c = count.entry(sub).or_insert(0);
                *c += 1;
                if *c > largest {
                    largest = *c;
                    largest_sub = Some(sub);
                }
            };
            for &sub in &res {
                match fs.kind(sub) {
                    FormulaKind::Or(subsubs) if conjunction => {
                        for &ss in subsubs.iter() {
                            remember(fs, ss);
                        }
                    }
                    FormulaKind::And(subsubs) if !conjunction => {
                        for &ss in subsubs.iter() {
                            remember(fs, ss);
                        }
                    }
                    _ => remember(fs, sub),
                }
            }
        }
        let rebuild = |fs: &mut Formulas, items: Vec<FormulaId>| {
            if conjunction {
                fs.and(items)
            } else {
                fs.or(items)
            }
        };
        let Some(shared) = largest_sub.filter(|_| largest >= 2) else {
            return rebuild(fs, res);
        };

        let mut factored = Vec::new();
        let mut unmodified = Vec::new();
        for &sub in &res {
            let clause: Option<Vec<FormulaId>> = match fs.kind(sub) {
                FormulaKind::Or(subsubs) if conjunction => Some(subsubs.to_vec()),
                FormulaKind::And(subsubs) if !conjunction => Some(subsubs.to_vec()),
                _ => None,
            };
            match clause {
                Some(subsubs) if subsubs.contains(&shared) => {
                    let remaining: Vec<FormulaId> =
                        subsubs.into_iter().filter(|&s| s != shared).collect();
                    let clause = if conjunction {
                        fs.or(remaining)
                    } else {
                        fs.and(remaining)
                    };
                    factored.push(clause);
                }
                Some(_) => unmodified.push(sub),
                None if sub == shared => {
                    // The bare occurrence absorbs the clause entirely.
                    factored.push(if conjunction { fs.ff() } else { fs.tt() });
                }
                None => unmodified.push(sub),
            }
        }
        let factored = rebuild(fs, factored);
        let factored = self.simplify_rec(fs, factored, false);
        let rest = rebuild(fs, unmodified);
        let rest = self.simplify_rec(fs, rest, false);
        let recombined = if conjunction {
            fs.or([shared, factored])
        } else {
            fs.and([shared, factored])
        };
        rebuild(fs, vec![recombined, rest])
    }
}
