//! One-step approximations of LTLf formulas.
//!
//! Both functions evaluate a formula "at the last position of a trace":
//!
//! - [`one_step_sat_rewrite`] is a conservative *under*-approximation: it
//!   returns a Boolean formula that, if satisfiable, guarantees the trace
//!   can end right now while accepting `f`.  Weak next is vacuously true at
//!   the end (`X φ ↦ 1`, so in particular `X 0 ↦ 1`), strong next is false
//!   (`X[!] φ ↦ 0`).
//! - [`one_step_unsat_rewrite`] is the dual *over*-approximation used to
//!   detect losing states: if it is unsatisfiable under every extension, `f`
//!   cannot be satisfied at all.  Here both nexts map to `1` (in particular
//!   `X[!] 1 ↦ 1`): a formula is not unsatisfiable merely because the trace
//!   might continue.
//!
//! The on-the-fly synthesis engine uses these to decide states without
//! exploring their successors.

use crate::formula::{FormulaId, FormulaKind, Formulas};

/// Under-approximate `f` at the last position of a trace.  The result is
/// purely propositional.
pub fn one_step_sat_rewrite(fs: &mut Formulas, f: FormulaId) -> FormulaId {
    if fs.is_boolean(f) {
        return f;
    }
    match fs.kind(f).clone() {
        FormulaKind::Next(_) => fs.tt(),
        FormulaKind::StrongNext(_) => fs.ff(),
        FormulaKind::Globally(a) | FormulaKind::Finally(a) => one_step_sat_rewrite(fs, a),
        FormulaKind::Until(_, b) | FormulaKind::Release(_, b) => one_step_sat_rewrite(fs, b),
        FormulaKind::WeakUntil(a, b) => {
            let a = one_step_sat_rewrite(fs, a);
            let b = one_step_sat_rewrite(fs, b);
            fs.or([a, b])
        }
        FormulaKind::StrongRelease(a, b) => {
            let a = one_step_sat_rewrite(fs, a);
            let b = one_step_sat_rewrite(fs, b);
            fs.and([a, b])
        }
        FormulaKind::True
        | FormulaKind::False
        | FormulaKind::Ap(_)
        | FormulaKind::Not(_)
        | FormulaKind::And(_)
        | FormulaKind::Or(_)
        | FormulaKind::Xor(_, _)
        | FormulaKind::Implies(_, _)
        | FormulaKind::Equiv(_, _) => fs.map(f, &mut |fs, sub| one_step_sat_rewrite(fs, sub)),
    }
}

/// Over-approximate `f` (or `¬f` when `negate` is set) at the last position
/// of a trace.  The result is purely propositional.
pub fn one_step_unsat_rewrite(fs: &mut Formulas, f: FormulaId, negate: bool) -> FormulaId {
    if fs.is_boolean(f) {
        return if negate { fs.not(f) } else { f };
    }
    let kind = fs.kind(f).clone();
    match kind {
        FormulaKind::Not(a) => one_step_unsat_rewrite(fs, a, !negate),
        FormulaKind::True | FormulaKind::False | FormulaKind::Ap(_) => {
            if negate {
                fs.not(f)
            } else {
                f
            }
        }
        FormulaKind::Next(_) | FormulaKind::StrongNext(_) => fs.tt(),
        FormulaKind::Finally(a) => {
            if negate {
                // G !a
                one_step_unsat_rewrite(fs, a, true)
            } else {
                fs.tt()
            }
        }
        FormulaKind::Globally(a) => {
            if negate {
                // F !a
                fs.tt()
            } else {
                one_step_unsat_rewrite(fs, a, false)
            }
        }
        FormulaKind::Release(a, b) | FormulaKind::StrongRelease(a, b) => {
            if negate {
                // U, W
                let a = one_step_unsat_rewrite(fs, a, true);
                let b = one_step_unsat_rewrite(fs, b, true);
                fs.or([a, b])
            } else {
                one_step_unsat_rewrite(fs, b, false)
            }
        }
        FormulaKind::Until(a, b) | FormulaKind::WeakUntil(a, b) => {
            if negate {
                // R, M
                one_step_unsat_rewrite(fs, b, true)
            } else {
                let a = one_step_unsat_rewrite(fs, a, false);
                let b = one_step_unsat_rewrite(fs, b, false);
                fs.or([a, b])
            }
        }
        FormulaKind::Implies(a, b) => {
            if negate {
                // !(a -> b) == a & !b
                let a = one_step_unsat_rewrite(fs, a, false);
                let b = one_step_unsat_rewrite(fs, b, true);
                fs.and([a, b])
            } else {
                // a -> b == !a | b
                let a = one_step_unsat_rewrite(fs, a, true);
                let b = one_step_unsat_rewrite(fs, b, false);
                fs.or([a, b])
            }
        }
        FormulaKind::Xor(a, b) | FormulaKind::Equiv(a, b) => {
            let pa = one_step_unsat_rewrite(fs, a, false);
            let pb = one_step_unsat_rewrite(fs, b, false);
            let na = one_step_unsat_rewrite(fs, a, true);
            let nb = one_step_unsat_rewrite(fs, b, true);
            let is_xor = matches!(kind, FormulaKind::Xor(_, _));
            if is_xor == negate {
                // equivalence
                let both = fs.and([pa, pb]);
                let neither = fs.and([na, nb]);
                fs.or([both, neither])
            } else {
                let left = fs.and([pa, nb]);
                let right = fs.and([na, pb]);
                fs.or([left, right])
            }
        }
        FormulaKind::And(subs) => {
            let mapped: Vec<_> = subs
                .iter()
                .map(|&s| one_step_unsat_rewrite(fs, s, negate))
                .collect();
            if negate {
                fs.or(mapped)
            } else {
                fs.and(mapped)
            }
        }
        FormulaKind::Or(subs) => {
            let mapped: Vec<_> = subs
                .iter()
                .map(|&s| one_step_unsat_rewrite(fs, s, negate))
                .collect();
            if negate {
                fs.and(mapped)
            } else {
                fs.or(mapped)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sat_rewrite_nexts() {
        let mut fs = Formulas::new();
        let p = fs.ap("p");
        let ff = fs.ff();
        let tt = fs.tt();
        // Weak next is vacuously true at the end, even X 0.
        let xff = fs.next(ff);
        assert_eq!(one_step_sat_rewrite(&mut fs, xff), tt);
        let xp = fs.next(p);
        assert_eq!(one_step_sat_rewrite(&mut fs, xp), tt);
        // Strong next is false at the end.
        let sxp = fs.strong_next(p);
        assert_eq!(one_step_sat_rewrite(&mut fs, sxp), ff);
    }

    #[test]
    fn test_unsat_rewrite_nexts() {
        let mut fs = Formulas::new();
        let tt = fs.tt();
        // Neither next is refutable at the last position; in particular
        // X[!] 1 over-approximates to 1.
        let sxtt = fs.strong_next(tt);
        assert_eq!(one_step_unsat_rewrite(&mut fs, sxtt, false), tt);
        let p = fs.ap("p");
        let xp = fs.next(p);
        assert_eq!(one_step_unsat_rewrite(&mut fs, xp, false), tt);
    }

    #[test]
    fn test_sat_rewrite_temporal() {
        let mut fs = Formulas::new();
        let p = fs.ap("p");
        let q = fs.ap("q");
        let gp = fs.globally(p);
        assert_eq!(one_step_sat_rewrite(&mut fs, gp), p);
        let fp = fs.finally(p);
        assert_eq!(one_step_sat_rewrite(&mut fs, fp), p);
        let puq = fs.until(p, q);
        assert_eq!(one_step_sat_rewrite(&mut fs, puq), q);
        let pwq = fs.weak_until(p, q);
        let pq = fs.or([p, q]);
        assert_eq!(one_step_sat_rewrite(&mut fs, pwq), pq);
        let pmq = fs.strong_release(p, q);
        let pandq = fs.and([p, q]);
        assert_eq!(one_step_sat_rewrite(&mut fs, pmq), pandq);
    }

    #[test]
    fn test_unsat_rewrite_negation() {
        let mut fs = Formulas::new();
        let p = fs.ap("p");
        // !F p at the end: G !p collapses to !p.
        let fp = fs.finally(p);
        let nfp = fs.not(fp);
        let np = fs.not(p);
        assert_eq!(one_step_unsat_rewrite(&mut fs, nfp, false), np);
        // G p at the end: p.
        let gp = fs.globally(p);
        assert_eq!(one_step_unsat_rewrite(&mut fs, gp, false), p);
        // !G p at the end could still be satisfied later: tt.
        let ngp = fs.not(gp);
        assert_eq!(one_step_unsat_rewrite(&mut fs, ngp, false), fs.tt());
    }

    #[test]
    fn test_unsat_rewrite_until() {
        let mut fs = Formulas::new();
        let p = fs.ap("p");
        let q = fs.ap("q");
        let puq = fs.until(p, q);
        let pq = fs.or([p, q]);
        assert_eq!(one_step_unsat_rewrite(&mut fs, puq, false), pq);
        // !(p U q) ~ !q.
        let npuq = fs.not(puq);
        let nq = fs.not(q);
        assert_eq!(one_step_unsat_rewrite(&mut fs, npuq, false), nq);
    }

    #[test]
    fn test_results_are_boolean() {
        let mut fs = Formulas::new();
        let p = fs.ap("p");
        let q = fs.ap("q");
        let u = fs.until(p, q);
        let w = fs.weak_until(q, p);
        let x = fs.next(u);
        let inner = fs.and([u, w, x]);
        let f = fs.finally(inner);
        let sat = one_step_sat_rewrite(&mut fs, f);
        assert!(fs.is_boolean(sat));
        let unsat = one_step_unsat_rewrite(&mut fs, f, false);
        assert!(fs.is_boolean(unsat));
    }
}
