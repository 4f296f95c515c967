//! End-to-end scenarios for the translator.
//!
//! Tests cover translation of the basic operator shapes, language-level
//! properties of products and complement, and the minimization contract.

use ltlf_rs::{BoolOp, NodeRef, TranslateOptions, Translator, Var};

/// Enumerate every word over `vars` of length `1..=max_len` and feed it to
/// both automata (as slices of true-variables per letter).
fn same_language(t: &Translator, a: &ltlf_rs::Mtdfa, b: &ltlf_rs::Mtdfa, vars: &[Var], max_len: usize) -> bool {
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

// ─── Boundary shapes ───────────────────────────────────────────────────────────

#[test]
fn tt_translates_to_constant_one() {
    let mut t = Translator::new();
    let tt = t.formulas().tt();
    let dfa = t.to_mtdfa(tt, &TranslateOptions::default());
    assert_eq!(dfa.num_states(), 1);
    assert_eq!(dfa.states[0], NodeRef::TRUE);
    assert!(dfa.accepts(t.bdd(), &[&[]]));
}

#[test]
fn ff_translates_to_constant_zero() {
    let mut t = Translator::new();
    let ff = t.formulas().ff();
    let dfa = t.to_mtdfa(ff, &TranslateOptions::default());
    assert_eq!(dfa.num_states(), 1);
    assert_eq!(dfa.states[0], NodeRef::FALSE);
    assert!(!dfa.accepts(t.bdd(), &[&[]]));
    assert!(dfa.is_empty(t.bdd()));
}

#[test]
fn weak_next_of_false_marks_trace_end() {
    // X 0 holds exactly at the last position of a trace.
    let mut t = Translator::new();
    let ff = t.formulas().ff();
    let xff = t.formulas_mut().next(ff);
    let dfa = t.to_mtdfa(xff, &TranslateOptions::default());
    assert!(dfa.accepts(t.bdd(), &[&[]]));
    assert!(!dfa.accepts(t.bdd(), &[&[], &[]]));
    assert!(!dfa.accepts(t.bdd(), &[&[], &[], &[]]));
}

#[test]
fn strong_next_of_true_needs_a_successor() {
    // X[!] 1 holds except at the last position.
    let mut t = Translator::new();
    let tt = t.formulas().tt();
    let sxtt = t.formulas_mut().strong_next(tt);
    let dfa = t.to_mtdfa(sxtt, &TranslateOptions::default());
    assert!(!dfa.accepts(t.bdd(), &[&[]]));
    assert!(dfa.accepts(t.bdd(), &[&[], &[]]));
}

// ─── Scenario: pure Boolean ────────────────────────────────────────────────────

#[test]
fn boolean_conjunction() {
    let mut t = Translator::new();
    let p = t.formulas_mut().ap("p");
    let q = t.formulas_mut().ap("q");
    let f = t.formulas_mut().and([p, q]);
    let dfa = t.to_mtdfa(f, &TranslateOptions::default());
    assert_eq!(dfa.num_states(), 1);
    let vp = t.dict().lookup("p").unwrap();
    let vq = t.dict().lookup("q").unwrap();
    // {p,q} accepts, {p} rejects, and nothing may continue.
    assert!(dfa.accepts(t.bdd(), &[&[vp, vq]]));
    assert!(!dfa.accepts(t.bdd(), &[&[vp]]));
    assert!(!dfa.accepts(t.bdd(), &[&[vp, vq], &[vp, vq]]));
}

// ─── Scenario: safety ──────────────────────────────────────────────────────────

#[test]
fn globally_rejects_any_violation() {
    let mut t = Translator::new();
    let p = t.formulas_mut().ap("p");
    let gp = t.formulas_mut().globally(p);
    let dfa = t.to_mtdfa(gp, &TranslateOptions::default());
    assert_eq!(dfa.num_states(), 1);
    let vp = t.dict().lookup("p").unwrap();
    let letter = [vp];
    for len in 1..5 {
        let all_p: Vec<&[Var]> = (0..len).map(|_| letter.as_slice()).collect();
        assert!(dfa.accepts(t.bdd(), &all_p));
    }
    assert!(!dfa.accepts(t.bdd(), &[&[vp], &[], &[vp]]));
}

// ─── Scenario: liveness ────────────────────────────────────────────────────────

#[test]
fn finally_requires_witness_before_end() {
    let mut t = Translator::new();
    let p = t.formulas_mut().ap("p");
    let fp = t.formulas_mut().finally(p);
    let dfa = t.to_mtdfa(fp, &TranslateOptions::default());
    let vp = t.dict().lookup("p").unwrap();
    assert!(dfa.accepts(t.bdd(), &[&[], &[], &[vp]]));
    assert!(dfa.accepts(t.bdd(), &[&[vp], &[], &[]]));
    assert!(!dfa.accepts(t.bdd(), &[&[], &[], &[]]));
}

// ─── Scenario: product equivalence ─────────────────────────────────────────────

#[test]
fn product_and_is_intersection() {
    let mut t = Translator::new();
    let p = t.formulas_mut().ap("p");
    let q = t.formulas_mut().ap("q");
    let gp = t.formulas_mut().globally(p);
    let fq = t.formulas_mut().finally(q);
    let a = t.to_mtdfa(gp, &TranslateOptions::default());
    let b = t.to_mtdfa(fq, &TranslateOptions::default());
    let prod = t.product(&a, &b, BoolOp::And).unwrap();
    // Compare against translating the conjunction directly.
    let f = t.formulas_mut().and([gp, fq]);
    let direct = t.to_mtdfa(f, &TranslateOptions::default());
    let vars = [t.dict().lookup("p").unwrap(), t.dict().lookup("q").unwrap()];
    assert!(same_language(&t, &prod, &direct, &vars, 4));
}

#[test]
fn product_connectives_match_formula_connectives() {
    let mut t = Translator::new();
    let p = t.formulas_mut().ap("p");
    let q = t.formulas_mut().ap("q");
    let fp = t.formulas_mut().finally(p);
    let gq = t.formulas_mut().globally(q);
    let a = t.to_mtdfa(fp, &TranslateOptions::default());
    let b = t.to_mtdfa(gq, &TranslateOptions::default());
    let vars = [t.dict().lookup("p").unwrap(), t.dict().lookup("q").unwrap()];

    for op in [BoolOp::Or, BoolOp::Implies, BoolOp::Equiv, BoolOp::Xor] {
        let prod = t.product(&a, &b, op).unwrap();
        let f = match op {
            BoolOp::And => t.formulas_mut().and([fp, gq]),
            BoolOp::Or => t.formulas_mut().or([fp, gq]),
            BoolOp::Implies => t.formulas_mut().implies(fp, gq),
            BoolOp::Equiv => t.formulas_mut().equiv(fp, gq),
            BoolOp::Xor => t.formulas_mut().xor(fp, gq),
        };
        let direct = t.to_mtdfa(f, &TranslateOptions::default());
        assert!(
            same_language(&t, &prod, &direct, &vars, 3),
            "product disagrees with formula for {:?}",
            op
        );
    }
}

// ─── Complement ────────────────────────────────────────────────────────────────

#[test]
fn complement_twice_preserves_language() {
    let mut t = Translator::new();
    let p = t.formulas_mut().ap("p");
    let q = t.formulas_mut().ap("q");
    let u = t.formulas_mut().until(p, q);
    let dfa = t.to_mtdfa(u, &TranslateOptions::default());
    let comp = t.complement(&dfa).unwrap();
    let back = t.complement(&comp).unwrap();
    let vars = [t.dict().lookup("p").unwrap(), t.dict().lookup("q").unwrap()];
    assert!(same_language(&t, &dfa, &back, &vars, 4));
}

#[test]
fn complement_matches_negated_formula() {
    let mut t = Translator::new();
    let p = t.formulas_mut().ap("p");
    let q = t.formulas_mut().ap("q");
    let w = t.formulas_mut().weak_until(p, q);
    let dfa = t.to_mtdfa(w, &TranslateOptions::default());
    let comp = t.complement(&dfa).unwrap();
    let nw = t.formulas_mut().not(w);
    let direct = t.to_mtdfa(nw, &TranslateOptions::default());
    let vars = [t.dict().lookup("p").unwrap(), t.dict().lookup("q").unwrap()];
    assert!(same_language(&t, &comp, &direct, &vars, 4));
}

// ─── Minimization ──────────────────────────────────────────────────────────────

#[test]
fn minimize_is_sound_and_idempotent() {
    let mut t = Translator::new();
    let p = t.formulas_mut().ap("p");
    let q = t.formulas_mut().ap("q");
    let u = t.formulas_mut().until(p, q);
    let gq = t.formulas_mut().globally(q);
    let f = t.formulas_mut().or([u, gq]);
    let opts = TranslateOptions {
        fuse_same_bdds: false,
        ..TranslateOptions::default()
    };
    let dfa = t.to_mtdfa(f, &opts);
    let min = t.minimize(&dfa);
    assert!(min.num_states() <= dfa.num_states());
    let vars = [t.dict().lookup("p").unwrap(), t.dict().lookup("q").unwrap()];
    assert!(same_language(&t, &dfa, &min, &vars, 4));
    let min2 = t.minimize(&min);
    assert_eq!(min.num_states(), min2.num_states());
}

#[test]
fn minimize_xor_check() {
    // Language equality of original and minimized automata, checked
    // symbolically through the xor product.
    let mut t = Translator::new();
    let p = t.formulas_mut().ap("p");
    let q = t.formulas_mut().ap("q");
    let r = t.formulas_mut().release(p, q);
    let fp = t.formulas_mut().finally(p);
    let f = t.formulas_mut().and([r, fp]);
    let dfa = t.to_mtdfa(f, &TranslateOptions::default());
    let min = t.minimize(&dfa);
    let xor = t.product(&dfa, &min, BoolOp::Xor).unwrap();
    assert!(xor.is_empty(t.bdd()));
}

// ─── Fingerprint canonicalization ──────────────────────────────────────────────

#[test]
fn propositionally_equivalent_formulas_share_states() {
    let mut t = Translator::new();
    let p = t.formulas_mut().ap("p");
    let q = t.formulas_mut().ap("q");
    // (p -> q) and (!p | q) are distinct terms with one fingerprint.
    let imp = t.formulas_mut().implies(p, q);
    let np = t.formulas_mut().not(p);
    let alt = t.formulas_mut().or([np, q]);
    assert_ne!(imp, alt);
    assert_eq!(t.formula_ordinal(imp), t.formula_ordinal(alt));
}

// ─── Simplifier ────────────────────────────────────────────────────────────────

#[test]
fn simplifier_preserves_the_language() {
    use ltlf_rs::LtlfSimplifier;

    let mut t = Translator::new();
    let p = t.formulas_mut().ap("p");
    let q = t.formulas_mut().ap("q");

    // A handful of shapes that exercise the different rewritings.
    let cases = {
        let fs = t.formulas_mut();
        let fp = fs.finally(p);
        let fq = fs.finally(q);
        let gp = fs.globally(p);
        let gq = fs.globally(q);
        let u = fs.until(p, q);
        let nu = fs.not(u);
        let fpfq = fs.and([fp, fq]);
        let fpgq = fs.and([fp, gq]);
        let shared = fs.or([fpfq, fpgq]);
        let xp = fs.next(p);
        let nxp = fs.not(xp);
        let imp = fs.implies(nxp, gq);
        let fgp = fs.finally(gp);
        let nfgp = fs.not(fgp);
        let xx = {
            let xq = fs.next(q);
            let nxq = fs.not(xq);
            fs.next(nxq)
        };
        vec![nu, shared, imp, nfgp, xx]
    };

    for f in cases {
        let mut simplifier = LtlfSimplifier::new();
        let g = simplifier.simplify(t.formulas_mut(), f);
        let a = t.to_mtdfa(f, &TranslateOptions::default());
        let b = t.to_mtdfa(g, &TranslateOptions::default());
        let xor = t.product(&a, &b, BoolOp::Xor).unwrap();
        assert!(
            xor.is_empty(t.bdd()),
            "simplifying {} changed the language",
            t.formulas().display(f)
        );
    }
}

// ─── Statistics and rendering ──────────────────────────────────────────────────

#[test]
fn stats_and_dot_cover_the_automaton() {
    let mut t = Translator::new();
    let p = t.formulas_mut().ap("p");
    let q = t.formulas_mut().ap("q");
    let u = t.formulas_mut().until(p, q);
    let dfa = t.to_mtdfa(u, &TranslateOptions::default());
    let stats = dfa.stats(t.bdd(), true, true);
    assert_eq!(stats.states, dfa.num_states());
    assert_eq!(stats.aps, 2);
    assert!(stats.nodes.unwrap() > 0);
    assert!(stats.paths.unwrap() >= stats.edges.unwrap());
    assert!(stats.has_true);
    assert!(stats.has_false);

    let dot = dfa.to_dot(t.bdd(), t.dict(), Some(t.formulas()));
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("S0"));
    assert!(dot.contains('p'));
}
