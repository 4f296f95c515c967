//! End-to-end synthesis scenarios.
//!
//! Covers realizability verdicts, strategy soundness, agreement of the
//! solving modes, and randomized cross-validation of the solvers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ltlf_rs::{
    BoolOp, FormulaId, NodeRef, Semantics, SolveMode, SynthesisOptions, TranslateOptions,
    Translator,
};

fn request_grant(t: &mut Translator) -> FormulaId {
    let req = t.formulas_mut().ap("req");
    let grant = t.formulas_mut().ap("grant");
    let xg = t.formulas_mut().next(grant);
    let step = t.formulas_mut().implies(req, xg);
    t.formulas_mut().globally(step)
}

// ─── The request/grant scenario ────────────────────────────────────────────────

#[test]
fn request_grant_is_realizable() {
    let mut t = Translator::new();
    let f = request_grant(&mut t);
    let strat = t
        .to_mtdfa_for_synthesis(f, &["grant"], &SynthesisOptions::default())
        .unwrap();
    // The 1-state ff automaton must NOT be produced.
    assert!(strat.states[0] != NodeRef::FALSE);
    let vreq = t.dict().lookup("req").unwrap();
    let vgrant = t.dict().lookup("grant").unwrap();
    // Plays that follow the grants stay inside the strategy.
    assert!(strat.accepts(t.bdd(), &[&[vreq], &[vgrant]]));
    assert!(strat.accepts(t.bdd(), &[&[vreq], &[vgrant, vreq], &[vgrant]]));
    // Viewed as a game, the strategy itself is winning from the start.
    let region = t.winning_region(&strat);
    assert!(region[0]);
}

#[test]
fn request_grant_realizability_only() {
    let mut t = Translator::new();
    let f = request_grant(&mut t);
    let opts = SynthesisOptions {
        realizability: true,
        ..SynthesisOptions::default()
    };
    let verdict = t.to_mtdfa_for_synthesis(f, &["grant"], &opts).unwrap();
    assert_eq!(verdict.num_states(), 1);
    assert_eq!(verdict.states[0], NodeRef::TRUE);
}

#[test]
fn unrealizable_goal_returns_ff() {
    // The environment owns req, so G req is hopeless.
    let mut t = Translator::new();
    let req = t.formulas_mut().ap("req");
    let f = t.formulas_mut().globally(req);
    let strat = t
        .to_mtdfa_for_synthesis(f, &["grant"], &SynthesisOptions::default())
        .unwrap();
    assert_eq!(strat.num_states(), 1);
    assert_eq!(strat.states[0], NodeRef::FALSE);
}

#[test]
fn outputs_only_until_is_realizable() {
    // With every proposition controllable, p U q is just satisfiability.
    let mut t = Translator::new();
    let p = t.formulas_mut().ap("p");
    let q = t.formulas_mut().ap("q");
    let f = t.formulas_mut().until(p, q);
    let strat = t
        .to_mtdfa_for_synthesis(f, &["p", "q"], &SynthesisOptions::default())
        .unwrap();
    assert!(strat.states[0] != NodeRef::FALSE);
    let vq = t.dict().lookup("q").unwrap();
    // Granting q immediately must stay within the strategy language.
    assert!(strat.accepts(t.bdd(), &[&[vq]]));
}

#[test]
fn moore_semantics_flips_the_matching_game() {
    let mut t = Translator::new();
    let req = t.formulas_mut().ap("req");
    let grant = t.formulas_mut().ap("grant");
    let f = t.formulas_mut().equiv(grant, req);
    // Mealy: the controller reacts to req and matches it.
    let mealy = t
        .to_mtdfa_for_synthesis(f, &["grant"], &SynthesisOptions::default())
        .unwrap();
    assert!(mealy.states[0] != NodeRef::FALSE);
    // Moore: the controller commits before seeing req.
    let mut t2 = Translator::new();
    let req = t2.formulas_mut().ap("req");
    let grant = t2.formulas_mut().ap("grant");
    let f = t2.formulas_mut().equiv(grant, req);
    let opts = SynthesisOptions {
        semantics: Semantics::Moore,
        ..SynthesisOptions::default()
    };
    let moore = t2.to_mtdfa_for_synthesis(f, &["grant"], &opts).unwrap();
    assert_eq!(moore.states[0], NodeRef::FALSE);
}

// ─── Solver agreement ──────────────────────────────────────────────────────────

/// A strategy automaton must never trap the controller: from every
/// reachable state, for all inputs there is an output avoiding `ff`.
/// Viewed as a game, the strategy must therefore be winning from state 0.
fn assert_strategy_executable(t: &mut Translator, strat: &ltlf_rs::Mtdfa) {
    let region = t.winning_region(strat);
    assert!(region[0], "extracted strategy is not winning");
}

#[test]
fn strategy_is_executable_for_request_grant() {
    let mut t = Translator::new();
    let f = request_grant(&mut t);
    let strat = t
        .to_mtdfa_for_synthesis(f, &["grant"], &SynthesisOptions::default())
        .unwrap();
    assert_strategy_executable(&mut t, &strat);
}

#[test]
fn backprop_refinement_and_regions_agree() {
    let mut t = Translator::new();
    let f = request_grant(&mut t);
    // Translate, make it a game, then solve offline in all ways.
    let dfa = t.to_mtdfa(f, &TranslateOptions::default());
    let mut game = t.restrict_as_game(&dfa);
    game.set_controllable(vec![t.dict().lookup("grant").unwrap()]);

    let eager = t.winning_region(&game);
    let lazy = t.winning_region_lazy(&game);
    let strat_bp = t.winning_strategy(&game, true);
    let strat_ref = t.winning_strategy(&game, false);

    let realizable = eager[0];
    assert_eq!(lazy[0], realizable);
    assert_eq!(strat_bp.states[0] != NodeRef::FALSE, realizable);
    assert_eq!(strat_ref.states[0] != NodeRef::FALSE, realizable);
}

// ─── Arena rendering ───────────────────────────────────────────────────────────

#[test]
fn arena_renders_to_dot() {
    let mut t = Translator::new();
    let f = request_grant(&mut t);
    let dfa = t.to_mtdfa(f, &TranslateOptions::default());
    let mut game = t.restrict_as_game(&dfa);
    game.set_controllable(vec![t.dict().lookup("grant").unwrap()]);
    let arena = t.to_arena(&game, false, true);
    assert!(arena.num_vertices() > 0);
    let dot = arena.to_dot();
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("diamond"));
}

// ─── Randomized cross-validation ───────────────────────────────────────────────

fn random_formula(t: &mut Translator, rng: &mut StdRng, depth: usize) -> FormulaId {
    let fs = t.formulas_mut();
    if depth == 0 {
        return match rng.gen_range(0..2) {
            0 => fs.ap("req"),
            _ => fs.ap("grant"),
        };
    }
    match rng.gen_range(0..12) {
        0 => {
            let a = random_formula(t, rng, depth - 1);
            t.formulas_mut().not(a)
        }
        1 => {
            let a = random_formula(t, rng, depth - 1);
            let b = random_formula(t, rng, depth - 1);
            t.formulas_mut().and([a, b])
        }
        2 => {
            let a = random_formula(t, rng, depth - 1);
            let b = random_formula(t, rng, depth - 1);
            t.formulas_mut().or([a, b])
        }
        3 => {
            let a = random_formula(t, rng, depth - 1);
            let b = random_formula(t, rng, depth - 1);
            t.formulas_mut().implies(a, b)
        }
        4 => {
            let a = random_formula(t, rng, depth - 1);
            t.formulas_mut().next(a)
        }
        5 => {
            let a = random_formula(t, rng, depth - 1);
            t.formulas_mut().strong_next(a)
        }
        6 => {
            let a = random_formula(t, rng, depth - 1);
            t.formulas_mut().finally(a)
        }
        7 => {
            let a = random_formula(t, rng, depth - 1);
            t.formulas_mut().globally(a)
        }
        8 => {
            let a = random_formula(t, rng, depth - 1);
            let b = random_formula(t, rng, depth - 1);
            t.formulas_mut().until(a, b)
        }
        9 => {
            let a = random_formula(t, rng, depth - 1);
            let b = random_formula(t, rng, depth - 1);
            t.formulas_mut().weak_until(a, b)
        }
        10 => {
            let a = random_formula(t, rng, depth - 1);
            let b = random_formula(t, rng, depth - 1);
            t.formulas_mut().release(a, b)
        }
        _ => {
            let a = random_formula(t, rng, depth - 1);
            let b = random_formula(t, rng, depth - 1);
            t.formulas_mut().strong_release(a, b)
        }
    }
}

#[test]
fn random_formulas_realizability_agreement() {
    for round in 0..25u64 {
        let mut verdicts = Vec::new();
        for mode in [
            SolveMode::BfsNodeBackprop,
            SolveMode::DfsNodeBackprop,
            SolveMode::DfsStrictNodeBackprop,
            SolveMode::StateRefine,
        ] {
            // Fresh session per mode so exploration orders cannot share
            // interned state by accident; the formula is rebuilt from the
            // same random choices.
            let mut mode_rng = StdRng::seed_from_u64(round);
            let mut t = Translator::new();
            let f = random_formula(&mut t, &mut mode_rng, 3);
            let opts = SynthesisOptions {
                mode,
                realizability: true,
                ..SynthesisOptions::default()
            };
            let verdict = t.to_mtdfa_for_synthesis(f, &["grant"], &opts).unwrap();
            verdicts.push(verdict.states[0] == NodeRef::TRUE);
        }
        assert!(
            verdicts.iter().all(|&v| v == verdicts[0]),
            "round {}: modes disagree: {:?}",
            round,
            verdicts
        );
    }
}

#[test]
fn random_formulas_strategies_are_executable() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..15 {
        let mut t = Translator::new();
        let f = random_formula(&mut t, &mut rng, 3);
        let strat = t
            .to_mtdfa_for_synthesis(f, &["grant"], &SynthesisOptions::default())
            .unwrap();
        if strat.states[0] == NodeRef::FALSE {
            continue; // unrealizable: nothing to check
        }
        assert_strategy_executable(&mut t, &strat);
    }
}

#[test]
fn random_formulas_minimize_and_products_agree() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..20 {
        let mut t = Translator::new();
        let f = random_formula(&mut t, &mut rng, 3);
        let opts = TranslateOptions {
            fuse_same_bdds: false,
            detect_empty_universal: false,
            ..TranslateOptions::default()
        };
        let dfa = t.to_mtdfa(f, &opts);
        let min = t.minimize(&dfa);
        assert!(min.num_states() <= dfa.num_states().max(1));
        let xor = t.product(&dfa, &min, BoolOp::Xor).unwrap();
        assert!(xor.is_empty(t.bdd()), "minimization changed the language");
    }
}
