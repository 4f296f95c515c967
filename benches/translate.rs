//! Translation and synthesis benchmarks.
//!
//! Run with:
//! ```bash
//! cargo bench --bench translate
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ltlf_rs::{FormulaId, SynthesisOptions, TranslateOptions, Translator};

// ============================================================================
// Helpers: parameterized formula families
// ============================================================================

/// Nested untils: p1 U (p2 U (... U pn)).
fn until_chain(t: &mut Translator, n: usize) -> FormulaId {
    let mut f = t.formulas_mut().ap(&format!("p{}", n));
    for i in (1..n).rev() {
        let p = t.formulas_mut().ap(&format!("p{}", i));
        f = t.formulas_mut().until(p, f);
    }
    f
}

/// Conjunction of request/grant obligations: ∧ᵢ G(reqᵢ -> X grantᵢ).
fn grant_ladder(t: &mut Translator, n: usize) -> FormulaId {
    let mut conjuncts = Vec::new();
    for i in 0..n {
        let req = t.formulas_mut().ap(&format!("req{}", i));
        let grant = t.formulas_mut().ap(&format!("grant{}", i));
        let xg = t.formulas_mut().next(grant);
        let step = t.formulas_mut().implies(req, xg);
        let g = t.formulas_mut().globally(step);
        conjuncts.push(g);
    }
    t.formulas_mut().and(conjuncts)
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_translate(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate");
    for n in [4usize, 8, 12] {
        group.bench_with_input(BenchmarkId::new("until_chain", n), &n, |b, &n| {
            b.iter(|| {
                let mut t = Translator::new();
                let f = until_chain(&mut t, n);
                t.to_mtdfa(f, &TranslateOptions::default())
            })
        });
    }
    group.finish();
}

fn bench_minimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("minimize");
    for n in [4usize, 8] {
        group.bench_with_input(BenchmarkId::new("until_chain", n), &n, |b, &n| {
            let mut t = Translator::new();
            let f = until_chain(&mut t, n);
            let opts = TranslateOptions {
                fuse_same_bdds: false,
                ..TranslateOptions::default()
            };
            let dfa = t.to_mtdfa(f, &opts);
            b.iter(|| t.minimize(&dfa))
        });
    }
    group.finish();
}

fn bench_synthesis(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesis");
    for n in [2usize, 4, 6] {
        group.bench_with_input(BenchmarkId::new("grant_ladder", n), &n, |b, &n| {
            let outputs: Vec<String> = (0..n).map(|i| format!("grant{}", i)).collect();
            b.iter(|| {
                let mut t = Translator::new();
                let f = grant_ladder(&mut t, n);
                let outs: Vec<&str> = outputs.iter().map(|s| s.as_str()).collect();
                let opts = SynthesisOptions {
                    realizability: true,
                    ..SynthesisOptions::default()
                };
                t.to_mtdfa_for_synthesis(f, &outs, &opts).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_translate, bench_minimize, bench_synthesis);
criterion_main!(benches);
