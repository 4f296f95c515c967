//! # ltlf-rs: LTLf translation and reactive synthesis over MTBDDs
//!
//! **`ltlf-rs`** translates linear temporal logic over *finite* traces
//! (LTLf) into symbolic deterministic finite automata, and solves the
//! reactive-synthesis game on the fly.  The transition relation of an
//! automaton is a **multi-terminal binary decision diagram** (MTBDD): a
//! BDD whose leaves carry `(successor state, may-stop)` payloads instead of
//! just `0`/`1`.
//!
//! ## How it works
//!
//! - Formulas are hash-consed in a [`Formulas`][formula::Formulas] arena,
//!   so equality is one integer comparison.
//! - The symbolic successor function `τ` maps a formula to an MTBDD over
//!   its atomic propositions; the formulas found on the leaves are the
//!   successor states, interned modulo *propositional equivalence* (a BDD
//!   fingerprint where every temporal subformula becomes an opaque
//!   variable).
//! - A BFS/DFS worklist turns `τ` into a whole automaton
//!   ([`Translator::to_mtdfa`][translate::Translator::to_mtdfa]); products,
//!   complement and Moore-style minimization work directly on the diagrams.
//! - For synthesis, the atomic propositions are split into inputs and
//!   outputs: every diagram node becomes a vertex of a two-player arena
//!   solved by backpropagation while the automaton is still being
//!   explored, so a determined initial state stops translation early.
//!   Unrealizability is a normal result (the 1-state `ff` automaton), not
//!   an error.
//!
//! ## Basic usage
//!
//! ```rust
//! use ltlf_rs::{Translator, TranslateOptions};
//!
//! let mut t = Translator::new();
//! let p = t.formulas_mut().ap("p");
//! let q = t.formulas_mut().ap("q");
//! let f = t.formulas_mut().until(p, q);
//! let dfa = t.to_mtdfa(f, &TranslateOptions::default());
//!
//! let vp = t.dict().lookup("p").unwrap();
//! let vq = t.dict().lookup("q").unwrap();
//! assert!(dfa.accepts(t.bdd(), &[&[vp], &[vq]]));
//! assert!(!dfa.accepts(t.bdd(), &[&[vp], &[vp]]));
//! ```
//!
//! ## Synthesis
//!
//! ```rust
//! use ltlf_rs::{NodeRef, SynthesisOptions, Translator};
//!
//! let mut t = Translator::new();
//! let req = t.formulas_mut().ap("req");
//! let grant = t.formulas_mut().ap("grant");
//! let xg = t.formulas_mut().next(grant);
//! let step = t.formulas_mut().implies(req, xg);
//! let spec = t.formulas_mut().globally(step);
//!
//! let opts = SynthesisOptions { realizability: true, ..SynthesisOptions::default() };
//! let verdict = t.to_mtdfa_for_synthesis(spec, &["grant"], &opts).unwrap();
//! assert_eq!(verdict.states[0], NodeRef::TRUE); // realizable
//! ```
//!
//! ## Core components
//!
//! - **[`mtbdd`]**: the MTBDD manager — canonical nodes, apply/meld
//!   operations with caller-supplied leaf contexts, game quantification.
//! - **[`formula`]** and **[`onestep`]**: the LTLf algebra and its one-step
//!   approximations at the last trace position.
//! - **[`translate`]**: terminal interning, the propositional-equivalence
//!   canonicalizer, `τ`, and the exploration/synthesis worklists.
//! - **[`product`]**, **[`minimize`]**: Boolean combinations and partition
//!   refinement on diagrams.
//! - **[`backprop`]**, **[`games`]**: the game arena, its incremental
//!   encoder, the winning-region fixed points and strategy extraction.
//!
//! A session ([`Translator`]) owns every table; concurrent use requires
//! disjoint sessions.

pub mod backprop;
pub mod cache;
pub mod compose;
pub mod dfa;
pub mod dict;
pub mod error;
pub mod formula;
pub mod games;
pub mod minimize;
pub mod mtbdd;
pub mod node;
pub mod onestep;
pub mod product;
pub mod simplify;
pub mod translate;
pub mod types;
pub mod utils;

pub use crate::backprop::{BackpropGraph, VertexId};
pub use crate::compose::ComposeOptions;
pub use crate::dfa::{Mtdfa, MtdfaStats};
pub use crate::dict::{Semantics, VarDict};
pub use crate::error::{Error, Result};
pub use crate::formula::{FormulaId, FormulaKind, Formulas};
pub use crate::games::BackpropEncoder;
pub use crate::mtbdd::Mtbdd;
pub use crate::onestep::{one_step_sat_rewrite, one_step_unsat_rewrite};
pub use crate::simplify::LtlfSimplifier;
pub use crate::translate::{BoolOp, SolveMode, SynthesisOptions, TranslateOptions, Translator};
pub use crate::types::{Leaf, Lit, NodeRef, Terminal, Var};
