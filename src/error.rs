//! Error taxonomy.
//!
//! Only *caller-fixable* conditions are surfaced as [`Error`] values.
//! Invariant violations (terminal payload mismatches, freezing a frozen
//! arena vertex, re-determining a determined vertex) are programmer errors
//! and panic instead.  Operation-cache pressure is handled internally and
//! never observable.  An unrealizable specification is **not** an error:
//! synthesis returns the 1-state `ff` automaton as a normal value.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The formula contains an operator outside the supported LTLf
    /// fragment (e.g. a PSL/regex operator rejected at the front-end).
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Two automata from different translator sessions (distinct variable
    /// dictionaries) were combined.
    #[error("automata do not share a variable dictionary")]
    DictionaryMismatch,

    /// An argument that must be strictly positive was zero or negative.
    #[error("{what} must be strictly positive (got {got})")]
    NonPositiveArgument { what: &'static str, got: i64 },
}

pub type Result<T> = std::result::Result<T, Error>;
