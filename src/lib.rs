//! Fold learned chains into one minimized universal co-Büchi word automaton.
//!
//! A chain learner emits linear run patterns ("loop here, or advance on
//! that") as `CHAIN` records over a bit-vector alphabet. This crate unfolds
//! each record into a linear sub-automaton, folds all of them into a single
//! UVW, shrinks it with a sequence of language-preserving reduction passes,
//! and renders the result as a guarded-transition graph for model-checking
//! tools. Guards are BDDs; the boolean algebra itself lives in
//! [`biodivine_lib_bdd`].

pub mod alphabet;
pub mod chain;
pub mod merger;
pub mod nodes;
pub mod utils;
pub mod uvw;

pub use chain::ChainError;
pub use uvw::Uvw;
