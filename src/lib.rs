//! `lemmata` is an engine for tracking how machine-checked lemmas depend on
//! each other and for propagating (dis)proof through those dependencies. A
//! prove script derives statements in whatever order its rewriting takes;
//! this crate records which statement justifies which, decides what each
//! determination settles transitively, and at the end either accepts the run
//! or names exactly what is still open.
//!
//! # Main data structures
//!
//! ## Statements and the graph
//! Every derived proposition becomes a statement in a [`Graph`], carrying a
//! tri-state [`Status`] (conjectured, proven true, proven false) and a set of
//! relation slots: `equivalent`, `given`, `imply`, `substituent` and
//! `counterpart` (see [`Relation`]). A slot holds a [`Justification`], one
//! statement or a candidate list. Statements whose proof is a case split or
//! an induction additionally carry a [`Derivative`].
//!
//! Determinations are applied with [`Graph::set_status`] and cascade through
//! the slots iteratively, so a chain of ten thousand single-step rewrites is
//! settled by one call without growing the stack.
//!
//! ## Propositions
//! The graph is generic over [`Proposition`], the boundary to the symbolic
//! expression system: structural equality, equality up to variable renaming
//! and tautology recognition are all the engine ever asks of it.
//! [`Expression`], a prefix-encoded binary AST, is the implementation shipped
//! with this crate.
//!
//! ## Transcripts
//! A [`Transcript`] is the proof ledger of one lemma run. It deduplicates
//! registered propositions up to variable renaming, merges the derivations
//! of re-derived results, short-circuits tautologies, and on
//! [`Transcript::accept`] reports the entries that remain conjectured.
//!
//! ## Definitions and lemma conclusion
//! Auxiliary symbols introduced during a run live in a [`DefinitionGraph`];
//! [`conclude`] orders their defining equalities before the statements that
//! use them (a dependency cycle is fatal) and collects the run's hypotheses.

#[cfg(feature = "serialization")]
extern crate nom;
#[cfg(test)]
#[macro_use]
extern crate quickcheck;

mod ancestor;
pub mod definition;
pub mod error;
pub mod expression;
pub mod formatter;
mod graph;
mod induction;
mod lemma;
mod propagate;
mod proposition;
mod statement;
mod transcript;
mod types;

pub use definition::{topological_sort, DefinitionGraph};
pub use error::EngineError;
pub use expression::Expression;
pub use graph::Graph;
pub use lemma::conclude;
pub use proposition::Proposition;
pub use statement::*;
pub use transcript::{EntryRef, Registered, Transcript};
pub use types::*;
