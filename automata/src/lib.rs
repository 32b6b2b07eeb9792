//! Deterministic finite automata over the byte alphabet.
//!
//! An automaton has a designated start state, a set of accepting states and a total transition
//! function `(state, byte) -> state`, where the sentinel [`DEAD`] stands for "no further match is
//! possible". The abstract capability is captured by the [`Automaton`] trait, while
//! [`ConcreteDfa`] is the table-backed implementation that everything in this crate produces.
//!
//! Beyond membership, a [`ConcreteDfa`] answers a number of derived questions, all memoised on the
//! instance:
//! - whether a state is dead, see [`ConcreteDfa::is_dead`],
//! - the length of the longest accepted word, see [`ConcreteDfa::max_length`],
//! - the exact number of accepted words of a given length, see [`ConcreteDfa::count_strings`],
//! - the accepted words in shortlex order, see [`ConcreteDfa::all_matching_strings`].
//!
//! Every automaton can be brought into a canonical form (see [`Automaton::canonicalise`]), which
//! is the minimal automaton for its language with states numbered in the order in which they are
//! first reached. The textual encoding of a canonical automaton (its [`std::fmt::Display`]
//! implementation) is therefore a fingerprint of the accepted language.
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The prelude is supposed to make using this package easier. Including everything, i.e.
/// `use byte_dfa::prelude::*;` should be enough to use the package.
pub mod prelude {
    pub use super::{
        automaton::{Automaton, Bytes, MaxLength, StateId, DEAD},
        concrete::{ConcreteDfa, Entry, TransitionSpec},
        encoding::ParseError,
        enumerate::MatchingStrings,
        math,
    };
}

/// Type aliases for the collections used throughout the crate.
pub mod math;

mod automaton;
pub use automaton::{Automaton, Bytes, MaxLength, StateId, DEAD};

mod concrete;
pub use concrete::{ConcreteDfa, Entry, TransitionSpec, DENSE_THRESHOLD};

mod analysis;

mod enumerate;
pub use enumerate::MatchingStrings;

mod canonical;
mod equivalence;

mod encoding;
pub use encoding::ParseError;

/// Generation of random automata, used for property tests and benchmarks.
#[cfg(feature = "random")]
pub mod random;
