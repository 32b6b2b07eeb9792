//! Active learning of deterministic automata over bytes.
//!
//! The central piece is [`LStar`], a variant of Angluin's L* algorithm that builds a
//! [`byte_dfa::ConcreteDfa`] from answers to membership queries and a stream of example words.
//! There are no equivalence queries. Instead, every example on which the current hypothesis
//! disagrees with the [`MembershipOracle`] is processed as a counterexample, and
//! [`LStar::learn_until_stable`] repeatedly checks the hypothesis against its own shortest accepted
//! words.
#![deny(missing_docs)]

/// Brings the learner and the oracle types into scope.
pub mod prelude {
    pub use super::{
        find_integer, AutomatonOracle, ByteNormalizer, CachedOracle, LStar, MembershipOracle,
    };
}

mod search;
pub use search::find_integer;

mod oracle;
pub use oracle::{AutomatonOracle, CachedOracle, MembershipOracle};

mod normalizer;
pub use normalizer::ByteNormalizer;

mod lstar;
pub use lstar::LStar;
