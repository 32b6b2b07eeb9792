use byte_dfa::{math::Map, prelude::*};
use tracing::trace;

/// Answers membership queries for the language that is being learned. Learners call
/// [`MembershipOracle::is_member`] for every word whose classification they need.
///
/// Every `FnMut(&[u8]) -> bool` is an oracle, so closures over a test function can be handed to a
/// learner directly.
pub trait MembershipOracle {
    /// Returns `true` if and only if `word` belongs to the language.
    fn is_member(&mut self, word: &[u8]) -> bool;
}

impl<F> MembershipOracle for F
where
    F: FnMut(&[u8]) -> bool,
{
    fn is_member(&mut self, word: &[u8]) -> bool {
        self(word)
    }
}

/// An oracle that answers membership queries by running words through an automaton.
#[derive(Debug, Clone)]
pub struct AutomatonOracle<A>(pub A);

impl<A: Automaton> MembershipOracle for AutomatonOracle<A> {
    fn is_member(&mut self, word: &[u8]) -> bool {
        self.0.matches(word)
    }
}

/// Memoises the answers of another oracle, so that every distinct word is passed on at most once.
/// The wrapped oracle may be expensive, for example when every query runs a test function.
#[derive(Debug, Clone)]
pub struct CachedOracle<O> {
    oracle: O,
    answers: Map<Vec<u8>, bool>,
}

impl<O: MembershipOracle> CachedOracle<O> {
    /// Wraps `oracle` with an empty cache.
    pub fn new(oracle: O) -> Self {
        Self {
            oracle,
            answers: Map::default(),
        }
    }

    /// The number of distinct words that were passed on to the wrapped oracle.
    pub fn queries(&self) -> usize {
        self.answers.len()
    }

    /// Returns the answer for `word` if it has been asked before.
    pub fn cached(&self, word: &[u8]) -> Option<bool> {
        self.answers.get(word).copied()
    }

    /// Gives back the wrapped oracle, dropping all cached answers.
    pub fn into_inner(self) -> O {
        self.oracle
    }
}

impl<O: MembershipOracle> MembershipOracle for CachedOracle<O> {
    fn is_member(&mut self, word: &[u8]) -> bool {
        if let Some(answer) = self.answers.get(word) {
            return *answer;
        }
        let answer = self.oracle.is_member(word);
        trace!("oracle classifies {} as {answer}", Bytes(word));
        self.answers.insert(word.to_vec(), answer);
        answer
    }
}

#[cfg(test)]
mod tests {
    use byte_dfa::prelude::*;

    use super::{AutomatonOracle, CachedOracle, MembershipOracle};

    #[test]
    fn closures_are_oracles() {
        let mut even = |word: &[u8]| word.len() % 2 == 0;
        assert!(even.is_member(b"ab"));
        assert!(!even.is_member(b"a"));
    }

    #[test]
    fn answers_are_cached() {
        let mut calls = 0;
        let mut oracle = CachedOracle::new(|word: &[u8]| {
            calls += 1;
            word.starts_with(b"x")
        });
        assert!(oracle.is_member(b"xy"));
        assert!(oracle.is_member(b"xy"));
        assert!(!oracle.is_member(b"y"));
        assert_eq!(oracle.queries(), 2);
        assert_eq!(oracle.cached(b"y"), Some(false));
        assert_eq!(oracle.cached(b"z"), None);
        drop(oracle);
        assert_eq!(calls, 2);
    }

    #[test]
    fn automata_are_oracles() {
        let dfa = ConcreteDfa::from_pairs(vec![vec![(b'a', 1)], vec![]], [1], 0);
        let mut oracle = AutomatonOracle(&dfa);
        assert!(oracle.is_member(b"a"));
        assert!(!oracle.is_member(b"aa"));
    }
}
