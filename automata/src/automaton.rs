use std::fmt::{Debug, Display};

use crate::ConcreteDfa;

/// Index of a state in the state table of an automaton.
pub type StateId = u32;

/// Sentinel state that is reached once no accepting state can be reached anymore. It is never a
/// valid index into a state table, every transition from it leads back to it and it is never
/// accepting.
pub const DEAD: StateId = StateId::MAX;

/// The length of the longest word accepted from some state. A state from which words of
/// unbounded length are accepted has length [`MaxLength::Infinite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MaxLength {
    /// The longest accepted word has precisely this length.
    Finite(usize),
    /// There are accepted words of unbounded length.
    Infinite,
}

impl MaxLength {
    /// Returns `true` if and only if the length is bounded.
    pub fn is_finite(&self) -> bool {
        matches!(self, MaxLength::Finite(_))
    }

    /// Gives back the bounded length, `None` if it is [`MaxLength::Infinite`].
    pub fn finite(&self) -> Option<usize> {
        match self {
            MaxLength::Finite(n) => Some(*n),
            MaxLength::Infinite => None,
        }
    }

    /// The length obtained by prepending a single symbol.
    pub(crate) fn successor(self) -> Self {
        match self {
            MaxLength::Finite(n) => MaxLength::Finite(n + 1),
            MaxLength::Infinite => MaxLength::Infinite,
        }
    }
}

impl Display for MaxLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaxLength::Finite(n) => write!(f, "{n}"),
            MaxLength::Infinite => write!(f, "inf"),
        }
    }
}

/// A deterministic automaton over the byte alphabet.
///
/// Implementors only provide the start state, the accepting states and the transition function.
/// Membership, language equivalence and canonicalisation are derived from these. Implementations
/// have to make sure that [`DEAD`] behaves as a non-accepting sink, i.e. `is_accepting(DEAD)` is
/// `false` and `transition(DEAD, b)` is [`DEAD`] for every byte `b`.
pub trait Automaton {
    /// The designated initial state.
    fn start(&self) -> StateId;

    /// Returns `true` if and only if `state` is accepting.
    fn is_accepting(&self, state: StateId) -> bool;

    /// The state reached by reading `byte` in `state`, this is [`DEAD`] if no transition exists.
    fn transition(&self, state: StateId, byte: u8) -> StateId;

    /// Reads `word` from the start state and returns whether the reached state is accepting.
    ///
    /// # Example
    /// ```
    /// use byte_dfa::prelude::*;
    ///
    /// let dfa = ConcreteDfa::from_pairs(vec![vec![(0, 1)], vec![]], [1], 0);
    /// assert!(dfa.matches(&[0]));
    /// assert!(!dfa.matches(&[]));
    /// assert!(!dfa.matches(&[0, 0]));
    /// ```
    fn matches(&self, word: &[u8]) -> bool {
        let mut state = self.start();
        for &byte in word {
            state = self.transition(state, byte);
            if state == DEAD {
                return false;
            }
        }
        self.is_accepting(state)
    }

    /// Checks whether `self` and `other` accept precisely the same words. This searches the
    /// product of both automata for a reachable pair of states on which exactly one side accepts.
    fn equivalent<O: Automaton + ?Sized>(&self, other: &O) -> bool {
        crate::equivalence::distinguishing_word(self, other).is_none()
    }

    /// Computes the canonical representative of the accepted language: the minimal automaton, with
    /// dead and unreachable states removed and states numbered in the order in which a breadth
    /// first search in ascending byte order first reaches them. Two automata accept the same
    /// language if and only if their canonical forms are encoded identically.
    fn canonicalise(&self) -> ConcreteDfa {
        crate::canonical::canonicalise(self)
    }
}

impl<A: Automaton + ?Sized> Automaton for &A {
    fn start(&self) -> StateId {
        A::start(self)
    }

    fn is_accepting(&self, state: StateId) -> bool {
        A::is_accepting(self, state)
    }

    fn transition(&self, state: StateId, byte: u8) -> StateId {
        A::transition(self, state, byte)
    }
}

/// Wrapper for printing words over bytes in logs and panics. Printable ASCII is shown as is,
/// everything else is escaped, e.g. `b"ab\x00"`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Bytes<'a>(pub &'a [u8]);

impl Display for Bytes<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b\"")?;
        for b in self.0 {
            write!(f, "{}", std::ascii::escape_default(*b))?;
        }
        write!(f, "\"")
    }
}

impl Debug for Bytes<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::MaxLength;

    #[test]
    fn bytes_are_escaped() {
        assert_eq!(super::Bytes(b"ab\x00\xff").to_string(), "b\"ab\\x00\\xff\"");
    }

    #[test]
    fn max_length_ordering() {
        assert!(MaxLength::Finite(1000) < MaxLength::Infinite);
        assert!(MaxLength::Finite(2) > MaxLength::Finite(1));
        assert_eq!(MaxLength::Finite(3).successor(), MaxLength::Finite(4));
        assert_eq!(MaxLength::Infinite.successor(), MaxLength::Infinite);
        assert_eq!(MaxLength::Infinite.finite(), None);
    }
}
