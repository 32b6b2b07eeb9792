use std::{cell::RefCell, cmp::Ordering, collections::BTreeMap};

use bit_set::BitSet;
use itertools::Itertools;
use tracing::trace;

use crate::{analysis::Analysis, Automaton, StateId, DEAD};

/// Sparse transition tables with at least this many entries are converted into a dense table the
/// first time one of their transitions is looked up.
pub const DENSE_THRESHOLD: usize = 5;

/// A single entry of a sparse transition table: every byte in the inclusive range `lo..=hi`
/// leads to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entry {
    /// Smallest byte covered by the entry.
    pub lo: u8,
    /// Largest byte covered by the entry.
    pub hi: u8,
    /// The state that all covered bytes lead to.
    pub target: StateId,
}

impl Entry {
    /// Creates an entry covering the inclusive range `lo..=hi`.
    pub fn range(lo: u8, hi: u8, target: StateId) -> Self {
        assert!(lo <= hi, "range {lo}..={hi} is inverted");
        Self { lo, hi, target }
    }

    /// Creates an entry covering a single byte.
    pub fn single(byte: u8, target: StateId) -> Self {
        Self::range(byte, byte, target)
    }

    fn covers(&self, byte: u8) -> Ordering {
        if self.hi < byte {
            Ordering::Less
        } else if self.lo > byte {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

/// Describes the outgoing transitions of one state when constructing a [`ConcreteDfa`]. Different
/// states may use different forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionSpec {
    /// A list of (possibly ranged) entries, stored sparsely.
    Entries(Vec<Entry>),
    /// A mapping from bytes to targets, stored densely.
    Map(BTreeMap<u8, StateId>),
}

impl Default for TransitionSpec {
    fn default() -> Self {
        Self::none()
    }
}

impl TransitionSpec {
    /// A state without any transitions, every byte leads to [`DEAD`].
    pub fn none() -> Self {
        Self::Entries(vec![])
    }

    /// Sparse transitions, each pair `(byte, target)` being a single entry.
    pub fn pairs(pairs: impl IntoIterator<Item = (u8, StateId)>) -> Self {
        Self::Entries(
            pairs
                .into_iter()
                .map(|(byte, target)| Entry::single(byte, target))
                .collect(),
        )
    }

    /// Sparse transitions given as inclusive ranges `(lo, hi, target)`.
    pub fn ranges(ranges: impl IntoIterator<Item = (u8, u8, StateId)>) -> Self {
        Self::Entries(
            ranges
                .into_iter()
                .map(|(lo, hi, target)| Entry::range(lo, hi, target))
                .collect(),
        )
    }

    /// Dense transitions, given as a mapping from bytes to targets.
    pub fn map(map: impl IntoIterator<Item = (u8, StateId)>) -> Self {
        Self::Map(map.into_iter().collect())
    }
}

impl From<Vec<Entry>> for TransitionSpec {
    fn from(value: Vec<Entry>) -> Self {
        Self::Entries(value)
    }
}

impl From<BTreeMap<u8, StateId>> for TransitionSpec {
    fn from(value: BTreeMap<u8, StateId>) -> Self {
        Self::Map(value)
    }
}

/// The stored transitions of a single state.
#[derive(Debug, Clone)]
pub(crate) enum Table {
    /// Sorted, non-overlapping entries, looked up through binary search.
    Sparse(Vec<Entry>),
    /// One target per byte.
    Dense(Box<[StateId; 256]>),
}

impl Table {
    fn from_spec(spec: TransitionSpec) -> Self {
        match spec {
            TransitionSpec::Entries(mut entries) => {
                entries.sort();
                for (left, right) in entries.iter().tuple_windows() {
                    assert!(
                        left.hi < right.lo,
                        "transition entries {left:?} and {right:?} overlap"
                    );
                }
                Table::Sparse(entries)
            }
            TransitionSpec::Map(map) => {
                let mut dense = Box::new([DEAD; 256]);
                for (byte, target) in map {
                    dense[byte as usize] = target;
                }
                Table::Dense(dense)
            }
        }
    }

    fn get(&self, byte: u8) -> StateId {
        match self {
            Table::Dense(dense) => dense[byte as usize],
            Table::Sparse(entries) => entries
                .binary_search_by(|entry| entry.covers(byte))
                .map(|pos| entries[pos].target)
                .unwrap_or(DEAD),
        }
    }

    fn targets(&self) -> Vec<StateId> {
        match self {
            Table::Dense(dense) => dense.iter().copied().filter(|t| *t != DEAD).collect(),
            Table::Sparse(entries) => entries.iter().map(|e| e.target).collect(),
        }
    }

    fn should_densify(&self) -> bool {
        matches!(self, Table::Sparse(entries) if entries.len() >= DENSE_THRESHOLD)
    }

    fn densify(&mut self) {
        if let Table::Sparse(entries) = self {
            let mut dense = Box::new([DEAD; 256]);
            for entry in entries.iter() {
                for byte in entry.lo..=entry.hi {
                    dense[byte as usize] = entry.target;
                }
            }
            *self = Table::Dense(dense);
        }
    }
}

/// A deterministic finite automaton over bytes that is backed by an explicit state table.
///
/// The language of a [`ConcreteDfa`] is fixed at construction. Internally, the transitions of a
/// state may switch from a sparse list of byte ranges to a dense table once that state is queried
/// and has at least [`DENSE_THRESHOLD`] entries. This is purely a change of representation, no
/// transition ever changes its outcome.
pub struct ConcreteDfa {
    start: StateId,
    accepting: BitSet,
    tables: Vec<RefCell<Table>>,
    pub(crate) analysis: Analysis,
}

impl ConcreteDfa {
    /// Creates a new automaton. The `i`-th element of `transitions` describes the outgoing
    /// transitions of state `i`.
    ///
    /// # Panics
    /// If any target, accepting state or the start state does not exist, or if the entries of a
    /// state overlap.
    ///
    /// # Example
    /// ```
    /// use byte_dfa::prelude::*;
    ///
    /// let dfa = ConcreteDfa::new(
    ///     [
    ///         TransitionSpec::pairs([(2, 1)]),
    ///         TransitionSpec::ranges([(0, 5, 2)]),
    ///         TransitionSpec::map([(4, 0), (3, 1)]),
    ///     ],
    ///     [0],
    ///     0,
    /// );
    /// assert_eq!(dfa.transition(0, 2), 1);
    /// assert_eq!(dfa.transition(0, 3), DEAD);
    /// assert_eq!(dfa.transition(1, 5), 2);
    /// assert_eq!(dfa.transition(2, 3), 1);
    /// ```
    pub fn new(
        transitions: impl IntoIterator<Item = TransitionSpec>,
        accepting: impl IntoIterator<Item = StateId>,
        start: StateId,
    ) -> Self {
        let tables: Vec<_> = transitions
            .into_iter()
            .map(|spec| RefCell::new(Table::from_spec(spec)))
            .collect();
        let size = tables.len();
        assert!(size > 0, "an automaton needs at least one state");
        assert!(
            (start as usize) < size,
            "start state {start} does not exist in automaton of size {size}"
        );
        for table in &tables {
            for target in table.borrow().targets() {
                assert!(
                    (target as usize) < size,
                    "transition target {target} does not exist in automaton of size {size}"
                );
            }
        }
        let accepting: BitSet = accepting
            .into_iter()
            .map(|q| {
                assert!(
                    (q as usize) < size,
                    "accepting state {q} does not exist in automaton of size {size}"
                );
                q as usize
            })
            .collect();

        Self {
            start,
            accepting,
            analysis: Analysis::new(size),
            tables,
        }
    }

    /// Shorthand for [`ConcreteDfa::new`] where every state lists its transitions as
    /// `(byte, target)` pairs.
    pub fn from_pairs<I>(
        transitions: impl IntoIterator<Item = I>,
        accepting: impl IntoIterator<Item = StateId>,
        start: StateId,
    ) -> Self
    where
        I: IntoIterator<Item = (u8, StateId)>,
    {
        Self::new(
            transitions.into_iter().map(TransitionSpec::pairs),
            accepting,
            start,
        )
    }

    /// The automaton with a single, rejecting state, which accepts no word at all.
    pub fn empty() -> Self {
        Self::new([TransitionSpec::none()], [], 0)
    }

    /// Returns the number of states.
    pub fn size(&self) -> usize {
        self.tables.len()
    }

    /// Iterates over the accepting states in ascending order.
    pub fn accepting_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.accepting.iter().map(|q| q as StateId)
    }

    /// Returns `true` if the transitions of `state` are currently stored as a dense table.
    pub fn is_dense(&self, state: StateId) -> bool {
        matches!(*self.tables[state as usize].borrow(), Table::Dense(_))
    }

    /// Iterates over all `(byte, target)` pairs leaving `state` in ascending byte order, omitting
    /// transitions into [`DEAD`].
    pub fn raw_transitions(&self, state: StateId) -> impl Iterator<Item = (u8, StateId)> + '_ {
        (0..=u8::MAX).filter_map(move |byte| match self.transition(state, byte) {
            DEAD => None,
            target => Some((byte, target)),
        })
    }

    /// Iterates over the `(byte, target)` pairs leaving `state` in ascending byte order, omitting
    /// transitions into dead states.
    pub fn transitions(&self, state: StateId) -> impl Iterator<Item = (u8, StateId)> + '_ {
        self.raw_transitions(state)
            .filter(move |(_, target)| !self.is_dead(*target))
    }

    /// Groups the transitions of `state` into maximal runs of consecutive bytes with the same
    /// target. Transitions into [`DEAD`] are omitted.
    pub fn entries(&self, state: StateId) -> Vec<Entry> {
        let mut out: Vec<Entry> = vec![];
        for (byte, target) in self.raw_transitions(state) {
            match out.last_mut() {
                Some(last) if last.target == target && last.hi as u16 + 1 == byte as u16 => {
                    last.hi = byte;
                }
                _ => out.push(Entry::single(byte, target)),
            }
        }
        out
    }
}

impl Automaton for ConcreteDfa {
    fn start(&self) -> StateId {
        self.start
    }

    fn is_accepting(&self, state: StateId) -> bool {
        state != DEAD && self.accepting.contains(state as usize)
    }

    fn transition(&self, state: StateId, byte: u8) -> StateId {
        if state == DEAD {
            return DEAD;
        }
        let cell = &self.tables[state as usize];
        if cell.borrow().should_densify() {
            trace!("converting transitions of state {state} into a dense table");
            cell.borrow_mut().densify();
        }
        cell.borrow().get(byte)
    }
}

impl Clone for ConcreteDfa {
    fn clone(&self) -> Self {
        Self {
            start: self.start,
            accepting: self.accepting.clone(),
            tables: self.tables.clone(),
            analysis: Analysis::new(self.size()),
        }
    }
}

impl PartialEq for ConcreteDfa {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start
            && self.accepting_states().eq(other.accepting_states())
            && self.size() == other.size()
            && (0..self.size() as StateId).all(|q| self.entries(q) == other.entries(q))
    }
}

impl Eq for ConcreteDfa {}

impl std::fmt::Debug for ConcreteDfa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn mixed_initialisation() {
        let dfa = ConcreteDfa::new(
            [
                TransitionSpec::pairs([(2, 1)]),
                TransitionSpec::ranges([(0, 5, 2)]),
                TransitionSpec::map([(4, 0), (3, 1)]),
            ],
            [0],
            0,
        );

        assert_eq!(dfa.transition(0, 2), 1);
        assert_eq!(dfa.transition(0, 3), DEAD);
        for n in 0..6 {
            assert_eq!(dfa.transition(1, n), 2);
        }
        assert_eq!(dfa.transition(1, 6), DEAD);
        assert_eq!(dfa.transition(2, 4), 0);
        assert_eq!(dfa.transition(2, 3), 1);
        assert_eq!(dfa.transition(2, 5), DEAD);
        assert_eq!(dfa.transition(DEAD, 0), DEAD);
    }

    #[test_log::test]
    fn converts_long_tables_to_dense() {
        let dfa = ConcreteDfa::from_pairs(
            vec![
                vec![(0, 0), (1, 1), (2, 2), (3, 1), (4, 0)],
                vec![(0, 0)],
                vec![],
            ],
            [2],
            0,
        );
        assert!(!dfa.is_dense(0));
        let before = dfa.raw_transitions(0).collect::<Vec<_>>();
        assert!(dfa.is_dense(0));
        assert!(!dfa.is_dense(1));
        assert_eq!(before, vec![(0, 0), (1, 1), (2, 2), (3, 1), (4, 0)]);
        assert_eq!(dfa.raw_transitions(0).collect::<Vec<_>>(), before);
        assert_eq!(dfa.transition(0, 5), DEAD);
        assert!(dfa.matches(&[2]));
        assert!(dfa.matches(&[1, 0, 4, 2]));
    }

    #[test]
    fn entries_group_consecutive_runs() {
        let dfa = ConcreteDfa::new(
            [
                TransitionSpec::ranges([(0, 9, 1), (10, 10, 1), (12, 12, 1), (13, 20, 0)]),
                TransitionSpec::none(),
            ],
            [1],
            0,
        );
        assert_eq!(
            dfa.entries(0),
            vec![
                Entry::range(0, 10, 1),
                Entry::single(12, 1),
                Entry::range(13, 20, 0)
            ]
        );
        assert!(dfa.entries(1).is_empty());
    }

    #[test]
    #[should_panic]
    fn overlapping_entries_are_rejected() {
        ConcreteDfa::new([TransitionSpec::ranges([(0, 5, 0), (5, 6, 0)])], [], 0);
    }

    #[test]
    #[should_panic]
    fn unknown_targets_are_rejected() {
        ConcreteDfa::from_pairs(vec![vec![(0, 1)]], [], 0);
    }
}
