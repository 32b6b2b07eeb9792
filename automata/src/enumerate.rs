use num_traits::{One, Zero};
use tracing::trace;

use crate::{math::Count, Automaton, ConcreteDfa, MaxLength, StateId, DEAD};

/// Iterator over the words accepted by a [`ConcreteDfa`] in shortlex order, i.e. ordered by
/// length first and lexicographically among words of equal length. Obtained through
/// [`ConcreteDfa::all_matching_strings`].
///
/// Words are produced by rank: to obtain the `k`-th accepted word of length `n`, we descend
/// from the start state and at each position skip over whole subtrees of bytes by their number of
/// accepted completions. Producing a word therefore takes time proportional to its length times
/// the alphabet size, no matter how many words precede it.
#[derive(Clone)]
pub struct MatchingStrings<'a> {
    dfa: &'a ConcreteDfa,
    length: usize,
    rank: Count,
    max_length: Option<MaxLength>,
}

impl<'a> MatchingStrings<'a> {
    pub(crate) fn new(dfa: &'a ConcreteDfa) -> Self {
        let max_length = if dfa.is_dead(dfa.start()) {
            None
        } else {
            Some(dfa.max_length(dfa.start()))
        };
        Self {
            dfa,
            length: 0,
            rank: Count::zero(),
            max_length,
        }
    }
}

impl Iterator for MatchingStrings<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.max_length? {
                MaxLength::Finite(max) if self.length > max => {
                    self.max_length = None;
                    return None;
                }
                _ => {}
            }

            let start = self.dfa.start();
            if self.rank < self.dfa.count_strings(start, self.length) {
                let word = self.dfa.nth_string(start, self.length, self.rank.clone());
                self.rank += Count::one();
                return Some(word);
            }

            trace!("exhausted all accepted words of length {}", self.length);
            self.length += 1;
            self.rank = Count::zero();
        }
    }
}

impl ConcreteDfa {
    /// Returns an iterator over all accepted words in shortlex order. The iterator is lazy and
    /// infinite if and only if words of unbounded length are accepted. Every call starts afresh
    /// from the shortest accepted word.
    ///
    /// # Example
    /// ```
    /// use byte_dfa::prelude::*;
    ///
    /// let dfa = ConcreteDfa::from_pairs(
    ///     vec![vec![(0, 1), (1, 2)], vec![], vec![(1, 3)], vec![]],
    ///     [1, 3],
    ///     0,
    /// );
    /// let words: Vec<_> = dfa.all_matching_strings().collect();
    /// assert_eq!(words, vec![vec![0], vec![1, 1]]);
    /// ```
    pub fn all_matching_strings(&self) -> MatchingStrings<'_> {
        MatchingStrings::new(self)
    }

    /// Computes the accepted word of length `length` with the given `rank` among all words of that
    /// length accepted from `state`, in lexicographic order.
    ///
    /// # Panics
    /// If `rank` is not smaller than `self.count_strings(state, length)`.
    pub fn nth_string(&self, mut state: StateId, length: usize, mut rank: Count) -> Vec<u8> {
        assert!(
            rank < self.count_strings(state, length),
            "rank {rank} exceeds the number of accepted words of length {length}"
        );
        let mut word = Vec::with_capacity(length);
        for remaining in (0..length).rev() {
            let mut chosen = None;
            for byte in 0..=u8::MAX {
                let target = self.transition(state, byte);
                if target == DEAD {
                    continue;
                }
                let completions = self.count_strings(target, remaining);
                if rank < completions {
                    chosen = Some((byte, target));
                    break;
                }
                rank -= completions;
            }
            let (byte, target) = chosen.expect("accepted word counts are inconsistent");
            word.push(byte);
            state = target;
        }
        word
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn enumeration_when_sizes_do_not_agree() {
        let dfa = ConcreteDfa::from_pairs(
            vec![vec![(0, 1), (1, 2)], vec![], vec![(1, 3)], vec![]],
            [1, 3],
            0,
        );
        assert_eq!(
            dfa.all_matching_strings().collect::<Vec<_>>(),
            vec![vec![0u8], vec![1, 1]]
        );
    }

    #[test_log::test]
    fn enumeration_of_very_long_strings() {
        // accepts exactly the words of length 50, enumerating them naively would take 256^50 steps
        let size: StateId = 50;
        let dfa = ConcreteDfa::new(
            (0..100)
                .map(|n| TransitionSpec::ranges([(0, 255, n + 1)]))
                .chain([TransitionSpec::none()])
                .collect::<Vec<_>>(),
            [size],
            0,
        );

        for (i, word) in dfa.all_matching_strings().take(1001).enumerate() {
            assert_eq!(word.len(), size as usize);
            let value = word
                .iter()
                .fold(0u128, |acc, byte| acc * 256 + u128::from(*byte));
            assert_eq!(value, i as u128);
        }
    }

    #[test]
    fn enumeration_of_dead_automaton_is_empty() {
        let dfa = ConcreteDfa::from_pairs(vec![vec![(0, 1)], vec![(0, 0)]], [], 0);
        assert_eq!(dfa.all_matching_strings().next(), None);
        assert!(ConcreteDfa::empty().all_matching_strings().next().is_none());
    }

    #[test]
    fn enumeration_of_infinite_language_is_shortlex() {
        // (ab)*
        let dfa = ConcreteDfa::from_pairs(vec![vec![(b'a', 1)], vec![(b'b', 0)]], [0], 0);
        let words: Vec<_> = dfa.all_matching_strings().take(4).collect();
        assert_eq!(
            words,
            vec![
                b"".to_vec(),
                b"ab".to_vec(),
                b"abab".to_vec(),
                b"ababab".to_vec()
            ]
        );
    }

    #[test]
    fn enumeration_restarts() {
        let dfa = ConcreteDfa::new(
            [
                TransitionSpec::ranges([(3, 5, 1)]),
                TransitionSpec::pairs([(7, 1)]),
            ],
            [1],
            0,
        );
        let first: Vec<_> = dfa.all_matching_strings().take(5).collect();
        assert_eq!(
            first,
            vec![vec![3], vec![4], vec![5], vec![3, 7], vec![4, 7]]
        );
        assert_eq!(dfa.all_matching_strings().take(5).collect::<Vec<_>>(), first);
    }

    #[test]
    fn enumerated_words_are_matched_and_counted() {
        let dfa = ConcreteDfa::new(
            [
                TransitionSpec::ranges([(0, 3, 1), (10, 11, 2)]),
                TransitionSpec::ranges([(0, 1, 2), (5, 5, 0)]),
                TransitionSpec::none(),
            ],
            [2],
            0,
        );
        let words: Vec<_> = dfa.all_matching_strings().take(50).collect();
        for word in &words {
            assert!(dfa.matches(word));
        }
        let short = words.iter().filter(|w| w.len() == 2).count();
        assert_eq!(dfa.count_strings(0, 2), math::Count::from(short as u32));
        for window in words.windows(2) {
            let (a, b) = (&window[0], &window[1]);
            assert!(a.len() < b.len() || (a.len() == b.len() && a < b));
        }
    }
}
