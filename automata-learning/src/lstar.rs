use std::fmt::Debug;

use byte_dfa::{math::Map, prelude::*};
use itertools::Itertools;
use tracing::{debug, info, trace};

use crate::{find_integer, ByteNormalizer, CachedOracle, MembershipOracle};

/// A state of the hypothesis. It is identified by its row, the answers of the oracle for its label
/// concatenated with each experiment.
#[derive(Debug, Clone)]
struct HypothesisState {
    label: Vec<u8>,
    row: Vec<bool>,
    /// Successors for canonical bytes, filled in lazily.
    transitions: Map<u8, StateId>,
}

/// An implementation of L* for languages over bytes, with Rivest-Schapire style processing of
/// counterexamples.
///
/// The learner keeps a list of experiments, which are suffixes used to distinguish words. The
/// first experiment is always the empty word, so it captures acceptance. Every state of the
/// hypothesis is discovered through a label, its shortest known access word, and two labels
/// lead to the same state if and only if the oracle gives the same answers for them under all
/// experiments. Bytes are grouped into classes by a [`ByteNormalizer`], so transitions only need
/// to be explored for one representative of each class.
///
/// Examples are fed to the learner through [`LStar::learn`]. After each call, the hypothesis is
/// consistent with every example seen so far and can be obtained through [`LStar::dfa`] without
/// asking the oracle anything. Whenever the hypothesis changes, [`LStar::generation`] increases.
pub struct LStar<O> {
    oracle: CachedOracle<O>,
    normalizer: ByteNormalizer,
    experiments: Vec<Vec<u8>>,
    states: Vec<HypothesisState>,
    by_row: Map<Vec<bool>, StateId>,
    generation: usize,
}

impl<O: MembershipOracle> LStar<O> {
    /// Creates a new learner for the language described by `oracle`. The initial hypothesis
    /// treats all bytes alike.
    pub fn new(oracle: O) -> Self {
        let mut oracle = CachedOracle::new(oracle);
        let accepting = oracle.is_member(&[]);
        let start = HypothesisState {
            label: vec![],
            row: vec![accepting],
            transitions: Map::default(),
        };
        let mut learner = Self {
            oracle,
            normalizer: ByteNormalizer::new(),
            experiments: vec![vec![]],
            by_row: Map::from_iter([(start.row.clone(), 0)]),
            states: vec![start],
            generation: 0,
        };
        learner.close();
        learner
    }

    /// Counts how often the hypothesis has changed. This increases every time a call to
    /// [`LStar::learn`] leads to a new experiment or a refinement of the byte classes.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// The shortest known word leading to `state` of the hypothesis.
    pub fn label(&self, state: StateId) -> &[u8] {
        &self.states[state as usize].label
    }

    /// The number of distinct words the oracle was asked about.
    pub fn queries(&self) -> usize {
        self.oracle.queries()
    }

    /// The experiments used to tell states apart, starting with the empty word.
    pub fn experiments(&self) -> &[Vec<u8>] {
        &self.experiments
    }

    /// The byte classes the hypothesis currently distinguishes.
    pub fn normalizer(&self) -> &ByteNormalizer {
        &self.normalizer
    }

    /// Gives back the wrapped oracle.
    pub fn into_oracle(self) -> O {
        self.oracle.into_inner()
    }

    fn member(&mut self, word: &[u8]) -> bool {
        self.oracle.is_member(word)
    }

    fn row(&mut self, label: &[u8]) -> Vec<bool> {
        let experiments = std::mem::take(&mut self.experiments);
        let row = experiments
            .iter()
            .map(|e| self.member(&[label, &e[..]].concat()))
            .collect();
        self.experiments = experiments;
        row
    }

    /// Returns the successor of `state` under the canonical byte `byte`, discovering a new state
    /// if no known state has the same row.
    fn successor(&mut self, state: StateId, byte: u8) -> StateId {
        if let Some(target) = self.states[state as usize].transitions.get(&byte) {
            return *target;
        }
        let mut label = self.states[state as usize].label.clone();
        label.push(byte);
        let row = self.row(&label);
        let target = match self.by_row.get(&row) {
            Some(target) => *target,
            None => {
                let target = self.states.len() as StateId;
                trace!("discovered state {target} with label {}", Bytes(&label));
                self.by_row.insert(row.clone(), target);
                self.states.push(HypothesisState {
                    label,
                    row,
                    transitions: Map::default(),
                });
                target
            }
        };
        self.states[state as usize].transitions.insert(byte, target);
        target
    }

    /// Computes the successor of every state under every canonical byte, so that the hypothesis
    /// can be built without consulting the oracle.
    fn close(&mut self) {
        let mut state = 0;
        while state < self.states.len() {
            let canonical = self.normalizer.canonical_bytes().to_vec();
            for byte in canonical {
                self.successor(state as StateId, byte);
            }
            state += 1;
        }
    }

    /// Forgets all transitions after the experiments or byte classes have changed. Known states are
    /// kept, their rows are extended by the answers for new experiments.
    fn changed(&mut self) {
        self.generation += 1;
        for state in 0..self.states.len() {
            let known = self.states[state].row.len();
            let label = self.states[state].label.clone();
            let missing: Vec<Vec<u8>> = self.experiments[known..].to_vec();
            for experiment in missing {
                let answer = self.member(&[&label[..], &experiment[..]].concat());
                self.states[state].row.push(answer);
            }
            self.states[state].transitions.clear();
        }
        self.by_row = self
            .states
            .iter()
            .enumerate()
            .map(|(q, state)| (state.row.clone(), q as StateId))
            .collect();
        debug!(
            "hypothesis changed to generation {} with {} states and {} experiments",
            self.generation,
            self.states.len(),
            self.experiments.len()
        );
    }

    /// Runs `word` through the hypothesis and returns the visited states, starting with the
    /// initial state. Successors are discovered as needed.
    fn run(&mut self, word: &[u8]) -> Vec<StateId> {
        let mut states = Vec::with_capacity(word.len() + 1);
        states.push(0);
        let mut state = 0;
        for &byte in word {
            state = self.successor(state, self.normalizer.normalize(byte));
            states.push(state);
        }
        states
    }

    /// Updates the hypothesis such that it classifies `word` in the same way as the oracle.
    ///
    /// If the bytes of `word` cannot be replaced by their canonical bytes without changing the
    /// answer of the oracle, the byte classes are refined first. Afterwards, as long as the
    /// hypothesis disagrees with the oracle on `word`, a position is located at which replacing
    /// the read prefix by the label of the reached state changes the answer of the oracle. The
    /// remaining suffix distinguishes two words that the hypothesis confuses, so it is added as
    /// an experiment.
    pub fn learn(&mut self, word: &[u8]) {
        let expected = self.member(word);
        let mut word = word.to_vec();

        loop {
            let normalized = self.normalizer.normalize_word(&word);
            if self.member(&normalized) == expected {
                word = normalized;
                break;
            }

            let Self {
                oracle, normalizer, ..
            } = self;
            let mut target = word.clone();
            let mut refined = false;
            for a in word.iter().copied().sorted_unstable_by(|l, r| r.cmp(l)).dedup() {
                let replace = |word: &[u8], x: u8| -> Vec<u8> {
                    word.iter().map(|c| if *c == a { x } else { *c }).collect()
                };
                refined |= normalizer.distinguish(a, |x| oracle.is_member(&replace(&target, x)));
                target = replace(&target, normalizer.normalize(a));
            }
            debug_assert!(refined, "a byte class must split if normalising changes the answer");
            if !refined {
                break;
            }
            self.changed();
        }

        loop {
            let states = self.run(&word);
            let reached = states[word.len()];
            if self.states[reached as usize].row[0] == expected {
                break;
            }
            trace!("hypothesis misclassifies {}", Bytes(&word));

            let n = find_integer(|n| {
                n <= word.len() && {
                    let label = &self.states[states[n] as usize].label;
                    let swapped = [&label[..], &word[n..]].concat();
                    self.oracle.is_member(&swapped) == expected
                }
            });
            debug_assert!(n < word.len());

            // `word` is normalised, so the byte classes cannot be the cause
            let experiment = word[n + 1..].to_vec();
            trace!("adding experiment {}", Bytes(&experiment));
            self.experiments.push(experiment);
            self.changed();
        }

        self.close();
    }

    /// Feeds `seeds` to the learner, followed by up to `sample` of the shortest words the current
    /// hypothesis accepts, until a full pass leaves the generation unchanged. The self-check with
    /// accepted words catches hypotheses that accept more than they should.
    pub fn learn_until_stable(&mut self, seeds: &[Vec<u8>], sample: usize) {
        let mut pass = 0;
        loop {
            pass += 1;
            let before = self.generation;
            for seed in seeds {
                self.learn(seed);
            }
            let own: Vec<Vec<u8>> = self.dfa().all_matching_strings().take(sample).collect();
            for word in &own {
                self.learn(word);
            }
            if self.generation == before {
                info!(
                    "learner stable after {pass} passes with {} states and {} queries",
                    self.states.len(),
                    self.queries()
                );
                return;
            }
        }
    }

    /// Materialises the current hypothesis. States are numbered as in [`LStar::label`], the
    /// initial state is `0`. The oracle is not consulted.
    pub fn dfa(&self) -> ConcreteDfa {
        let start = std::time::Instant::now();
        let transitions: Vec<TransitionSpec> = self
            .states
            .iter()
            .map(|state| {
                let mut entries: Vec<Entry> = vec![];
                for byte in 0..=u8::MAX {
                    let Some(&target) = state.transitions.get(&self.normalizer.normalize(byte))
                    else {
                        continue;
                    };
                    match entries.last_mut() {
                        Some(last)
                            if last.target == target && u16::from(last.hi) + 1 == u16::from(byte) =>
                        {
                            last.hi = byte;
                        }
                        _ => entries.push(Entry::single(byte, target)),
                    }
                }
                TransitionSpec::Entries(entries)
            })
            .collect();
        let accepting = self
            .states
            .iter()
            .enumerate()
            .filter(|(_, state)| state.row[0])
            .map(|(q, _)| q as StateId);

        let dfa = ConcreteDfa::new(transitions, accepting, 0);
        debug!(
            "building hypothesis took {} microseconds",
            start.elapsed().as_micros()
        );
        dfa
    }
}

impl<O> Debug for LStar<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut builder = tabled::builder::Builder::default();
        let mut header = vec!["label".to_string()];
        for e in &self.experiments {
            header.push(Bytes(e).to_string());
        }
        builder.push_record(header);

        for state in &self.states {
            let mut row = vec![Bytes(&state.label).to_string()];
            row.extend(
                state
                    .row
                    .iter()
                    .map(|answer| if *answer { "+" } else { "-" }.to_string()),
            );
            builder.push_record(row);
        }

        write!(f, "{}", builder.build())
    }
}

#[cfg(test)]
mod tests {
    use byte_dfa::prelude::*;

    use super::LStar;
    use crate::AutomatonOracle;

    fn alternating() -> ConcreteDfa {
        // (ab)*
        ConcreteDfa::from_pairs(vec![vec![(b'a', 1)], vec![(b'b', 0)]], [0], 0)
    }

    #[test_log::test]
    fn learns_alternating_words() {
        let target = alternating();
        let mut learner = LStar::new(AutomatonOracle(&target));
        learner.learn(b"abab");
        let hypothesis = learner.dfa();
        assert!(hypothesis.matches(b"abab"));
        assert!(hypothesis.matches(b""));

        learner.learn_until_stable(&[b"abab".to_vec(), b"aba".to_vec()], 10);
        let hypothesis = learner.dfa();
        assert!(hypothesis.equivalent(&target), "{hypothesis}\n{learner:?}");
        assert_eq!(hypothesis.canonicalise(), target.canonicalise());
    }

    #[test]
    fn initial_hypothesis_treats_all_bytes_alike() {
        let learner = LStar::new(|word: &[u8]| word.len() == 1);
        let dfa = learner.dfa();
        assert_eq!(learner.generation(), 0);
        assert_eq!(learner.normalizer().canonical_bytes(), &[0]);
        assert!(!dfa.matches(b""));
        assert!(dfa.matches(b"x"));
        assert!(!dfa.matches(b"xy"));
        // the empty experiment alone cannot tell the empty word from words of length two
        assert!(dfa.matches(b"xyz"));
        assert_eq!(learner.label(0), b"");
    }

    #[test]
    fn counterexamples_with_alike_bytes_add_experiments() {
        let mut learner = LStar::new(|word: &[u8]| word.len() == 1);
        learner.learn(b"xyz");
        // every change came from a new experiment, the byte classes stayed as they were
        assert_eq!(learner.normalizer().canonical_bytes(), &[0]);
        assert!(learner.generation() > 0);
        assert_eq!(learner.generation(), learner.experiments().len() - 1);
        let dfa = learner.dfa();
        assert!(!dfa.matches(b"xyz"));
        assert!(dfa.matches(b"x"));
    }

    #[test_log::test]
    fn learned_words_are_classified_correctly() {
        let oracle = |word: &[u8]| word.len() == 2 && word[0] >= 10;
        let mut learner = LStar::new(oracle);
        let examples: [&[u8]; 5] = [&[10, 0], &[9, 0], &[200, 3], &[10, 0, 10, 0], &[3]];
        for example in examples {
            learner.learn(example);
            assert_eq!(learner.dfa().matches(example), oracle(example));
        }
        let seeds: Vec<Vec<u8>> = examples.iter().map(|e| e.to_vec()).collect();
        learner.learn_until_stable(&seeds, 10);
        let dfa = learner.dfa();
        for example in examples {
            assert_eq!(dfa.matches(example), oracle(example), "{learner:?}");
        }
        assert!(learner.generation() > 0);
        assert!(learner.normalizer().canonical_bytes().contains(&10));
    }

    #[test]
    fn generation_is_stable_for_known_words() {
        let target = alternating();
        let mut learner = LStar::new(AutomatonOracle(&target));
        learner.learn(b"ab");
        let generation = learner.generation();
        learner.learn(b"ab");
        learner.learn(b"");
        assert_eq!(learner.generation(), generation);
    }

    #[test]
    fn building_the_hypothesis_asks_nothing() {
        let target = alternating();
        let mut learner = LStar::new(AutomatonOracle(&target));
        learner.learn(b"abab");
        let queries = learner.queries();
        let dfa = learner.dfa();
        let _ = dfa.all_matching_strings().take(5).count();
        assert_eq!(learner.queries(), queries);
    }

    #[test]
    fn labels_are_classified_like_their_states() {
        let target = alternating();
        let mut learner = LStar::new(AutomatonOracle(&target));
        learner.learn_until_stable(&[b"abab".to_vec()], 10);
        let dfa = learner.dfa();
        for state in 0..dfa.size() as StateId {
            assert_eq!(dfa.is_accepting(state), target.matches(learner.label(state)));
        }
        assert_eq!(learner.experiments()[0], Vec::<u8>::new());
    }

    #[test]
    fn table_is_printed() {
        let target = alternating();
        let mut learner = LStar::new(AutomatonOracle(&target));
        learner.learn(b"abab");
        let table = format!("{learner:?}");
        assert!(table.contains("label"));
        assert!(table.contains("b\"a\""));
    }
}
