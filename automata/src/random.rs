use tracing::trace;

use crate::{ConcreteDfa, Entry, StateId, TransitionSpec};

/// Probability with which a byte (or a range of bytes) receives a transition at all.
const EDGE_PROBABILITY: f64 = 0.6;
/// Probability with which a state is made accepting.
const ACCEPTING_PROBABILITY: f64 = 0.3;

/// Generates a random [`ConcreteDfa`] with between one and `max_states` states, whose transitions
/// only use the bytes `0..symbols`. Restricting the alphabet keeps the languages dense enough to be
/// interesting when exploring them. The algorithm is as follows:
/// 1. Draw the number of states and, for each state, one of the three forms of [`TransitionSpec`].
/// 2. For single entries and maps, every byte gets a transition to a uniformly drawn target with
///    probability [`EDGE_PROBABILITY`].
/// 3. For ranges, the alphabet is cut into consecutive runs of up to four bytes and every run gets
///    a transition with the same probability.
/// 4. Every state is accepting with probability [`ACCEPTING_PROBABILITY`], and at least one state
///    is always accepting.
///
/// Note that the start state is drawn as well, so there may be unreachable states.
pub fn random_dfa(rng: &mut fastrand::Rng, max_states: usize, symbols: u8) -> ConcreteDfa {
    assert!(max_states > 0, "an automaton needs at least one state");
    assert!(symbols > 0, "an alphabet needs at least one byte");

    let size = rng.usize(1..=max_states);
    let bound = size as StateId;
    let mut transitions = Vec::with_capacity(size);

    for _ in 0..size {
        let spec = match rng.u8(..3) {
            0 => TransitionSpec::pairs(
                (0..symbols)
                    .filter_map(|byte| {
                        (rng.f64() < EDGE_PROBABILITY).then(|| (byte, rng.u32(..bound)))
                    })
                    .collect::<Vec<_>>(),
            ),
            1 => {
                let mut entries = vec![];
                let mut lo = 0u8;
                while lo < symbols {
                    let hi = lo.saturating_add(rng.u8(..4)).min(symbols - 1);
                    if rng.f64() < EDGE_PROBABILITY {
                        entries.push(Entry::range(lo, hi, rng.u32(..bound)));
                    }
                    match hi.checked_add(1) {
                        Some(next) => lo = next,
                        None => break,
                    }
                }
                TransitionSpec::Entries(entries)
            }
            _ => TransitionSpec::map(
                (0..symbols)
                    .filter_map(|byte| {
                        (rng.f64() < EDGE_PROBABILITY).then(|| (byte, rng.u32(..bound)))
                    })
                    .collect::<Vec<_>>(),
            ),
        };
        transitions.push(spec);
    }

    let mut accepting: Vec<StateId> = (0..bound)
        .filter(|_| rng.f64() < ACCEPTING_PROBABILITY)
        .collect();
    if accepting.is_empty() {
        accepting.push(rng.u32(..bound));
    }
    let start = rng.u32(..bound);

    trace!("generated random automaton with {size} states over {symbols} bytes");
    ConcreteDfa::new(transitions, accepting, start)
}

/// Generates a random word over the bytes `0..symbols` whose length is drawn uniformly from
/// `0..=max_length`.
pub fn random_word(rng: &mut fastrand::Rng, symbols: u8, max_length: usize) -> Vec<u8> {
    let length = rng.usize(..=max_length);
    (0..length).map(|_| rng.u8(..symbols)).collect()
}

#[cfg(test)]
mod tests {
    use num_traits::Zero;

    use super::{random_dfa, random_word};
    use crate::prelude::*;

    const ROUNDS: u64 = 200;

    fn automata() -> impl Iterator<Item = ConcreteDfa> {
        (0..ROUNDS).map(|seed| random_dfa(&mut fastrand::Rng::with_seed(seed), 8, 4))
    }

    #[test]
    fn matching_agrees_with_enumeration() {
        for dfa in automata() {
            for word in dfa.all_matching_strings().take(30) {
                assert!(dfa.matches(&word), "{dfa} does not match enumerated {word:?}");
            }
        }
    }

    #[test]
    fn counting_agrees_with_matching() {
        let mut rng = fastrand::Rng::with_seed(7);
        for dfa in automata() {
            // all words of length two over the four bytes in use
            let matched = (0..4u8)
                .flat_map(|a| (0..4u8).map(move |b| [a, b]))
                .filter(|word| dfa.matches(word))
                .count();
            assert_eq!(
                dfa.count_strings(dfa.start(), 2),
                math::Count::from(matched as u32)
            );
            let word = random_word(&mut rng, 4, 6);
            if dfa.is_dead(dfa.start()) {
                assert!(!dfa.matches(&word));
            }
        }
    }

    #[test]
    fn finite_max_length_is_tight() {
        for dfa in automata() {
            let start = dfa.start();
            if dfa.is_dead(start) {
                continue;
            }
            if let MaxLength::Finite(max) = dfa.max_length(start) {
                assert!(!dfa.count_strings(start, max).is_zero(), "{dfa}");
                for longer in max + 1..max + 4 {
                    assert!(dfa.count_strings(start, longer).is_zero(), "{dfa}");
                }
            }
        }
    }

    #[test]
    fn canonical_forms_are_equivalent_and_stable() {
        for dfa in automata() {
            let canon = dfa.canonicalise();
            assert!(canon.equivalent(&dfa), "{dfa} and {canon}");
            assert_eq!(canon.canonicalise().to_string(), canon.to_string());
            assert!(canon.size() <= dfa.size());
        }
    }

    #[test]
    fn canonical_encodings_decide_equivalence() {
        let all: Vec<_> = automata()
            .take(60)
            .map(|dfa| {
                let encoded = dfa.canonicalise().to_string();
                (dfa, encoded)
            })
            .collect();
        for (left, left_encoded) in &all {
            for (right, right_encoded) in &all {
                assert_eq!(
                    left.equivalent(right),
                    left_encoded == right_encoded,
                    "{left} vs {right}"
                );
            }
        }
    }

    #[test]
    fn a_word_matched_by_only_one_side_separates() {
        let all: Vec<_> = automata().take(60).collect();
        for (left, right) in all.iter().zip(all.iter().skip(1)) {
            if let Some(word) = left.all_matching_strings().next() {
                if !right.matches(&word) {
                    assert!(!left.equivalent(right));
                }
            }
        }
    }

    #[test]
    fn encoding_round_trips() {
        for dfa in automata() {
            let encoded = dfa.to_string();
            let parsed: ConcreteDfa = encoded.parse().unwrap();
            assert_eq!(parsed, dfa);
            assert_eq!(parsed.to_string(), encoded);
        }
    }
}
