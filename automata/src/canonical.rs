use std::collections::VecDeque;

use bit_set::BitSet;
use tracing::{debug, trace};

use crate::{
    math::{Bijection, Map},
    Automaton, ConcreteDfa, Entry, StateId, TransitionSpec, DEAD,
};

/// Marks a transition into a state that does not take part in the exploration.
const NONE: usize = usize::MAX;

/// The part of an automaton that is reachable from its start state, with local indices assigned
/// in order of discovery.
struct Explored {
    accepting: Vec<bool>,
    edges: Vec<Box<[usize; 256]>>,
}

impl Explored {
    fn new<A: Automaton + ?Sized>(automaton: &A) -> Self {
        let mut index: Map<StateId, usize> = Map::default();
        let mut states = vec![automaton.start()];
        index.insert(automaton.start(), 0);

        let mut edges = vec![];
        let mut position = 0;
        while position < states.len() {
            let q = states[position];
            let mut out = Box::new([NONE; 256]);
            for byte in 0..=u8::MAX {
                let target = automaton.transition(q, byte);
                if target == DEAD {
                    continue;
                }
                let next = *index.entry(target).or_insert_with(|| {
                    states.push(target);
                    states.len() - 1
                });
                out[byte as usize] = next;
            }
            edges.push(out);
            position += 1;
        }

        Self {
            accepting: states.iter().map(|q| automaton.is_accepting(*q)).collect(),
            edges,
        }
    }

    fn size(&self) -> usize {
        self.edges.len()
    }

    fn live(&self) -> BitSet {
        let mut predecessors = vec![vec![]; self.size()];
        for (source, out) in self.edges.iter().enumerate() {
            for &target in out.iter().filter(|t| **t != NONE) {
                predecessors[target].push(source);
            }
        }
        let mut live = BitSet::with_capacity(self.size());
        let mut queue: Vec<usize> = (0..self.size()).filter(|q| self.accepting[*q]).collect();
        for &q in &queue {
            live.insert(q);
        }
        while let Some(q) = queue.pop() {
            for &p in &predecessors[q] {
                if live.insert(p) {
                    queue.push(p);
                }
            }
        }
        live
    }
}

/// Refines the partition of the live states into accepting and rejecting ones until no two states
/// in the same class can be told apart by a single transition. Returns the class of every state,
/// where states that are not live get [`NONE`].
fn refine(explored: &Explored, live: &BitSet) -> Vec<usize> {
    let class_of = |classes: &[usize], target: usize| {
        if target == NONE || !live.contains(target) {
            NONE
        } else {
            classes[target]
        }
    };

    let mut classes: Vec<usize> = (0..explored.size())
        .map(|q| {
            if !live.contains(q) {
                NONE
            } else {
                explored.accepting[q] as usize
            }
        })
        .collect();
    let mut count = usize::MAX;

    for round in 0.. {
        let mut signatures: Map<Vec<usize>, usize> = Map::default();
        let refined: Vec<usize> = (0..explored.size())
            .map(|q| {
                if classes[q] == NONE {
                    return NONE;
                }
                let signature: Vec<usize> = std::iter::once(classes[q])
                    .chain(explored.edges[q].iter().map(|t| class_of(&classes, *t)))
                    .collect();
                let next = signatures.len();
                *signatures.entry(signature).or_insert(next)
            })
            .collect();
        trace!("refinement round {round} yields {} classes", signatures.len());
        classes = refined;
        if signatures.len() == count {
            break;
        }
        count = signatures.len();
    }

    classes
}

pub(crate) fn canonicalise<A: Automaton + ?Sized>(automaton: &A) -> ConcreteDfa {
    let explored = Explored::new(automaton);
    let live = explored.live();
    if !live.contains(0) {
        debug!("canonical form of an automaton with empty language");
        return ConcreteDfa::empty();
    }

    let classes = refine(&explored, &live);
    // any member of a class serves as its representative
    let mut representative: Map<usize, usize> = Map::default();
    for (q, class) in classes.iter().enumerate() {
        if *class != NONE {
            representative.entry(*class).or_insert(q);
        }
    }

    // number the classes in the order in which they are first reached
    let mut numbering: Bijection<usize, StateId> = Bijection::new();
    let mut queue = VecDeque::from([classes[0]]);
    numbering.insert(classes[0], 0);
    while let Some(class) = queue.pop_front() {
        let q = representative[&class];
        for &target in explored.edges[q].iter() {
            if target == NONE || classes[target] == NONE {
                continue;
            }
            if !numbering.contains_left(&classes[target]) {
                numbering.insert(classes[target], numbering.len() as StateId);
                queue.push_back(classes[target]);
            }
        }
    }

    let mut transitions = Vec::with_capacity(numbering.len());
    let mut accepting = vec![];
    for id in 0..numbering.len() as StateId {
        let class = *numbering
            .get_by_right(&id)
            .expect("canonical numbering is contiguous");
        let q = representative[&class];
        if explored.accepting[q] {
            accepting.push(id);
        }

        let mut entries: Vec<Entry> = vec![];
        for (byte, &target) in explored.edges[q].iter().enumerate() {
            if target == NONE || classes[target] == NONE {
                continue;
            }
            let byte = byte as u8;
            let target = *numbering
                .get_by_left(&classes[target])
                .expect("every live class has been numbered");
            match entries.last_mut() {
                Some(last) if last.target == target && last.hi as u16 + 1 == byte as u16 => {
                    last.hi = byte;
                }
                _ => entries.push(Entry::single(byte, target)),
            }
        }
        transitions.push(TransitionSpec::Entries(entries));
    }

    debug!(
        "canonical form has {} states, reduced from {} reachable ones",
        numbering.len(),
        explored.size()
    );
    ConcreteDfa::new(transitions, accepting, 0)
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test_log::test]
    fn merges_equivalent_states() {
        // states 1 and 2 both accept exactly the empty word, 3 is dead
        let dfa = ConcreteDfa::from_pairs(
            vec![vec![(0, 1), (1, 2), (2, 3)], vec![], vec![(7, 3)], vec![(0, 3)]],
            [1, 2],
            0,
        );
        let canon = dfa.canonicalise();
        assert_eq!(canon.size(), 2);
        assert_eq!(canon.to_string(), "ConcreteDfa([[(0, 1, 1)], []], {1})");
        assert!(canon.equivalent(&dfa));
    }

    #[test]
    fn canonical_form_ignores_state_names() {
        let left = ConcreteDfa::from_pairs(vec![vec![(b'a', 1)], vec![(b'b', 0)]], [0], 0);
        let right = ConcreteDfa::from_pairs(
            vec![vec![(b'b', 2)], vec![(b'a', 0)], vec![(b'a', 0)], vec![(b'z', 3)]],
            [2],
            2,
        );
        assert_eq!(
            left.canonicalise().to_string(),
            right.canonicalise().to_string()
        );
    }

    #[test]
    fn canonicalisation_is_idempotent() {
        let dfa = ConcreteDfa::new(
            [
                TransitionSpec::ranges([(0, 100, 1), (101, 255, 2)]),
                TransitionSpec::map([(0, 0), (1, 2)]),
                TransitionSpec::ranges([(5, 9, 1)]),
            ],
            [1],
            0,
        );
        let once = dfa.canonicalise();
        let twice = once.canonicalise();
        assert_eq!(once.to_string(), twice.to_string());
        assert!(dfa.equivalent(&once));
    }

    #[test]
    fn empty_language_has_trivial_canonical_form() {
        let dfa = ConcreteDfa::from_pairs(vec![vec![(0, 1)], vec![(1, 0)], vec![]], [2], 0);
        let canon = dfa.canonicalise();
        assert_eq!(canon, ConcreteDfa::empty());
        assert!(canon.equivalent(&dfa));
    }
}
