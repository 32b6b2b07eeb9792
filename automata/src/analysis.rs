use std::cell::{OnceCell, RefCell};

use bit_set::BitSet;
use num_traits::{One, Zero};
use tracing::trace;

use crate::{math::Count, Automaton, ConcreteDfa, MaxLength, StateId, DEAD};

/// Progress marker of the depth first search computing [`ConcreteDfa::max_length`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done(MaxLength),
}

/// Caches for everything that is derived from the transition structure of a [`ConcreteDfa`]. The
/// caches live as long as the automaton and are never shared between instances.
pub(crate) struct Analysis {
    /// For each state the distinct non-dead targets together with the number of bytes leading
    /// there.
    successors: OnceCell<Vec<Vec<(StateId, u32)>>>,
    /// The states from which no accepting state is reachable.
    dead: OnceCell<BitSet>,
    max_length: RefCell<Vec<Visit>>,
    /// `counts[n][q]` is the number of words of length `n` accepted from `q`.
    counts: RefCell<Vec<Vec<Count>>>,
}

impl Analysis {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            successors: OnceCell::new(),
            dead: OnceCell::new(),
            max_length: RefCell::new(vec![Visit::Unvisited; size]),
            counts: RefCell::new(vec![]),
        }
    }
}

impl ConcreteDfa {
    fn successors(&self) -> &[Vec<(StateId, u32)>] {
        self.analysis.successors.get_or_init(|| {
            (0..self.size() as StateId)
                .map(|q| {
                    let mut grouped: Vec<(StateId, u32)> = vec![];
                    for (_, target) in self.raw_transitions(q) {
                        match grouped.iter_mut().find(|(t, _)| *t == target) {
                            Some((_, multiplicity)) => *multiplicity += 1,
                            None => grouped.push((target, 1)),
                        }
                    }
                    grouped
                })
                .collect()
        })
    }

    fn dead_states(&self) -> &BitSet {
        self.analysis.dead.get_or_init(|| {
            let mut predecessors = vec![vec![]; self.size()];
            for (source, targets) in self.successors().iter().enumerate() {
                for (target, _) in targets {
                    predecessors[*target as usize].push(source);
                }
            }

            let mut live = BitSet::with_capacity(self.size());
            let mut queue: Vec<usize> = self.accepting_states().map(|q| q as usize).collect();
            for q in &queue {
                live.insert(*q);
            }
            while let Some(q) = queue.pop() {
                for &p in &predecessors[q] {
                    if live.insert(p) {
                        queue.push(p);
                    }
                }
            }

            let dead: BitSet = (0..self.size()).filter(|q| !live.contains(*q)).collect();
            trace!("computed {} dead states out of {}", dead.len(), self.size());
            dead
        })
    }

    fn live_successors(&self, state: StateId) -> impl Iterator<Item = StateId> + '_ {
        self.successors()[state as usize]
            .iter()
            .map(|(target, _)| *target)
            .filter(|target| !self.is_dead(*target))
    }

    /// Returns `true` if and only if no accepting state can be reached from `state`. This is
    /// always the case for [`DEAD`].
    pub fn is_dead(&self, state: StateId) -> bool {
        state == DEAD || self.dead_states().contains(state as usize)
    }

    /// Computes the length of the longest word that is accepted when starting in `state`. This is
    /// [`MaxLength::Infinite`] if a cycle can be traversed on the way to an accepting state. For a
    /// dead state, the length is zero.
    ///
    /// # Example
    /// ```
    /// use byte_dfa::prelude::*;
    ///
    /// let dfa = ConcreteDfa::from_pairs(vec![vec![(0, 1)], vec![(1, 2)], vec![]], [0, 2], 0);
    /// assert_eq!(dfa.max_length(0), MaxLength::Finite(2));
    /// let looping = ConcreteDfa::from_pairs(vec![vec![(0, 0)]], [0], 0);
    /// assert_eq!(looping.max_length(0), MaxLength::Infinite);
    /// ```
    pub fn max_length(&self, state: StateId) -> MaxLength {
        if self.is_dead(state) {
            return MaxLength::Finite(0);
        }
        let mut visits = self.analysis.max_length.borrow_mut();
        if let Visit::Done(length) = visits[state as usize] {
            return length;
        }

        struct Frame {
            state: StateId,
            children: Vec<StateId>,
            next: usize,
            best: MaxLength,
        }
        let frame = |state| Frame {
            state,
            children: self.live_successors(state).collect(),
            next: 0,
            best: MaxLength::Finite(0),
        };

        visits[state as usize] = Visit::InProgress;
        let mut stack = vec![frame(state)];
        let mut result = MaxLength::Finite(0);

        while let Some(top) = stack.last_mut() {
            if top.next < top.children.len() {
                let child = top.children[top.next];
                top.next += 1;
                match visits[child as usize] {
                    Visit::Done(length) => top.best = top.best.max(length.successor()),
                    // the child is on the stack, so we have found a cycle through live states
                    Visit::InProgress => top.best = MaxLength::Infinite,
                    Visit::Unvisited => {
                        visits[child as usize] = Visit::InProgress;
                        stack.push(frame(child));
                    }
                }
                continue;
            }

            let finished = stack.pop().map(|f| (f.state, f.best));
            if let Some((q, best)) = finished {
                visits[q as usize] = Visit::Done(best);
                match stack.last_mut() {
                    Some(parent) => parent.best = parent.best.max(best.successor()),
                    None => result = best,
                }
            }
        }

        result
    }

    /// Counts the words of length exactly `length` that are accepted when starting in `state`.
    ///
    /// Counts are computed layer by layer, where layer `n + 1` is obtained from layer `n` by
    /// summing over the transitions of each state. Layers are kept, so repeated queries of the
    /// same or shorter lengths come for free.
    ///
    /// # Example
    /// ```
    /// use byte_dfa::prelude::*;
    ///
    /// let any_byte = ConcreteDfa::new([TransitionSpec::ranges([(0, 255, 0)])], [0], 0);
    /// assert_eq!(any_byte.count_strings(0, 2), math::Count::from(65536u32));
    /// ```
    pub fn count_strings(&self, state: StateId, length: usize) -> Count {
        if state == DEAD {
            return Count::zero();
        }
        let mut layers = self.analysis.counts.borrow_mut();
        if layers.is_empty() {
            layers.push(
                (0..self.size() as StateId)
                    .map(|q| {
                        if self.is_accepting(q) {
                            Count::one()
                        } else {
                            Count::zero()
                        }
                    })
                    .collect(),
            );
        }

        while layers.len() <= length {
            trace!("computing word counts for length {}", layers.len());
            let previous = &layers[layers.len() - 1];
            let next = self
                .successors()
                .iter()
                .map(|targets| {
                    targets
                        .iter()
                        .fold(Count::zero(), |acc, (target, multiplicity)| {
                            acc + previous[*target as usize].clone() * *multiplicity
                        })
                })
                .collect();
            layers.push(next);
        }

        layers[length][state as usize].clone()
    }
}
