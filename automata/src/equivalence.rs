use std::collections::VecDeque;

use tracing::trace;

use crate::{automaton::Bytes, math::Set, Automaton, StateId, DEAD};

/// Searches the product of `left` and `right` for a reachable pair of states of which exactly one
/// is accepting. Both automata are finite, so the search terminates. The product is explored
/// breadth first in ascending byte order, which makes the returned word the shortlex least word
/// in the symmetric difference of both languages.
pub(crate) fn distinguishing_word<L, R>(left: &L, right: &R) -> Option<Vec<u8>>
where
    L: Automaton + ?Sized,
    R: Automaton + ?Sized,
{
    // every discovered pair together with the pair it was reached from and the byte that was read
    let mut discovered: Vec<((StateId, StateId), usize, u8)> = vec![];
    let mut seen: Set<(StateId, StateId)> = Set::default();
    let mut queue = VecDeque::new();

    let origin = (left.start(), right.start());
    discovered.push((origin, usize::MAX, 0));
    seen.insert(origin);
    queue.push_back(0);

    while let Some(position) = queue.pop_front() {
        let ((p, q), _, _) = discovered[position];
        if left.is_accepting(p) != right.is_accepting(q) {
            let mut word = vec![];
            let mut current = position;
            while current != 0 {
                let (_, parent, byte) = discovered[current];
                word.push(byte);
                current = parent;
            }
            word.reverse();
            trace!("found distinguishing word {:?}", Bytes(&word));
            return Some(word);
        }
        if p == DEAD && q == DEAD {
            continue;
        }
        for byte in 0..=u8::MAX {
            let pair = (left.transition(p, byte), right.transition(q, byte));
            if seen.insert(pair) {
                queue.push_back(discovered.len());
                discovered.push((pair, position, byte));
            }
        }
    }

    None
}
