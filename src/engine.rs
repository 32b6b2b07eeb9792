use std::{cmp::Ordering, fmt::Debug, hash::Hash};

use byte_dfa::ConcreteDfa;

/// How a single execution of the test function ended. Variants are ordered by how far the
/// execution got, so everything below [`Status::Interesting`] is a non-failing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// The buffer did not contain enough data.
    Overrun,
    /// The test function rejected the data, for example through a failed assumption.
    Invalid,
    /// The test function ran to completion without failing.
    Valid,
    /// The test function failed.
    Interesting,
}

/// The outcome of running the test function on a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult<O> {
    /// How the execution ended.
    pub status: Status,
    /// Groups interesting results that are believed to share the same defect. Only set for
    /// [`Status::Interesting`].
    pub origin: Option<O>,
    /// The part of the input that the test function actually consumed.
    pub buffer: Vec<u8>,
    /// Whether some of the consumed data was discarded during generation.
    pub has_discards: bool,
}

impl<O: PartialEq> TestResult<O> {
    /// Returns `true` if the result is interesting with the given origin.
    pub fn is_interesting_with(&self, origin: &O) -> bool {
        self.status == Status::Interesting && self.origin.as_ref() == Some(origin)
    }
}

/// The test execution and shrinking machinery that normalisation drives. Implementations run a
/// fixed test function and are expected to cache results by buffer, since the same buffers are
/// requested over and over.
pub trait Engine {
    /// Key grouping interesting results by the defect that caused them.
    type Origin: Clone + Eq + Hash + Debug;

    /// Runs the test function on freshly generated data.
    fn generate(&mut self) -> TestResult<Self::Origin>;

    /// Runs the test function on exactly `buffer`.
    fn run(&mut self, buffer: &[u8]) -> TestResult<Self::Origin>;

    /// Reduces `result` to a local minimum among the results satisfying `predicate`. The learned
    /// `automata` are available as additional shrink passes: a substring matched by one of them
    /// may be replaced by a smaller string it also matches.
    fn shrink(
        &mut self,
        result: TestResult<Self::Origin>,
        automata: &[&ConcreteDfa],
        predicate: &mut dyn FnMut(&TestResult<Self::Origin>) -> bool,
    ) -> TestResult<Self::Origin>;

    /// The smallest result found so far that is interesting with `origin`.
    fn best_interesting(&self, origin: &Self::Origin) -> Option<TestResult<Self::Origin>>;

    /// Total order over buffers, smaller buffers are preferred. Defaults to shortlex order.
    fn compare(&self, left: &[u8], right: &[u8]) -> Ordering {
        shortlex(left, right)
    }
}

/// Compares by length first and lexicographically among buffers of equal length.
pub fn shortlex(left: &[u8], right: &[u8]) -> Ordering {
    left.len().cmp(&right.len()).then_with(|| left.cmp(right))
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::{shortlex, Status, TestResult};

    #[test]
    fn shortlex_prefers_shorter_buffers() {
        assert_eq!(shortlex(b"zz", b"aaa"), Ordering::Less);
        assert_eq!(shortlex(b"ab", b"ac"), Ordering::Less);
        assert_eq!(shortlex(b"ab", b"ab"), Ordering::Equal);
    }

    #[test]
    fn statuses_are_ordered() {
        assert!(Status::Overrun < Status::Invalid);
        assert!(Status::Valid < Status::Interesting);
        let result = TestResult {
            status: Status::Interesting,
            origin: Some(3),
            buffer: vec![],
            has_discards: false,
        };
        assert!(result.is_interesting_with(&3));
        assert!(!result.is_interesting_with(&4));
    }
}
