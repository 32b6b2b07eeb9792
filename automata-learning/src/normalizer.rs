use tracing::debug;

use crate::find_integer;

/// Groups bytes into classes of consecutive values that a learner treats as interchangeable. Every
/// class is represented by its smallest member, the canonical byte. Initially all bytes form a
/// single class represented by `0`, and classes are split as soon as some test shows that a byte
/// behaves differently from its representative.
///
/// Tracking classes instead of individual bytes keeps the number of membership queries proportional
/// to the number of bytes that actually behave differently, rather than to all 256 of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteNormalizer {
    /// Sorted in ascending order, always starts with `0`.
    canonical: Vec<u8>,
}

impl Default for ByteNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteNormalizer {
    /// Creates a normalizer with a single class containing every byte.
    pub fn new() -> Self {
        Self { canonical: vec![0] }
    }

    /// The canonical bytes in ascending order, one for each class.
    pub fn canonical_bytes(&self) -> &[u8] {
        &self.canonical
    }

    /// Returns the canonical byte of the class that `byte` belongs to.
    pub fn normalize(&self, byte: u8) -> u8 {
        let position = self.canonical.partition_point(|c| *c <= byte);
        self.canonical[position - 1]
    }

    /// Replaces every byte of `word` by its canonical byte.
    pub fn normalize_word(&self, word: &[u8]) -> Vec<u8> {
        word.iter().map(|b| self.normalize(*b)).collect()
    }

    /// Checks whether `byte` can be told apart from its canonical byte through `test`. If so, the
    /// class of `byte` is split such that `byte` ends up in a class whose canonical byte agrees
    /// with it on `test`, and `true` is returned.
    ///
    /// The split point is found with [`find_integer`], so `test` is only called logarithmically
    /// often in the distance between `byte` and its canonical byte.
    pub fn distinguish(&mut self, byte: u8, mut test: impl FnMut(u8) -> bool) -> bool {
        let canonical = self.normalize(byte);
        if canonical == byte {
            return false;
        }
        let value = test(byte);
        if test(canonical) == value {
            return false;
        }

        let distance = usize::from(byte - canonical);
        let shift = find_integer(|k| k < distance && test(byte - k as u8) == value);
        let split = byte - shift as u8;
        let position = self.canonical.partition_point(|c| *c < split);
        self.canonical.insert(position, split);
        debug!(
            "split byte class of {canonical} at {split}, now {} classes",
            self.canonical.len()
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::ByteNormalizer;

    #[test]
    fn everything_starts_in_one_class() {
        let normalizer = ByteNormalizer::new();
        assert_eq!(normalizer.canonical_bytes(), &[0]);
        assert_eq!(normalizer.normalize(200), 0);
        assert_eq!(normalizer.normalize_word(b"abc"), vec![0, 0, 0]);
    }

    #[test_log::test]
    fn splits_at_the_boundary() {
        let mut normalizer = ByteNormalizer::new();
        let mut calls = 0;
        let split = normalizer.distinguish(200, |b| {
            calls += 1;
            b >= 100
        });
        assert!(split);
        assert_eq!(normalizer.canonical_bytes(), &[0, 100]);
        assert_eq!(normalizer.normalize(99), 0);
        assert_eq!(normalizer.normalize(100), 100);
        assert_eq!(normalizer.normalize(255), 100);
        assert!(calls < 30, "{calls}");
    }

    #[test]
    fn indistinguishable_bytes_stay_together() {
        let mut normalizer = ByteNormalizer::new();
        assert!(!normalizer.distinguish(0, |_| unreachable!()));
        assert!(!normalizer.distinguish(50, |b| b % 2 == 0));
        assert_eq!(normalizer.canonical_bytes(), &[0]);
    }

    #[test]
    fn classes_are_refined_repeatedly() {
        let mut normalizer = ByteNormalizer::new();
        let class = |b: u8| b / 64;
        for byte in (0..=u8::MAX).rev() {
            normalizer.distinguish(byte, |x| class(x) == class(byte));
        }
        assert_eq!(normalizer.canonical_bytes(), &[0, 64, 128, 192]);
        for byte in 0..=u8::MAX {
            assert_eq!(class(normalizer.normalize(byte)), class(byte));
        }
    }
}
