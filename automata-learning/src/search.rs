/// Finds a (hopefully large) `n` such that `f(n)` holds but `f(n + 1)` does not, assuming that
/// `f(0)` holds. The result is not necessarily the largest such `n`, but only `O(log n)` calls to
/// `f` are made.
///
/// Small values are checked one by one first, after that the search probes exponentially growing
/// values until `f` fails and then narrows the gap through binary search.
///
/// # Example
/// ```
/// use byte_dfa_learning::find_integer;
///
/// assert_eq!(find_integer(|n| n <= 1000), 1000);
/// assert_eq!(find_integer(|n| n == 0), 0);
/// ```
pub fn find_integer(mut f: impl FnMut(usize) -> bool) -> usize {
    for n in 1..5 {
        if !f(n) {
            return n - 1;
        }
    }

    // invariant: f(lo) holds and f(hi) does not, once the probing stops
    let mut lo = 4;
    let mut hi = 5;
    while f(hi) {
        lo = hi;
        hi *= 2;
    }
    while lo + 1 < hi {
        let mid = lo + (hi - lo) / 2;
        if f(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

#[cfg(test)]
mod tests {
    use super::find_integer;

    #[test]
    fn small_values_are_found_linearly() {
        for bound in 0..5 {
            let mut calls = 0;
            let found = find_integer(|n| {
                calls += 1;
                n <= bound
            });
            assert_eq!(found, bound);
            assert_eq!(calls, bound + 1);
        }
    }

    #[test]
    fn large_values_take_logarithmically_many_calls() {
        for bound in [5, 17, 1000, 123_456] {
            let mut calls = 0;
            let found = find_integer(|n| {
                calls += 1;
                n <= bound
            });
            assert_eq!(found, bound);
            assert!(calls < 4 + 2 * 20, "{calls} calls for {bound}");
        }
    }

    #[test]
    fn result_is_a_boundary() {
        // holds on 0..=3 and 8..=20, so both 3 and 20 are admissible
        let f = |n: usize| n <= 3 || (8..=20).contains(&n);
        let found = find_integer(f);
        assert!(f(found) && !f(found + 1));
    }
}
