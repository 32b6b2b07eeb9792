/// Tuning parameters of [`crate::normalize`].
///
/// ```
/// use dfa_normalize::NormalizeConfig;
///
/// let config = NormalizeConfig::default()
///     .with_required_successes(10)
///     .with_allowed_to_update(true);
/// assert_eq!(config.max_dfas, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeConfig {
    /// How many interesting test cases in a row must shrink to the recorded result before
    /// normalisation is considered successful.
    pub required_successes: usize,
    /// Whether new automata may be learned when shrinking diverges. Without it, every divergence
    /// is an error, which is useful for checking that a test function still normalises.
    pub allowed_to_update: bool,
    /// The maximal number of automata that may be learned in one session.
    pub max_dfas: usize,
    /// How many non-interesting test cases in a row are tolerated before any interesting test case
    /// was seen.
    pub max_failed_attempts: usize,
    /// How many of the shortest words accepted by a hypothesis are checked in every pass of the
    /// learner.
    pub self_check_sample: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            required_successes: 100,
            allowed_to_update: false,
            max_dfas: 10,
            max_failed_attempts: 1000,
            self_check_sample: 10,
        }
    }
}

impl NormalizeConfig {
    /// Sets [`NormalizeConfig::required_successes`].
    pub fn with_required_successes(mut self, required_successes: usize) -> Self {
        self.required_successes = required_successes;
        self
    }

    /// Sets [`NormalizeConfig::allowed_to_update`].
    pub fn with_allowed_to_update(mut self, allowed_to_update: bool) -> Self {
        self.allowed_to_update = allowed_to_update;
        self
    }

    /// Sets [`NormalizeConfig::max_dfas`].
    pub fn with_max_dfas(mut self, max_dfas: usize) -> Self {
        self.max_dfas = max_dfas;
        self
    }

    /// Sets [`NormalizeConfig::max_failed_attempts`].
    pub fn with_max_failed_attempts(mut self, max_failed_attempts: usize) -> Self {
        self.max_failed_attempts = max_failed_attempts;
        self
    }

    /// Sets [`NormalizeConfig::self_check_sample`].
    pub fn with_self_check_sample(mut self, self_check_sample: usize) -> Self {
        self.self_check_sample = self_check_sample;
        self
    }
}
