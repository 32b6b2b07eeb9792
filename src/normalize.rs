use byte_dfa::{math::Map, prelude::*};
use byte_dfa_learning::LStar;
use tracing::{debug, info, trace};

use crate::{
    engine::{Engine, Status, TestResult},
    name_for, DivergenceProblem, NormalizeConfig, NormalizeError, Registry, RegistryStore,
};

/// Two different minimal results split into a shared prefix, the differing cores and a shared
/// suffix, such that `smaller = prefix + smaller_core + suffix` and likewise for `larger`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    /// Longest common prefix.
    pub prefix: Vec<u8>,
    /// What remains of the smaller result.
    pub smaller_core: Vec<u8>,
    /// What remains of the larger result.
    pub larger_core: Vec<u8>,
    /// Longest common suffix that does not overlap the prefix in either result.
    pub suffix: Vec<u8>,
}

impl Divergence {
    /// Strips the longest common prefix of `smaller` and `larger`, and then the longest common
    /// suffix of what remains.
    ///
    /// ```
    /// use dfa_normalize::Divergence;
    ///
    /// let divergence = Divergence::split(b"xaay", b"xbbby");
    /// assert_eq!(divergence.prefix, b"x");
    /// assert_eq!(divergence.smaller_core, b"aa");
    /// assert_eq!(divergence.larger_core, b"bbb");
    /// assert_eq!(divergence.suffix, b"y");
    /// ```
    pub fn split(smaller: &[u8], larger: &[u8]) -> Self {
        let prefix = smaller
            .iter()
            .zip(larger)
            .take_while(|(l, r)| l == r)
            .count();
        let (left, right) = (&smaller[prefix..], &larger[prefix..]);
        let suffix = left
            .iter()
            .rev()
            .zip(right.iter().rev())
            .take_while(|(l, r)| l == r)
            .count();
        Self {
            prefix: smaller[..prefix].to_vec(),
            smaller_core: left[..left.len() - suffix].to_vec(),
            larger_core: right[..right.len() - suffix].to_vec(),
            suffix: left[left.len() - suffix..].to_vec(),
        }
    }

    /// Places `core` between the shared prefix and suffix.
    pub fn embed(&self, core: &[u8]) -> Vec<u8> {
        [&self.prefix[..], core, &self.suffix[..]].concat()
    }
}

/// Summary of a successful normalisation session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Names of the automata learned in this session, in the order they were learned.
    pub learned: Vec<String>,
    /// Number of interesting test cases that were shrunk.
    pub examined: usize,
    /// Number of generated test cases that were not interesting.
    pub uninteresting: usize,
}

/// Where the session currently stands. Failing ends the session with an error instead.
#[derive(Debug)]
enum Phase<O> {
    /// Generating test cases until one is interesting.
    Seeking,
    /// Shrinking an interesting test case.
    Shrinking { attempt: TestResult<O>, origin: O },
    /// Comparing a shrunk result with the one recorded for its origin.
    Comparing {
        attempt: TestResult<O>,
        origin: O,
        shrunk: TestResult<O>,
    },
    /// Learning an automaton from two diverging minimal results.
    Learning {
        attempt: TestResult<O>,
        origin: O,
        shrunk: TestResult<O>,
        existing: TestResult<O>,
    },
    /// Enough consecutive test cases shrank to the recorded results.
    Done,
}

struct Session<'a, E: Engine, S> {
    base_name: &'a str,
    engine: &'a mut E,
    registry: &'a mut Registry<S>,
    config: &'a NormalizeConfig,
    seen: Map<E::Origin, TestResult<E::Origin>>,
    consecutive_successes: usize,
    found_interesting: bool,
    failures: usize,
    report: NormalizeReport,
}

/// Makes sure that every interesting test case of `engine` shrinks to the same result as all other
/// test cases with the same origin.
///
/// Test cases are generated and shrunk until [`NormalizeConfig::required_successes`] of them in a
/// row shrink to the result recorded for their origin. Whenever two minimal results differ, the
/// part in which they differ is isolated and an automaton is learned that accepts both variants,
/// judged by re-running the test function. Learned automata are added to `registry` under a name
/// derived from `base_name`, handed to the shrinker as additional passes, and written back to the
/// store of `registry` at the end of the session.
pub fn normalize<E, S>(
    base_name: &str,
    engine: &mut E,
    registry: &mut Registry<S>,
    config: &NormalizeConfig,
) -> Result<NormalizeReport, NormalizeError>
where
    E: Engine,
    S: RegistryStore,
{
    let mut session = Session {
        base_name,
        engine,
        registry,
        config,
        seen: Map::default(),
        consecutive_successes: 0,
        found_interesting: false,
        failures: 0,
        report: NormalizeReport::default(),
    };

    let mut phase = Phase::Seeking;
    loop {
        phase = match phase {
            Phase::Done => break,
            Phase::Seeking => session.seek()?,
            Phase::Shrinking { attempt, origin } => session.shrink(attempt, origin),
            Phase::Comparing {
                attempt,
                origin,
                shrunk,
            } => session.compare(attempt, origin, shrunk),
            Phase::Learning {
                attempt,
                origin,
                shrunk,
                existing,
            } => {
                session.learn(&origin, &shrunk, &existing)?;
                Phase::Shrinking { attempt, origin }
            }
        };
    }

    if !session.report.learned.is_empty() {
        session.registry.flush()?;
    }
    info!(
        "normalised after examining {} interesting test cases, learned {} automata",
        session.report.examined,
        session.report.learned.len()
    );
    Ok(session.report)
}

impl<E: Engine, S: RegistryStore> Session<'_, E, S> {
    fn seek(&mut self) -> Result<Phase<E::Origin>, NormalizeError> {
        if self.consecutive_successes >= self.config.required_successes {
            return Ok(Phase::Done);
        }
        let attempt = self.engine.generate();
        let origin = match (&attempt.status, &attempt.origin) {
            (Status::Interesting, Some(origin)) => origin.clone(),
            _ => {
                self.failures += 1;
                self.report.uninteresting += 1;
                if !self.found_interesting && self.failures > self.config.max_failed_attempts {
                    return Err(NormalizeError::NoInterestingCase {
                        attempts: self.failures,
                    });
                }
                return Ok(Phase::Seeking);
            }
        };
        self.found_interesting = true;
        self.report.examined += 1;
        trace!("found interesting test case {}", Bytes(&attempt.buffer));
        Ok(Phase::Shrinking { attempt, origin })
    }

    fn shrink(&mut self, attempt: TestResult<E::Origin>, origin: E::Origin) -> Phase<E::Origin> {
        let automata: Vec<&ConcreteDfa> = self.registry.automata().map(|(_, dfa)| dfa).collect();
        let shrunk = self.engine.shrink(attempt.clone(), &automata, &mut |result| {
            result.is_interesting_with(&origin)
        });
        debug!(
            "shrunk {} to {} for origin {origin:?}",
            Bytes(&attempt.buffer),
            Bytes(&shrunk.buffer)
        );
        Phase::Comparing {
            attempt,
            origin,
            shrunk,
        }
    }

    fn compare(
        &mut self,
        attempt: TestResult<E::Origin>,
        origin: E::Origin,
        shrunk: TestResult<E::Origin>,
    ) -> Phase<E::Origin> {
        let Some(existing) = self.seen.get(&origin) else {
            debug!("recording {} for origin {origin:?}", Bytes(&shrunk.buffer));
            self.seen.insert(origin, shrunk);
            return Phase::Seeking;
        };
        if existing.buffer == shrunk.buffer {
            self.consecutive_successes += 1;
            trace!("{} consecutive successes", self.consecutive_successes);
            return Phase::Seeking;
        }

        info!(
            "shrinking diverged for origin {origin:?}: {} and {}",
            Bytes(&existing.buffer),
            Bytes(&shrunk.buffer)
        );
        self.consecutive_successes = 0;
        Phase::Learning {
            existing: existing.clone(),
            attempt,
            origin,
            shrunk,
        }
    }

    fn learn(
        &mut self,
        origin: &E::Origin,
        shrunk: &TestResult<E::Origin>,
        existing: &TestResult<E::Origin>,
    ) -> Result<(), NormalizeError> {
        let (smaller, larger) = match self.engine.compare(&shrunk.buffer, &existing.buffer) {
            std::cmp::Ordering::Greater => (&existing.buffer, &shrunk.buffer),
            _ => (&shrunk.buffer, &existing.buffer),
        };
        let invalid = |reason| NormalizeError::InvalidDivergence {
            smaller: smaller.clone(),
            larger: larger.clone(),
            reason,
        };

        if !self.config.allowed_to_update {
            return Err(NormalizeError::NonNormalizingAndLearningDisallowed {
                smaller: smaller.clone(),
                larger: larger.clone(),
            });
        }
        if self.report.learned.len() >= self.config.max_dfas {
            return Err(NormalizeError::LearningBudgetExceeded {
                max: self.config.max_dfas,
            });
        }
        if larger.starts_with(smaller) {
            return Err(invalid(DivergenceProblem::Extension));
        }

        let divergence = Divergence::split(smaller, larger);
        debug!(
            "learning from cores {} and {} between {} and {}",
            Bytes(&divergence.smaller_core),
            Bytes(&divergence.larger_core),
            Bytes(&divergence.prefix),
            Bytes(&divergence.suffix)
        );
        let allow_discards = shrunk.has_discards || existing.has_discards;
        let engine = &mut *self.engine;
        let mut is_valid_core = |core: &[u8]| {
            let buffer = divergence.embed(core);
            let result = engine.run(&buffer);
            result.is_interesting_with(origin)
                && result.buffer == buffer
                && (allow_discards || !result.has_discards)
        };
        for core in [&divergence.smaller_core, &divergence.larger_core] {
            if !is_valid_core(core.as_slice()) {
                return Err(invalid(DivergenceProblem::RejectedCore(core.clone())));
            }
        }

        let mut learner = LStar::new(is_valid_core);
        learner.learn_until_stable(
            &[
                divergence.smaller_core.clone(),
                divergence.larger_core.clone(),
            ],
            self.config.self_check_sample,
        );
        let dfa = learner.dfa().canonicalise();
        debug!(
            "learned automaton with {} states from {} queries",
            dfa.size(),
            learner.queries()
        );
        drop(learner);

        let name = name_for(self.base_name, &dfa);
        if !self.registry.insert(name.clone(), dfa) {
            return Err(NormalizeError::RegistryNameCollision(name));
        }
        self.report.learned.push(name);

        if let Some(best) = self.engine.best_interesting(origin) {
            self.seen.insert(origin.clone(), best);
        }
        Ok(())
    }
}
