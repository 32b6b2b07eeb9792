use byte_dfa::{Bytes, ParseError};
use thiserror::Error;

/// The ways in which normalisation can fail. Each of them ends the session.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Not a single interesting test case was generated.
    #[error("test function seems to have no interesting test cases, tried {attempts} times")]
    NoInterestingCase {
        /// Number of consecutive non-interesting attempts.
        attempts: usize,
    },
    /// Shrinking produced two different minimal results, and learning was disabled.
    #[error(
        "shrinker failed to normalise {} to {} and learning new automata is not allowed",
        Bytes(.larger),
        Bytes(.smaller)
    )]
    NonNormalizingAndLearningDisallowed {
        /// The preferred of the two minimal results.
        smaller: Vec<u8>,
        /// The other minimal result.
        larger: Vec<u8>,
    },
    /// More automata would be needed than allowed.
    #[error("test function is too hard to learn, added {max} automata and still not done")]
    LearningBudgetExceeded {
        /// The configured maximum.
        max: usize,
    },
    /// The two minimal results do not diverge in a way that can be learned.
    #[error("cannot learn from {} and {}: {reason}", Bytes(.smaller), Bytes(.larger))]
    InvalidDivergence {
        /// The preferred of the two minimal results.
        smaller: Vec<u8>,
        /// The other minimal result.
        larger: Vec<u8>,
        /// What is wrong with them.
        reason: DivergenceProblem,
    },
    /// A freshly learned automaton has the name of an existing one.
    #[error("an automaton named {0} is already registered")]
    RegistryNameCollision(String),
    /// The registry could not be read or written.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Reasons why two minimal results are no valid divergence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DivergenceProblem {
    /// The larger result merely extends the smaller one.
    #[error("the larger result extends the smaller one")]
    Extension,
    /// The differing part of a result is not accepted when placed between the shared prefix and
    /// suffix.
    #[error("core {} is not interesting in context", Bytes(.0))]
    RejectedCore(Vec<u8>),
}

/// Failures of the backing store of the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The store could not be accessed.
    #[error("could not access registry store")]
    Io(#[from] std::io::Error),
    /// A line after the marker is not of the form `name -> automaton`.
    #[error("line {line} of the registry is not of the form `name -> automaton`")]
    MalformedLine {
        /// One based line number.
        line: usize,
    },
    /// The automaton of an entry does not parse.
    #[error("automaton {name} on line {line} is malformed")]
    MalformedAutomaton {
        /// One based line number.
        line: usize,
        /// Name of the entry.
        name: String,
        /// The underlying parse error.
        #[source]
        source: ParseError,
    },
}
