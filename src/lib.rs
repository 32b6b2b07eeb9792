//! Learning shrink passes that make a test case minimiser converge.
//!
//! A minimiser (or shrinker) reduces a failing test case to a locally minimal one. Different
//! starting points often end in different local minima for what is really the same defect. This
//! crate drives an [`Engine`] that generates and shrinks test cases, notices when two minimal
//! results with the same origin differ and learns a [`byte_dfa::ConcreteDfa`] describing the part
//! in which they differ. The learned automata are handed back to the shrinker, which may then
//! replace any substring matched by an automaton with a smaller string that it also matches. Once
//! enough test cases in a row shrink to the recorded result, the session ends and the learned
//! automata are written to a [`Registry`].
//!
//! The entry point is [`normalize`], tuned through [`NormalizeConfig`].
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod engine;
pub use engine::{shortlex, Engine, Status, TestResult};

mod error;
pub use error::{DivergenceProblem, NormalizeError, RegistryError};

mod config;
pub use config::NormalizeConfig;

mod registry;
pub use registry::{name_for, FileStore, MemoryStore, Registry, RegistryStore, MARKER};

mod normalize;
pub use normalize::{normalize, Divergence, NormalizeReport};
