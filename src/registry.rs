use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use byte_dfa::{Automaton, ConcreteDfa};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::RegistryError;

/// Separates the preamble of a registry store from the generated entries. Everything up to and
/// including this line is preserved when the registry is flushed.
pub const MARKER: &str = "# AUTOGENERATED BEGINS";

const SEPARATOR: &str = " -> ";

/// Number of hex characters of the content hash that go into a name.
const HASH_LENGTH: usize = 10;

/// The textual storage behind a [`Registry`].
pub trait RegistryStore {
    /// Reads the current contents. A store that was never written is empty.
    fn read(&self) -> Result<String, RegistryError>;

    /// Replaces the contents.
    fn write(&mut self, contents: &str) -> Result<(), RegistryError>;
}

/// Keeps the registry in a file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Uses the file at `path`, which does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for FileStore {
    fn read(&self) -> Result<String, RegistryError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, contents: &str) -> Result<(), RegistryError> {
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

/// Keeps the registry in memory and counts how often it was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    contents: String,
    writes: usize,
}

impl MemoryStore {
    /// Creates a store with the given initial contents.
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            writes: 0,
        }
    }

    /// The current contents.
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// How often the contents were written.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl RegistryStore for MemoryStore {
    fn read(&self) -> Result<String, RegistryError> {
        Ok(self.contents.clone())
    }

    fn write(&mut self, contents: &str) -> Result<(), RegistryError> {
        self.contents = contents.to_string();
        self.writes += 1;
        Ok(())
    }
}

/// Derives the name of a learned automaton from its canonical form: `base` followed by a dash and
/// the first ten hex characters of the SHA-256 hash of the canonical encoding. Automata with the
/// same language therefore always get the same name.
///
/// ```
/// use byte_dfa::prelude::*;
/// use dfa_normalize::name_for;
///
/// let dfa = ConcreteDfa::from_pairs(vec![vec![(0, 1)], vec![]], [1], 0);
/// let name = name_for("example", &dfa);
/// assert!(name.starts_with("example-"));
/// assert_eq!(name.len(), "example-".len() + 10);
/// ```
pub fn name_for(base: &str, dfa: &ConcreteDfa) -> String {
    let hash = hex::encode(Sha256::digest(dfa.canonicalise().to_string().as_bytes()));
    format!("{base}-{}", &hash[..HASH_LENGTH])
}

/// The learned automata, by name. The registry is opened from a [`RegistryStore`] at the start of a
/// session and written back through [`Registry::flush`].
///
/// In the store, the entries follow the [`MARKER`] line, one `name -> automaton` per line and
/// sorted by name. Everything before the marker is left untouched.
#[derive(Debug)]
pub struct Registry<S> {
    store: S,
    entries: BTreeMap<String, ConcreteDfa>,
}

impl<S: RegistryStore> Registry<S> {
    /// Reads all entries from `store`.
    pub fn open(store: S) -> Result<Self, RegistryError> {
        let contents = store.read()?;
        let mut entries = BTreeMap::new();
        let generated = contents
            .lines()
            .enumerate()
            .skip_while(|(_, line)| *line != MARKER)
            .skip(1)
            .filter(|(_, line)| !line.trim().is_empty());
        for (index, line) in generated {
            let line_number = index + 1;
            let (name, encoded) = line
                .split_once(SEPARATOR)
                .ok_or(RegistryError::MalformedLine { line: line_number })?;
            let name = name.trim().to_string();
            let dfa = encoded
                .parse()
                .map_err(|source| RegistryError::MalformedAutomaton {
                    line: line_number,
                    name: name.clone(),
                    source,
                })?;
            entries.insert(name, dfa);
        }
        debug!("opened registry with {} automata", entries.len());
        Ok(Self { store, entries })
    }

    /// Returns `true` if an automaton with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// The automaton registered under `name`.
    pub fn get(&self, name: &str) -> Option<&ConcreteDfa> {
        self.entries.get(name)
    }

    /// Registers `dfa` under `name`. Returns `false` and leaves the registry unchanged if the name
    /// is taken.
    pub fn insert(&mut self, name: String, dfa: ConcreteDfa) -> bool {
        if self.entries.contains_key(&name) {
            return false;
        }
        info!("registering automaton {name}");
        self.entries.insert(name, dfa);
        true
    }

    /// Iterates over all entries, ordered by name.
    pub fn automata(&self) -> impl Iterator<Item = (&str, &ConcreteDfa)> + '_ {
        self.entries.iter().map(|(name, dfa)| (name.as_str(), dfa))
    }

    /// The number of registered automata.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no automaton is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Gives back the backing store.
    pub fn into_store(self) -> S {
        self.store
    }

    fn render(&self, current: &str) -> String {
        let mut lines: Vec<&str> = current.lines().take_while(|line| *line != MARKER).collect();
        lines.push(MARKER);
        let mut rendered = lines.join("\n");
        rendered.push('\n');
        for (name, dfa) in &self.entries {
            rendered.push_str(&format!("{name}{SEPARATOR}{dfa}\n"));
        }
        rendered
    }

    /// Writes all entries back to the store, keeping its preamble. Nothing is written if the
    /// contents would not change. Returns whether a write happened.
    pub fn flush(&mut self) -> Result<bool, RegistryError> {
        let current = self.store.read()?;
        let rendered = self.render(&current);
        if rendered == current {
            debug!("registry is up to date");
            return Ok(false);
        }
        self.store.write(&rendered)?;
        info!("wrote {} automata to registry", self.entries.len());
        Ok(true)
    }
}
