//! Named data sources backed by append-only JSON-lines files.

use super::AggregationDomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Snapshot keys a source must not shadow.
const RESERVED_NAMES: [&str; 3] = ["timestamp", "stats", "total"];

/// Default sources as `(snapshot key, file name)` pairs, in snapshot order.
const DEFAULT_SOURCES: [(&str, &str); 7] = [
    ("knowledgeGraph", "knowledge-graph.jsonl"),
    ("memory", "memory.jsonl"),
    ("sequential", "sequential.jsonl"),
    ("context7", "context7.jsonl"),
    ("prismaVuexy", "prisma-vuexy.jsonl"),
    ("postgresVuexy", "postgres-vuexy.jsonl"),
    ("postgresFlowise", "postgres-flowise.jsonl"),
];

/// Key under which a source appears in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceName(String);

impl SourceName {
    /// Creates a validated source name.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is empty, contains anything other
    /// than ASCII letters and digits, or is a reserved snapshot key.
    pub fn new(value: impl Into<String>) -> Result<Self, AggregationDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AggregationDomainError::EmptySourceName);
        }
        if !trimmed.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(AggregationDomainError::InvalidSourceName(trimmed.to_owned()));
        }
        if RESERVED_NAMES.contains(&trimmed) {
            return Err(AggregationDomainError::ReservedSourceName(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SourceName {
    type Error = AggregationDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SourceName> for String {
    fn from(value: SourceName) -> Self {
        value.0
    }
}

/// One source: its snapshot key and the file it is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    name: SourceName,
    file_name: String,
}

impl DataSource {
    /// Creates a source reading `file_name` from the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the name is invalid or the file name is empty
    /// or not a plain file name.
    pub fn new(
        name: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Result<Self, AggregationDomainError> {
        let source_name = SourceName::new(name)?;
        let raw_file = file_name.into();
        let file = raw_file.trim();
        if file.is_empty() {
            return Err(AggregationDomainError::EmptyFileName);
        }
        if file.contains(['/', '\\']) || file == "." || file == ".." {
            return Err(AggregationDomainError::InvalidFileName(file.to_owned()));
        }
        Ok(Self {
            name: source_name,
            file_name: file.to_owned(),
        })
    }

    /// Returns the snapshot key.
    #[must_use]
    pub const fn name(&self) -> &SourceName {
        &self.name
    }

    /// Returns the file name relative to the data directory.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Ordered, static list of data sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistry {
    sources: Vec<DataSource>,
}

impl SourceRegistry {
    /// Creates a registry, keeping the given order.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationDomainError::DuplicateSource`] when two sources
    /// share a name or a file.
    pub fn new(sources: Vec<DataSource>) -> Result<Self, AggregationDomainError> {
        let mut names = BTreeSet::new();
        let mut files = BTreeSet::new();
        for source in &sources {
            if !names.insert(source.name().as_str()) {
                return Err(AggregationDomainError::DuplicateSource(
                    source.name().to_string(),
                ));
            }
            if !files.insert(source.file_name()) {
                return Err(AggregationDomainError::DuplicateSource(
                    source.file_name().to_owned(),
                ));
            }
        }
        Ok(Self { sources })
    }

    /// Returns the built-in sources: one per capability provider plus the
    /// directly queried databases.
    #[must_use]
    pub fn defaults() -> Self {
        let sources = DEFAULT_SOURCES
            .iter()
            .map(|(name, file)| DataSource {
                name: SourceName((*name).to_owned()),
                file_name: (*file).to_owned(),
            })
            .collect();
        Self { sources }
    }

    /// Iterates the sources in snapshot order.
    pub fn iter(&self) -> std::slice::Iter<'_, DataSource> {
        self.sources.iter()
    }

    /// Looks up a source by name.
    #[must_use]
    pub fn get(&self, name: &SourceName) -> Option<&DataSource> {
        self.sources.iter().find(|source| source.name() == name)
    }

    /// Returns the number of sources.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns whether the registry has no sources.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl<'a> IntoIterator for &'a SourceRegistry {
    type Item = &'a DataSource;
    type IntoIter = std::slice::Iter<'a, DataSource>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Notification that a source file's modification time moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceChanged {
    /// Source whose file changed.
    pub source: SourceName,
}
