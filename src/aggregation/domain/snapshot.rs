//! The consolidated snapshot written by one aggregation pass.

use super::SourceName;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::fmt;

/// Parsed records of one source, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecords {
    /// Source the records were read from.
    pub name: SourceName,
    /// One JSON value per well-formed line.
    pub records: Vec<Value>,
}

/// Per-source record counts plus their sum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotStats {
    counts: Vec<(SourceName, usize)>,
    total: usize,
}

impl SnapshotStats {
    /// Returns the count for `name`.
    #[must_use]
    pub fn count(&self, name: &SourceName) -> Option<usize> {
        self.counts
            .iter()
            .find(|(source, _)| source == name)
            .map(|(_, count)| *count)
    }

    /// Returns the per-source counts in snapshot order.
    #[must_use]
    pub fn counts(&self) -> &[(SourceName, usize)] {
        &self.counts
    }

    /// Returns the sum of every per-source count.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }
}

impl fmt::Display for SnapshotStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, count) in &self.counts {
            write!(f, "{name}={count} ")?;
        }
        write!(f, "total={}", self.total)
    }
}

impl Serialize for SnapshotStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len().saturating_add(1)))?;
        for (name, count) in &self.counts {
            map.serialize_entry(name.as_str(), count)?;
        }
        map.serialize_entry("total", &self.total)?;
        map.end()
    }
}

/// Every source's records, the pass timestamp, and the derived counts.
///
/// Serializes as one flat object: each source key in registry order, then
/// `timestamp`, then `stats`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedSnapshot {
    sources: Vec<SourceRecords>,
    timestamp: String,
}

impl AggregatedSnapshot {
    /// Creates a snapshot from per-source records.
    #[must_use]
    pub const fn new(sources: Vec<SourceRecords>, timestamp: String) -> Self {
        Self { sources, timestamp }
    }

    /// Returns the per-source records in registry order.
    #[must_use]
    pub fn sources(&self) -> &[SourceRecords] {
        &self.sources
    }

    /// Returns the records for `name`.
    #[must_use]
    pub fn records(&self, name: &SourceName) -> Option<&[Value]> {
        self.sources
            .iter()
            .find(|source| &source.name == name)
            .map(|source| source.records.as_slice())
    }

    /// Returns the display timestamp of the pass.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Computes per-source counts and the total.
    #[must_use]
    pub fn stats(&self) -> SnapshotStats {
        let counts: Vec<(SourceName, usize)> = self
            .sources
            .iter()
            .map(|source| (source.name.clone(), source.records.len()))
            .collect();
        let total = counts.iter().map(|(_, count)| count).sum();
        SnapshotStats { counts, total }
    }
}

impl Serialize for AggregatedSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sources.len().saturating_add(2)))?;
        for source in &self.sources {
            map.serialize_entry(source.name.as_str(), &source.records)?;
        }
        map.serialize_entry("timestamp", &self.timestamp)?;
        map.serialize_entry("stats", &self.stats())?;
        map.end()
    }
}
