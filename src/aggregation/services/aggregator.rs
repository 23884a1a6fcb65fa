//! Merges every source file into one snapshot.

use crate::aggregation::domain::{AggregatedSnapshot, DataSource, SourceRecords, SourceRegistry};
use crate::clock::display_now;
use cap_std::fs_utf8::{Dir, OpenOptions};
use mockable::Clock;
use serde_json::Value;
use std::io::ErrorKind;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// File name of the snapshot inside the output directory.
pub const SNAPSHOT_FILE: &str = "aggregated.json";

/// Failures raised while aggregating. Only [`AggregationError::Serialize`]
/// and [`AggregationError::Write`] abort a pass; a source that cannot be
/// read or created counts as empty.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// A source file exists but could not be read.
    #[error("failed to read source file {file}: {source}")]
    Read {
        /// File name relative to the data directory.
        file: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A missing source file could not be created.
    #[error("failed to create source file {file}: {source}")]
    Create {
        /// File name relative to the data directory.
        file: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be serialized.
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The snapshot could not be written.
    #[error("failed to write {SNAPSHOT_FILE}: {0}")]
    Write(#[source] std::io::Error),
}

/// Result type for aggregation passes.
pub type AggregationResult<T> = Result<T, AggregationError>;

/// Reads every registered source and publishes the merged snapshot.
#[derive(Debug)]
pub struct Aggregator<C>
where
    C: Clock,
{
    registry: SourceRegistry,
    data_dir: Dir,
    output_dir: Dir,
    clock: Arc<C>,
}

impl<C> Aggregator<C>
where
    C: Clock,
{
    /// Creates an aggregator reading from `data_dir` and writing the
    /// snapshot into `output_dir`.
    #[must_use]
    pub const fn new(
        registry: SourceRegistry,
        data_dir: Dir,
        output_dir: Dir,
        clock: Arc<C>,
    ) -> Self {
        Self {
            registry,
            data_dir,
            output_dir,
            clock,
        }
    }

    /// Returns the registered sources.
    #[must_use]
    pub const fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Creates every missing source file empty.
    ///
    /// Returns the number of files created.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Create`] when a file cannot be created.
    pub fn ensure_sources(&self) -> AggregationResult<usize> {
        let mut created = 0_usize;
        for source in &self.registry {
            if self.data_dir.exists(source.file_name()) {
                continue;
            }
            self.create_empty(source)?;
            created = created.saturating_add(1);
        }
        Ok(created)
    }

    /// Runs one full pass and replaces the snapshot file.
    ///
    /// Malformed lines are dropped with a warning. A missing source counts
    /// as empty and is created. A source that cannot be read counts as empty
    /// for this pass.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot cannot be serialized or written.
    pub fn aggregate(&self) -> AggregationResult<AggregatedSnapshot> {
        info!(target: "warden::aggregator", "starting aggregation");
        let mut sources = Vec::with_capacity(self.registry.len());
        for source in &self.registry {
            let records = self.read_source(source).unwrap_or_else(|err| {
                warn!(target: "warden::aggregator", source = %source.name(), error = %err, "source unreadable; counting it as empty");
                Vec::new()
            });
            sources.push(SourceRecords {
                name: source.name().clone(),
                records,
            });
        }

        let snapshot = AggregatedSnapshot::new(sources, display_now(&*self.clock));
        self.write_snapshot(&snapshot)?;
        info!(target: "warden::aggregator", stats = %snapshot.stats(), "aggregation complete");
        Ok(snapshot)
    }

    /// Reads and parses one source file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read, or is
    /// missing and cannot be created.
    pub fn read_source(&self, source: &DataSource) -> AggregationResult<Vec<Value>> {
        match self.data_dir.read(source.file_name()) {
            Ok(contents) => Ok(parse_records(source, &contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(target: "warden::aggregator", source = %source.name(), file = source.file_name(), "source file missing; creating empty file");
                self.create_empty(source)?;
                Ok(Vec::new())
            }
            Err(err) => Err(AggregationError::Read {
                file: source.file_name().to_owned(),
                source: err,
            }),
        }
    }

    fn create_empty(&self, source: &DataSource) -> AggregationResult<()> {
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        self.data_dir
            .open_with(source.file_name(), &options)
            .map(drop)
            .map_err(|err| AggregationError::Create {
                file: source.file_name().to_owned(),
                source: err,
            })
    }

    fn write_snapshot(&self, snapshot: &AggregatedSnapshot) -> AggregationResult<()> {
        let body = serde_json::to_vec_pretty(snapshot)?;
        self.output_dir
            .write(SNAPSHOT_FILE, body)
            .map_err(AggregationError::Write)?;
        debug!(target: "warden::aggregator", file = SNAPSHOT_FILE, "snapshot written");
        Ok(())
    }
}

/// Splits raw file contents into non-blank lines and parses each one as an
/// independent JSON value. Yields the 1-based line number with the result.
///
/// Lines are handled as bytes, so invalid UTF-8 only spoils its own line.
pub(super) fn json_lines(
    contents: &[u8],
) -> impl Iterator<Item = (usize, serde_json::Result<Value>)> + '_ {
    contents
        .split(|byte| *byte == b'\n')
        .enumerate()
        .map(|(index, line)| (index.saturating_add(1), line.trim_ascii()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(number, line)| (number, serde_json::from_slice(line)))
}

/// Parses each non-blank line, dropping the ones that fail.
fn parse_records(source: &DataSource, contents: &[u8]) -> Vec<Value> {
    json_lines(contents)
        .filter_map(|(number, parsed)| match parsed {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    target: "warden::aggregator",
                    source = %source.name(),
                    line = number,
                    error = %err,
                    "dropping malformed record"
                );
                None
            }
        })
        .collect()
}
