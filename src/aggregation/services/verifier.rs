//! Read-only structural check of the source files and the snapshot.

use super::SNAPSHOT_FILE;
use super::aggregator::json_lines;
use crate::aggregation::domain::{DataSource, SourceRegistry};
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde_json::Value;
use std::fmt;
use std::io::ErrorKind;
use thiserror::Error;

/// Failures that prevent the verifier from running at all.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// The base directory could not be opened.
    #[error("failed to open base directory {path}: {source}")]
    OpenBase {
        /// Path that failed to open.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A data or output directory exists but could not be opened.
    #[error("failed to open directory {path}: {source}")]
    OpenDirectory {
        /// Path that failed to open.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of one verification run: an overall verdict and one line per
/// check, in check order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationReport {
    /// Whether every check passed.
    pub passed: bool,
    /// Rendered check lines.
    pub lines: Vec<String>,
}

impl fmt::Display for IntegrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Integration Check ===")?;
        writeln!(f)?;
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        writeln!(f)?;
        writeln!(f, "=== Result ===")?;
        if self.passed {
            write!(f, "✅ All checks passed!")
        } else {
            write!(f, "❌ Some issues found")
        }
    }
}

/// Checks that every source exists and holds at least one well-formed
/// record, and that the snapshot
/// counters are present and non-zero.
#[derive(Debug)]
pub struct IntegrationVerifier {
    registry: SourceRegistry,
    base_dir: Dir,
    data_dir: Option<Dir>,
    output_dir: Option<Dir>,
}

impl IntegrationVerifier {
    /// Creates a verifier over already opened directories. A `None` data or
    /// output directory makes every file beneath it count as missing.
    #[must_use]
    pub const fn new(
        registry: SourceRegistry,
        base_dir: Dir,
        data_dir: Option<Dir>,
        output_dir: Option<Dir>,
    ) -> Self {
        Self {
            registry,
            base_dir,
            data_dir,
            output_dir,
        }
    }

    /// Opens the three directories by path.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError::OpenBase`] when the base directory cannot be
    /// opened, and [`VerifierError::OpenDirectory`] when the data or output
    /// directory exists but cannot be opened.
    pub fn open(
        registry: SourceRegistry,
        base: &Utf8Path,
        data: &Utf8Path,
        output: &Utf8Path,
    ) -> Result<Self, VerifierError> {
        let base_dir =
            Dir::open_ambient_dir(base, ambient_authority()).map_err(|source| {
                VerifierError::OpenBase {
                    path: base.to_string(),
                    source,
                }
            })?;
        Ok(Self::new(
            registry,
            base_dir,
            open_optional(data)?,
            open_optional(output)?,
        ))
    }

    /// Runs every check. Checking continues past failures so the report
    /// lists every problem.
    #[must_use]
    pub fn verify(&self) -> IntegrationReport {
        let mut report = IntegrationReport {
            passed: true,
            lines: Vec::new(),
        };

        for source in &self.registry {
            let (line, ok) = self.check_source(source);
            report.lines.push(line);
            report.passed &= ok;
        }

        let (line, ok) = self.check_snapshot();
        report.lines.push(line);
        report.passed &= ok;

        if self.base_dir.exists(SNAPSHOT_FILE) {
            report
                .lines
                .push("⚠️ legacy aggregated.json found at base path (should be in output/)".to_owned());
            report.passed = false;
        }
        report
    }

    fn check_source(&self, source: &DataSource) -> (String, bool) {
        let file = source.file_name();
        let Some(dir) = self.data_dir.as_ref().filter(|dir| dir.is_file(file)) else {
            return (format!("❌ data/{file}: MISSING"), false);
        };
        let lines = dir
            .read(file)
            .map(|contents| count_well_formed(&contents))
            .unwrap_or_default();
        (format!("✅ data/{file}: {lines} line(s)"), lines > 0)
    }

    fn check_snapshot(&self) -> (String, bool) {
        let stats = self
            .output_dir
            .as_ref()
            .and_then(|dir| dir.read_to_string(SNAPSHOT_FILE).ok())
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
            .map(|snapshot| snapshot.get("stats").cloned().unwrap_or(Value::Null));
        let Some(stats) = stats else {
            return (
                format!("❌ output/{SNAPSHOT_FILE}: MISSING or INVALID"),
                false,
            );
        };

        let counts: Vec<String> = self
            .registry
            .iter()
            .map(|source| format!("{}={}", source.name(), render_stat(stats.get(source.name().as_str()))))
            .collect();
        let total = stats.get("total");
        let ok = total.and_then(Value::as_u64).is_some_and(|total| total >= 1);
        (
            format!(
                "✅ output/{SNAPSHOT_FILE}: total={} ({})",
                render_stat(total),
                counts.join(", ")
            ),
            ok,
        )
    }
}

fn open_optional(path: &Utf8Path) -> Result<Option<Dir>, VerifierError> {
    match Dir::open_ambient_dir(path, ambient_authority()) {
        Ok(dir) => Ok(Some(dir)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(VerifierError::OpenDirectory {
            path: path.to_string(),
            source,
        }),
    }
}

fn count_well_formed(contents: &[u8]) -> usize {
    json_lines(contents)
        .filter(|(_, parsed)| parsed.is_ok())
        .count()
}

fn render_stat(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(number)) => number.to_string(),
        _ => "n/a".to_owned(),
    }
}
