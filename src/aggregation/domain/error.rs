//! Error types for the aggregation domain.

use thiserror::Error;

/// Validation failures for sources and registries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationDomainError {
    /// The source name is empty.
    #[error("source name must not be empty")]
    EmptySourceName,

    /// The source name contains characters other than ASCII letters and
    /// digits.
    #[error("invalid source name '{0}': only ASCII letters and digits are allowed")]
    InvalidSourceName(String),

    /// The source file name is empty.
    #[error("source file name must not be empty")]
    EmptyFileName,

    /// The source file name would escape the data directory.
    #[error("invalid source file name '{0}': must be a plain file name")]
    InvalidFileName(String),

    /// Two sources share a name or a file.
    #[error("duplicate source '{0}'")]
    DuplicateSource(String),

    /// The source name collides with a reserved snapshot key.
    #[error("source name '{0}' is reserved")]
    ReservedSourceName(String),
}
