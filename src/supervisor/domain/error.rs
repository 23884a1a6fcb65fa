//! Error types for supervisor domain validation and state transitions.

use thiserror::Error;

/// Errors returned while constructing supervisor domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SupervisorDomainError {
    /// The server name is empty after trimming.
    #[error("server name must not be empty")]
    EmptyServerName,

    /// The server name contains characters outside `[a-z0-9-]`.
    #[error(
        "server name '{0}' contains invalid characters (only lowercase alphanumeric and hyphens allowed)"
    )]
    InvalidServerName(String),

    /// The server name exceeds the 100-character limit.
    #[error("server name exceeds 100 character limit: {0}")]
    ServerNameTooLong(String),

    /// The subprocess command is empty.
    #[error("subprocess command must not be empty")]
    EmptyCommand,

    /// The subprocess working directory is empty after trimming.
    #[error("working directory must not be empty when provided")]
    EmptyWorkingDirectory,

    /// The remote HTTP URL is empty.
    #[error("remote HTTP URL must not be empty")]
    EmptyUrl,

    /// The remote HTTP URL does not have an `http://` or `https://` prefix.
    #[error("remote HTTP URL '{0}' must start with 'http://' or 'https://'")]
    InvalidUrl(String),

    /// A header name is empty after trimming.
    #[error("header name must not be empty")]
    EmptyHeaderName,

    /// Transitioning between two handle states is invalid.
    #[error("invalid server state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// Current handle state.
        from: String,
        /// Requested target state.
        to: String,
    },
}
