//! Health classification for supervised servers.

use super::ServerName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    /// Reachable and answering with a 2xx/3xx status, or a live process.
    Ok,
    /// The endpoint answered 401; reachable but wants credentials.
    AuthNeeded,
    /// The endpoint answered with another non-success status.
    Warn,
    /// The endpoint could not be reached in time.
    Down,
    /// No live process handle is registered.
    Dead,
}

impl HealthStatus {
    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            200..=399 => Self::Ok,
            401 => Self::AuthNeeded,
            _ => Self::Warn,
        }
    }

    /// Returns the canonical label used in log lines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::AuthNeeded => "AUTH_NEEDED",
            Self::Warn => "WARN",
            Self::Down => "DOWN",
            Self::Dead => "DEAD",
        }
    }

    /// Returns whether the status needs operator attention.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Down | Self::Dead)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Timestamped result of checking one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    server: ServerName,
    status: HealthStatus,
    detail: Option<String>,
    checked_at: DateTime<Utc>,
}

impl HealthReport {
    /// Creates a report.
    #[must_use]
    pub const fn new(server: ServerName, status: HealthStatus, checked_at: DateTime<Utc>) -> Self {
        Self {
            server,
            status,
            detail: None,
            checked_at,
        }
    }

    /// Adds a detail such as the HTTP status or the pid.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let normalized = detail.into().trim().to_owned();
        if !normalized.is_empty() {
            self.detail = Some(normalized);
        }
        self
    }

    /// Returns the checked server.
    #[must_use]
    pub const fn server(&self) -> &ServerName {
        &self.server
    }

    /// Returns the classified status.
    #[must_use]
    pub const fn status(&self) -> HealthStatus {
        self.status
    }

    /// Returns the optional detail.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns when the check ran.
    #[must_use]
    pub const fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(formatter, "{}: {} ({detail})", self.server, self.status),
            None => write!(formatter, "{}: {}", self.server, self.status),
        }
    }
}
