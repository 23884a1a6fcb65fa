//! HTTP probe port for remote provider health checks.

use crate::supervisor::domain::RemoteHttpConfig;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for HTTP probe operations.
pub type HttpProbeResult<T> = Result<T, HttpProbeError>;

/// Issues a single GET against a remote provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpProbe: Send + Sync {
    /// Sends a GET to the configured URL with the configured headers and
    /// returns the HTTP status code.
    async fn get(&self, config: &RemoteHttpConfig) -> HttpProbeResult<u16>;
}

/// Errors returned by HTTP probe adapters.
#[derive(Debug, Clone, Error)]
pub enum HttpProbeError {
    /// The request did not complete within the probe timeout.
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(Arc<dyn std::error::Error + Send + Sync>),

    /// Any other transport-level failure.
    #[error("transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl HttpProbeError {
    /// Wraps a connection failure.
    pub fn connect(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Connect(Arc::new(err))
    }

    /// Wraps a transport failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Returns a short label for log lines.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect(_) => "connect",
            Self::Transport(_) => "transport",
        }
    }
}
