//! Domain model for provider supervision.
//!
//! The supervisor domain models server identity, kind-specific launch
//! configuration, runtime handle states and health classification.
//! Process and network concerns remain outside this boundary.

mod error;
mod event;
mod handle;
mod health;
mod ids;
mod output;
mod server;

pub use error::SupervisorDomainError;
pub use event::{ProcessExit, SupervisorEvent};
pub use handle::{HandleTarget, ServerHandle, ServerState};
pub use health::{HealthReport, HealthStatus};
pub use ids::{HandleId, ServerName};
pub use output::{LineSeverity, OutputStream, classify_output_line};
pub use server::{RemoteHttpConfig, ServerConfig, ServerKind, SubprocessConfig};
