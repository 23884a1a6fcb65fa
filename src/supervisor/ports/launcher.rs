//! Process launcher port for spawning and terminating providers.

use crate::supervisor::domain::{
    HandleId, ProcessExit, ServerName, SubprocessConfig, SupervisorEvent,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Result type for process launcher operations.
pub type ProcessLauncherResult<T> = Result<T, ProcessLauncherError>;

/// Channel end through which launchers report process exits.
#[derive(Debug, Clone)]
pub struct ExitNotifier {
    sender: UnboundedSender<SupervisorEvent>,
}

impl ExitNotifier {
    /// Wraps the supervisor event sender.
    #[must_use]
    pub const fn new(sender: UnboundedSender<SupervisorEvent>) -> Self {
        Self { sender }
    }

    /// Reports an exit. Returns `false` once the supervisor has gone away.
    pub fn notify(&self, exit: ProcessExit) -> bool {
        self.sender.send(SupervisorEvent::Exited(exit)).is_ok()
    }
}

/// Everything a launcher needs to spawn one process.
#[derive(Debug, Clone)]
pub struct LaunchRequest<'a> {
    /// Identifier of this launch.
    pub handle_id: HandleId,
    /// Server being launched.
    pub name: &'a ServerName,
    /// Command, arguments, environment and working directory.
    pub config: &'a SubprocessConfig,
    /// Where the exit notification must be delivered.
    pub exits: ExitNotifier,
}

/// Identity of a process after a successful spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchedProcess {
    /// OS process identifier, when the platform reports one.
    pub pid: Option<u32>,
}

/// Runtime control contract for provider subprocesses.
///
/// `launch` returns as soon as the process is spawned; its exit arrives later
/// through the request's [`ExitNotifier`].
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Spawns the process described by `request`.
    async fn launch(&self, request: LaunchRequest<'_>) -> ProcessLauncherResult<LaunchedProcess>;

    /// Sends a graceful termination request to a launched process.
    async fn terminate(&self, handle_id: HandleId) -> ProcessLauncherResult<()>;
}

/// Errors returned by process launcher adapters.
#[derive(Debug, Clone, Error)]
pub enum ProcessLauncherError {
    /// The operating system refused to spawn the process.
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        /// Command that failed to spawn.
        command: String,
        /// Underlying cause.
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// No process is tracked for the launch identifier.
    #[error("no process tracked for handle {0}")]
    UnknownHandle(HandleId),

    /// Generic runtime failure.
    #[error("process launcher runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl ProcessLauncherError {
    /// Wraps a spawn failure for `command`.
    pub fn spawn(
        command: impl Into<String>,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Spawn {
            command: command.into(),
            source: Arc::new(err),
        }
    }

    /// Wraps a runtime error from the launcher adapter.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}
