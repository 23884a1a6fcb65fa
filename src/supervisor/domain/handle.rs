//! Runtime handle for a supervised server.

use super::{HandleId, RemoteHttpConfig, ServerName, SupervisorDomainError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a server handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    /// Launch has been requested but not confirmed.
    Starting,
    /// The process was spawned (or the endpoint registered).
    Running,
    /// The process exited unsuccessfully.
    Crashed,
    /// A restart is scheduled.
    Restarting,
    /// The server was stopped on purpose or exited cleanly.
    Stopped,
}

impl ServerState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Crashed => "crashed",
            Self::Restarting => "restarting",
            Self::Stopped => "stopped",
        }
    }

    /// Returns whether the handle counts as alive for health checks.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Starting, Self::Running | Self::Crashed | Self::Stopped)
                | (Self::Running, Self::Crashed | Self::Stopped)
                | (Self::Crashed, Self::Restarting | Self::Stopped)
                | (Self::Restarting, Self::Stopped)
        )
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// What the supervisor holds for a running server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleTarget {
    /// A spawned process, identified by its OS pid when known.
    Process {
        /// Process identifier reported at spawn time.
        pid: Option<u32>,
    },
    /// A registered remote endpoint; there is no live local handle.
    Remote(RemoteHttpConfig),
}

/// Supervisor-owned runtime record of one launch of a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHandle {
    id: HandleId,
    name: ServerName,
    state: ServerState,
    target: HandleTarget,
    launched_at: DateTime<Utc>,
    exit_code: Option<i32>,
    killed: bool,
}

impl ServerHandle {
    /// Creates a handle in the `starting` state.
    #[must_use]
    pub fn starting(
        id: HandleId,
        name: ServerName,
        target: HandleTarget,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id,
            name,
            state: ServerState::Starting,
            target,
            launched_at: clock.utc(),
            exit_code: None,
            killed: false,
        }
    }

    /// Returns the launch identifier.
    #[must_use]
    pub const fn id(&self) -> HandleId {
        self.id
    }

    /// Returns the server name.
    #[must_use]
    pub const fn name(&self) -> &ServerName {
        &self.name
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Returns the handle target.
    #[must_use]
    pub const fn target(&self) -> &HandleTarget {
        &self.target
    }

    /// Returns the OS pid for process handles.
    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        match self.target {
            HandleTarget::Process { pid } => pid,
            HandleTarget::Remote(_) => None,
        }
    }

    /// Returns when this launch happened.
    #[must_use]
    pub const fn launched_at(&self) -> DateTime<Utc> {
        self.launched_at
    }

    /// Returns the exit code observed for this launch, if any.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Returns whether the supervisor terminated this launch on purpose.
    #[must_use]
    pub const fn is_killed(&self) -> bool {
        self.killed
    }

    /// Marks the handle as running.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorDomainError::InvalidStateTransition`] when the
    /// transition is not allowed.
    pub fn mark_running(&mut self) -> Result<(), SupervisorDomainError> {
        self.transition_to(ServerState::Running)
    }

    /// Marks the handle as crashed with the observed exit code.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorDomainError::InvalidStateTransition`] when the
    /// transition is not allowed.
    pub fn mark_crashed(&mut self, exit_code: Option<i32>) -> Result<(), SupervisorDomainError> {
        self.transition_to(ServerState::Crashed)?;
        self.exit_code = exit_code;
        Ok(())
    }

    /// Marks a crashed handle as awaiting restart.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorDomainError::InvalidStateTransition`] when the
    /// transition is not allowed.
    pub fn mark_restarting(&mut self) -> Result<(), SupervisorDomainError> {
        self.transition_to(ServerState::Restarting)
    }

    /// Marks the handle as stopped.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorDomainError::InvalidStateTransition`] when the
    /// transition is not allowed.
    pub fn mark_stopped(&mut self, exit_code: Option<i32>) -> Result<(), SupervisorDomainError> {
        self.transition_to(ServerState::Stopped)?;
        if exit_code.is_some() {
            self.exit_code = exit_code;
        }
        Ok(())
    }

    /// Marks the handle as stopped by a termination request.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorDomainError::InvalidStateTransition`] when the
    /// transition is not allowed.
    pub fn mark_killed(&mut self) -> Result<(), SupervisorDomainError> {
        self.transition_to(ServerState::Stopped)?;
        self.killed = true;
        Ok(())
    }

    fn transition_to(&mut self, target_state: ServerState) -> Result<(), SupervisorDomainError> {
        if !self.state.can_transition_to(target_state) {
            return Err(SupervisorDomainError::InvalidStateTransition {
                from: self.state.as_str().to_owned(),
                to: target_state.as_str().to_owned(),
            });
        }

        self.state = target_state;
        Ok(())
    }
}
