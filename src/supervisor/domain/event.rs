//! Events delivered to the supervisor from process monitors and timers.

use super::{HandleId, ServerName};

/// Exit notification for one launched process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExit {
    /// Server whose process exited.
    pub name: ServerName,
    /// Launch the exit belongs to.
    pub handle_id: HandleId,
    /// Exit code, or `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ProcessExit {
    /// Returns whether the exit counts as a clean, intentional stop.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Asynchronous notifications funnelled into the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// A launched process exited.
    Exited(ProcessExit),
    /// The fixed restart delay elapsed for a crashed server.
    RestartDue(ServerName),
}
