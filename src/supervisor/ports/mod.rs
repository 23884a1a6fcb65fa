//! Port contracts for provider supervision.

mod launcher;
mod probe;

pub use launcher::{
    ExitNotifier, LaunchRequest, LaunchedProcess, ProcessLauncher, ProcessLauncherError,
    ProcessLauncherResult,
};
#[cfg(test)]
pub use probe::MockHttpProbe;
pub use probe::{HttpProbe, HttpProbeError, HttpProbeResult};
