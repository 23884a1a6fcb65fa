//! Application services for provider supervision.

mod health;
mod journal;
mod supervisor;

pub use health::{HEALTH_INTERVAL, HealthChecker, HealthSweep, PROBE_TIMEOUT};
pub use journal::StartupJournal;
pub use supervisor::{
    ExitOutcome, RESTART_DELAY, START_STAGGER, StartAllReport, Supervisor, SupervisorError,
    SupervisorResult,
};
