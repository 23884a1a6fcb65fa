//! The single control loop tying supervision, health checks and aggregation
//! together.
//!
//! Process exits, restart timers, file changes, periodic ticks and the
//! shutdown signal all arrive as [`ControlEvent`]s on one channel and are
//! applied in order by [`ControlLoop`].

mod control;
mod signal;

pub use control::{ControlEvent, ControlLoop, RunMode, RunModeParseError, RunSummary};
pub use signal::{spawn_signal_listener, wait_for_shutdown_signal};

#[cfg(test)]
mod tests;
