//! Source aggregation for Warden.
//!
//! Every capability provider appends JSON lines to its own source file. This
//! module merges those files into one timestamped snapshot, watches them for
//! changes, and verifies the result independently of the running
//! supervisor.
//!
//! - Domain types in [`domain`]
//! - Orchestration services in [`services`]

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
