//! Capability-provider supervision for Warden.
//!
//! This module starts every configured provider, keeps a registry of live
//! handles, restarts crashed subprocesses after a fixed delay, and runs
//! periodic health checks. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
