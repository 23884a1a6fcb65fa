//! Warden: supervision and aggregation for capability providers.
//!
//! Warden starts a fixed set of provider servers, restarts the ones that
//! crash, probes them periodically, and merges the JSON-lines files they
//! write into a single snapshot.
//!
//! # Architecture
//!
//! Warden follows hexagonal architecture principles:
//!
//! - **Domain**: Pure types and invariants with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for launching processes and probing
//!   endpoints
//! - **Adapters**: Concrete implementations of ports (tokio processes,
//!   reqwest, in-memory test doubles)
//!
//! # Modules
//!
//! - [`supervisor`]: Server registry, restart policy and health checks
//! - [`aggregation`]: Source registry, snapshot writer, change watcher and
//!   integration verifier
//! - [`runtime`]: The control loop and signal handling
//! - [`config`]: Environment-derived paths and server definitions

pub mod aggregation;
pub mod clock;
pub mod config;
pub mod logging;
pub mod runtime;
pub mod supervisor;
