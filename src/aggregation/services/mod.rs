//! Aggregation services: the snapshot writer, the change watcher and the
//! integration verifier.

mod aggregator;
mod verifier;
mod watcher;

pub use aggregator::{AggregationError, AggregationResult, Aggregator, SNAPSHOT_FILE};
pub use verifier::{IntegrationReport, IntegrationVerifier, VerifierError};
pub use watcher::{AGGREGATION_INTERVAL, ChangeWatcher, WATCH_INTERVAL};
