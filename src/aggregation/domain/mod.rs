//! Domain model for source aggregation.

mod error;
mod snapshot;
mod source;

pub use error::AggregationDomainError;
pub use snapshot::{AggregatedSnapshot, SnapshotStats, SourceRecords};
pub use source::{DataSource, SourceChanged, SourceName, SourceRegistry};
