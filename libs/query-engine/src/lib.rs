//! Query engine over a timestamp-sorted telemetry record set.
//!
//! [`generator`] builds the record set once; [`filter`], [`aggregation`]
//! and [`pager`] are pure functions over it; [`offload`] runs filter +
//! aggregate off the caller's path and keeps only the newest result.

pub mod aggregation;
pub mod error;
pub mod filter;
pub mod generator;
pub mod offload;
pub mod pager;

pub use aggregation::{aggregate, summarize};
pub use error::EngineError;
pub use filter::{filter, time_window};
pub use generator::{Catalog, Generator, time_range, unique_sources, validate_count};
pub use offload::{OffloadMode, PendingQuery, QueryCoordinator, QueryOutcome, QueryResult, run_query};
pub use pager::{Page, paginate};

pub use telemetry_api as api;

/// Generate `count` records with the default catalog.
pub fn generate(count: usize) -> Vec<telemetry_api::TelemetryRecord> {
    Generator::default().generate(count)
}
