//! Shared data model of the telemetry query engine: records, filter
//! criteria, aggregation results and time helpers.

pub mod error;
pub mod types;
pub mod util;

pub use error::ParseError;
pub use types::{
    AggregatedResult, AggregationMethod, EventType, FilterCriteria, Summary, TelemetryRecord,
    TimeBound, TimeRange,
};
pub use util::{date_from_ms, datetime_from_ms, days_from_civil, days_in_month, now_ms};
