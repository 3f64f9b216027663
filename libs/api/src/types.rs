use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

// ════════════════════════════════════════════════════════════════
//  EventType
// ════════════════════════════════════════════════════════════════

/// Category of a telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Request,
    Error,
    Warning,
    Metric,
    Trace,
}

impl EventType {
    pub const ALL: [EventType; 5] = [
        EventType::Request,
        EventType::Error,
        EventType::Warning,
        EventType::Metric,
        EventType::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Request => "request",
            EventType::Error => "error",
            EventType::Warning => "warning",
            EventType::Metric => "metric",
            EventType::Trace => "trace",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::EventType(s.to_string()))
    }
}

// ════════════════════════════════════════════════════════════════
//  TelemetryRecord
// ════════════════════════════════════════════════════════════════

/// One telemetry event.
///
/// Collections of records handed to the query engine are sorted ascending
/// by `timestamp`; the engine never reorders them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub id: String,
    /// Unix epoch, milliseconds.
    pub timestamp: i64,
    pub value: f64,
    pub event_type: EventType,
    pub source: String,
}

// ════════════════════════════════════════════════════════════════
//  TimeBound
// ════════════════════════════════════════════════════════════════

/// One side of a time range. Serialized as an integer, or `null` when
/// unbounded, so that a legitimate timestamp of zero stays a real bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<i64>", into = "Option<i64>")]
pub enum TimeBound {
    #[default]
    Unbounded,
    At(i64),
}

impl TimeBound {
    pub fn as_option(&self) -> Option<i64> {
        match *self {
            TimeBound::Unbounded => None,
            TimeBound::At(ts) => Some(ts),
        }
    }
}

impl From<Option<i64>> for TimeBound {
    fn from(value: Option<i64>) -> Self {
        value.map_or(TimeBound::Unbounded, TimeBound::At)
    }
}

impl From<TimeBound> for Option<i64> {
    fn from(value: TimeBound) -> Self {
        value.as_option()
    }
}

impl From<i64> for TimeBound {
    fn from(value: i64) -> Self {
        TimeBound::At(value)
    }
}

// ════════════════════════════════════════════════════════════════
//  FilterCriteria
// ════════════════════════════════════════════════════════════════

/// Time range plus categorical constraints of a query.
///
/// Both time bounds are inclusive. An empty `event_types` or `sources`
/// set imposes no restriction. `start_time > end_time` is accepted and
/// simply matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default)]
    pub start_time: TimeBound,
    #[serde(default)]
    pub end_time: TimeBound,
    #[serde(default)]
    pub event_types: BTreeSet<EventType>,
    #[serde(default)]
    pub sources: BTreeSet<String>,
}

impl FilterCriteria {
    /// Criteria that match every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: impl Into<TimeBound>, end: impl Into<TimeBound>) -> Self {
        Self {
            start_time: start.into(),
            end_time: end.into(),
            ..Self::default()
        }
    }

    pub fn with_event_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        self.event_types.extend(types);
        self
    }

    pub fn with_sources<S: Into<String>>(mut self, sources: impl IntoIterator<Item = S>) -> Self {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    pub fn has_categorical_filter(&self) -> bool {
        !self.event_types.is_empty() || !self.sources.is_empty()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.start_time == TimeBound::Unbounded
            && self.end_time == TimeBound::Unbounded
            && !self.has_categorical_filter()
    }

    /// Categorical part of the predicate; time bounds are not checked here.
    pub fn matches_categories(&self, record: &TelemetryRecord) -> bool {
        (self.event_types.is_empty() || self.event_types.contains(&record.event_type))
            && (self.sources.is_empty() || self.sources.contains(&record.source))
    }
}

// ════════════════════════════════════════════════════════════════
//  Aggregation
// ════════════════════════════════════════════════════════════════

/// Scalar reduction applied to a filtered subset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMethod {
    #[default]
    Count,
    Average,
    /// Nearest-rank 95th percentile.
    P95,
}

impl AggregationMethod {
    pub const ALL: [AggregationMethod; 3] = [
        AggregationMethod::Count,
        AggregationMethod::Average,
        AggregationMethod::P95,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMethod::Count => "count",
            AggregationMethod::Average => "average",
            AggregationMethod::P95 => "p95",
        }
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationMethod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "count" => Ok(AggregationMethod::Count),
            "average" | "avg" => Ok(AggregationMethod::Average),
            "p95" => Ok(AggregationMethod::P95),
            _ => Err(ParseError::AggregationMethod(s.to_string())),
        }
    }
}

/// Result of one aggregation. `count` is always the size of the
/// aggregated subset, whatever the method.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub value: f64,
    pub count: usize,
    pub method: AggregationMethod,
}

/// All three aggregations over the same subset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub average: f64,
    pub p95: f64,
}

/// First and last timestamp of a sorted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub min: i64,
    pub max: i64,
}
