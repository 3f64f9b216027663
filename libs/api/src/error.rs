/// Failure to parse a categorical value from user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown event type '{0}' (expected one of: request, error, warning, metric, trace)")]
    EventType(String),

    #[error("unknown aggregation method '{0}' (expected one of: count, average, p95)")]
    AggregationMethod(String),
}
