use telemetry_api::{FilterCriteria, TelemetryRecord, TimeBound};

/// Contiguous run of `records` whose timestamps lie in `[start, end]`.
///
/// `records` must be sorted ascending by timestamp. Both edges are found
/// by binary search, so the cost is O(log n) regardless of the window size.
/// Duplicate timestamps on either edge are included.
pub fn time_window(
    records: &[TelemetryRecord],
    start: TimeBound,
    end: TimeBound,
) -> &[TelemetryRecord] {
    let lo = match start {
        TimeBound::Unbounded => 0,
        TimeBound::At(ts) => records.partition_point(|r| r.timestamp < ts),
    };
    let hi = match end {
        TimeBound::Unbounded => records.len(),
        TimeBound::At(ts) => records.partition_point(|r| r.timestamp <= ts),
    };
    if lo >= hi { &[] } else { &records[lo..hi] }
}

/// Records matching every constraint of `criteria`, in their original order.
///
/// The time predicate narrows the input to a window first; the categorical
/// predicates then scan only that window.
pub fn filter(records: &[TelemetryRecord], criteria: &FilterCriteria) -> Vec<TelemetryRecord> {
    let window = time_window(records, criteria.start_time, criteria.end_time);
    if !criteria.has_categorical_filter() {
        return window.to_vec();
    }
    window
        .iter()
        .filter(|r| criteria.matches_categories(r))
        .cloned()
        .collect()
}
