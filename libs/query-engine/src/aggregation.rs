use telemetry_api::{AggregatedResult, AggregationMethod, Summary, TelemetryRecord};

/// Reduce `records` to one scalar.
///
/// Empty input yields a value of 0 for every method.
pub fn aggregate(records: &[TelemetryRecord], method: AggregationMethod) -> AggregatedResult {
    let value = match method {
        AggregationMethod::Count => records.len() as f64,
        AggregationMethod::Average => average(records),
        AggregationMethod::P95 => p95(records),
    };
    AggregatedResult {
        value,
        count: records.len(),
        method,
    }
}

/// Count, average and p95 of the same subset.
pub fn summarize(records: &[TelemetryRecord]) -> Summary {
    Summary {
        count: records.len(),
        average: average(records),
        p95: p95(records),
    }
}

fn average(records: &[TelemetryRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let sum: f64 = records.iter().map(|r| r.value).sum();
    sum / records.len() as f64
}

/// Nearest-rank 95th percentile: `sorted[floor(n * 0.95)]`.
fn p95(records: &[TelemetryRecord]) -> f64 {
    let mut values: Vec<f64> = records.iter().map(|r| r.value).collect();
    values.sort_by(f64::total_cmp);
    let index = (values.len() as f64 * 0.95).floor() as usize;
    // floor(n * 0.95) < n for every n >= 1; get() covers n == 0.
    values.get(index).copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use telemetry_api::EventType;

    use super::*;

    fn with_values(values: impl IntoIterator<Item = f64>) -> Vec<TelemetryRecord> {
        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| TelemetryRecord {
                id: format!("evt_{i}"),
                timestamp: i as i64,
                value,
                event_type: EventType::Metric,
                source: "analytics-service".into(),
            })
            .collect()
    }

    #[test]
    fn one_to_hundred() {
        let records = with_values((1..=100).map(f64::from));
        assert_eq!(aggregate(&records, AggregationMethod::Average).value, 50.5);
        assert_eq!(aggregate(&records, AggregationMethod::P95).value, 96.0);
        assert_eq!(aggregate(&records, AggregationMethod::Count).value, 100.0);
    }

    #[test]
    fn empty_input_is_zero_for_every_method() {
        for method in AggregationMethod::ALL {
            let result = aggregate(&[], method);
            assert_eq!(result.value, 0.0, "{method}");
            assert_eq!(result.count, 0);
            assert_eq!(result.method, method);
        }
    }

    #[test]
    fn count_field_is_input_size_for_every_method() {
        let records = with_values([3.0, 1.0, 2.0]);
        for method in AggregationMethod::ALL {
            assert_eq!(aggregate(&records, method).count, 3);
        }
    }

    #[test]
    fn p95_ignores_input_order() {
        let records = with_values((1..=100).rev().map(f64::from));
        assert_eq!(aggregate(&records, AggregationMethod::P95).value, 96.0);
    }

    #[test]
    fn p95_small_n_boundary() {
        // sorted values 1..=n, so the result is index + 1
        let expected_index = |n: usize| (n as f64 * 0.95).floor() as usize;
        for n in 1..=20usize {
            let records = with_values((1..=n).map(|v| v as f64));
            let got = aggregate(&records, AggregationMethod::P95).value;
            let index = expected_index(n);
            assert!(index < n, "index {index} out of range for n={n}");
            assert_eq!(got, (index + 1) as f64, "n={n}");
        }
        // spot checks: n=1 -> only element, n=10 -> floor(9.5)=9, n=20 -> last
        assert_eq!(aggregate(&with_values([42.0]), AggregationMethod::P95).value, 42.0);
        let ten = with_values((1..=10).map(f64::from));
        assert_eq!(aggregate(&ten, AggregationMethod::P95).value, 10.0);
        let twenty = with_values((1..=20).map(f64::from));
        assert_eq!(aggregate(&twenty, AggregationMethod::P95).value, 20.0);
        let nineteen = with_values((1..=19).map(f64::from));
        assert_eq!(aggregate(&nineteen, AggregationMethod::P95).value, 19.0);
    }

    #[test]
    fn summary_matches_individual_methods() {
        let records = with_values([5.0, 10.0, 15.0, 20.0]);
        let summary = summarize(&records);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.average, aggregate(&records, AggregationMethod::Average).value);
        assert_eq!(summary.p95, aggregate(&records, AggregationMethod::P95).value);
        assert_eq!(summarize(&[]), Summary::default());
    }
}
