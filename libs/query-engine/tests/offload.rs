//! Offload coordinator tests: worker and inline modes must agree, and an
//! overlapping request must supersede the one issued before it.

use std::sync::Arc;

use query_engine::api::{AggregationMethod, EventType, FilterCriteria, TelemetryRecord};
use query_engine::{
    Generator, OffloadMode, QueryCoordinator, QueryOutcome, aggregate, filter, run_query,
};

const ANCHOR: i64 = 1_700_000_000_000;

fn dataset() -> Arc<[TelemetryRecord]> {
    Generator::default()
        .with_seed(42)
        .anchored_at(ANCHOR)
        .generate(20_000)
        .into()
}

fn errors_only() -> FilterCriteria {
    FilterCriteria::all().with_event_types([EventType::Error])
}

fn last_day() -> FilterCriteria {
    FilterCriteria::between(ANCHOR - 24 * 60 * 60 * 1000, ANCHOR)
}

// =============================================================================
// Equivalence
// =============================================================================

#[tokio::test]
async fn worker_and_inline_agree() {
    let records = dataset();
    let worker = QueryCoordinator::new(OffloadMode::Worker);
    let inline = QueryCoordinator::new(OffloadMode::Inline);
    assert_eq!(worker.mode(), OffloadMode::Worker);
    assert_eq!(inline.mode(), OffloadMode::Inline);

    for method in AggregationMethod::ALL {
        let a = worker
            .query(records.clone(), errors_only(), method)
            .await
            .completed()
            .expect("worker result");
        let b = inline
            .query(records.clone(), errors_only(), method)
            .await
            .completed()
            .expect("inline result");
        assert_eq!(a.records, b.records);
        assert_eq!(a.aggregate, b.aggregate);
    }
}

#[tokio::test]
async fn result_matches_direct_calls() {
    let records = dataset();
    let coordinator = QueryCoordinator::default();
    let result = coordinator
        .query(records.clone(), last_day(), AggregationMethod::P95)
        .await
        .completed()
        .expect("result");

    let expected = filter(&records, &last_day());
    assert_eq!(result.records, expected);
    assert_eq!(result.aggregate, aggregate(&expected, AggregationMethod::P95));
    assert_eq!(result.aggregate.count, expected.len());
}

#[test]
fn run_query_tags_request_id() {
    let records = dataset();
    let result = run_query(9, &records, &FilterCriteria::all(), AggregationMethod::Count);
    assert_eq!(result.request_id, 9);
    assert_eq!(result.aggregate.value, records.len() as f64);
}

// =============================================================================
// Superseding
// =============================================================================

async fn overlapping_requests_keep_only_latest(mode: OffloadMode) {
    let records = dataset();
    let coordinator = QueryCoordinator::new(mode);
    let mut updates = coordinator.subscribe();

    let first = coordinator.submit(records.clone(), errors_only(), AggregationMethod::Count);
    let second = coordinator.submit(records.clone(), last_day(), AggregationMethod::Average);
    assert!(second.request_id() > first.request_id());

    // #1's response arrives after #2 was issued and must be dropped.
    let first_outcome = first.wait().await;
    match first_outcome {
        QueryOutcome::Superseded { request_id, latest } => {
            assert_eq!(request_id, 1);
            assert_eq!(latest, 2);
        }
        QueryOutcome::Completed(r) => panic!("stale request {} was delivered", r.request_id),
    }
    assert!(coordinator.latest_result().is_none());
    assert!(!updates.has_changed().unwrap());

    let second_result = second.wait().await.completed().expect("latest request delivered");
    assert_eq!(second_result.request_id, 2);
    assert_eq!(second_result.aggregate.method, AggregationMethod::Average);

    assert!(updates.has_changed().unwrap());
    let seen = updates.borrow_and_update().clone().expect("published");
    assert_eq!(seen.request_id, 2);
}

#[tokio::test]
async fn overlapping_requests_worker() {
    overlapping_requests_keep_only_latest(OffloadMode::Worker).await;
}

#[tokio::test]
async fn overlapping_requests_inline() {
    overlapping_requests_keep_only_latest(OffloadMode::Inline).await;
}

#[tokio::test]
async fn stale_result_never_overwrites_newer_one() {
    let records = dataset();
    let coordinator = QueryCoordinator::default();

    let first = coordinator.submit(records.clone(), errors_only(), AggregationMethod::Count);
    let second = coordinator.submit(records.clone(), last_day(), AggregationMethod::Count);

    // Collect the newer one first, then the older one.
    let newest = second.wait().await.completed().expect("newest delivered");
    assert!(first.wait().await.is_superseded());

    let published = coordinator.latest_result().expect("published");
    assert_eq!(published.request_id, newest.request_id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_waiters_see_single_winner() {
    let records = dataset();
    let coordinator = Arc::new(QueryCoordinator::default());

    let pending: Vec<_> = (0..8)
        .map(|_| coordinator.submit(records.clone(), errors_only(), AggregationMethod::Count))
        .collect();
    let handles: Vec<_> = pending
        .into_iter()
        .map(|p| tokio::spawn(p.wait()))
        .collect();

    let mut completed = Vec::new();
    for h in handles {
        if let Some(result) = h.await.unwrap().completed() {
            completed.push(result.request_id);
        }
    }
    assert_eq!(completed, vec![8]);
    assert_eq!(coordinator.latest_result().unwrap().request_id, 8);
}

#[tokio::test]
async fn sequential_requests_all_complete() {
    let records = dataset();
    let coordinator = QueryCoordinator::default();
    for expected_id in 1..=3u64 {
        let result = coordinator
            .query(records.clone(), FilterCriteria::all(), AggregationMethod::Count)
            .await
            .completed()
            .expect("sequential query is never stale");
        assert_eq!(result.request_id, expected_id);
        assert_eq!(result.records.len(), records.len());
    }
}
