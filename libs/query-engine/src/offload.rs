use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot, watch};

use telemetry_api::{AggregatedResult, AggregationMethod, FilterCriteria, TelemetryRecord};

use crate::aggregation::aggregate;
use crate::filter::filter;

// ═══════════════════════════════════════════════════════════════
//  Query result
// ═══════════════════════════════════════════════════════════════

/// Output of one filter + aggregate pass.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub request_id: u64,
    pub records: Vec<TelemetryRecord>,
    pub aggregate: AggregatedResult,
    pub elapsed: Duration,
}

/// What the caller of [`PendingQuery::wait`] gets back.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// This request is still the latest one; its result is also published
    /// to every [`QueryCoordinator::subscribe`] receiver.
    Completed(Arc<QueryResult>),
    /// A newer request was issued before this one's result arrived; the
    /// result was discarded.
    Superseded { request_id: u64, latest: u64 },
}

impl QueryOutcome {
    pub fn completed(self) -> Option<Arc<QueryResult>> {
        match self {
            QueryOutcome::Completed(result) => Some(result),
            QueryOutcome::Superseded { .. } => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, QueryOutcome::Superseded { .. })
    }
}

/// Filter then aggregate. The only computation either execution path runs.
pub fn run_query(
    request_id: u64,
    records: &[TelemetryRecord],
    criteria: &FilterCriteria,
    method: AggregationMethod,
) -> QueryResult {
    let started = Instant::now();
    let filtered = filter(records, criteria);
    let aggregate = aggregate(&filtered, method);
    let elapsed = started.elapsed();
    tracing::debug!(
        request_id,
        total = records.len(),
        filtered = filtered.len(),
        %method,
        elapsed_us = elapsed.as_micros() as u64,
        "query executed"
    );
    QueryResult {
        request_id,
        records: filtered,
        aggregate,
        elapsed,
    }
}

// ═══════════════════════════════════════════════════════════════
//  Worker
// ═══════════════════════════════════════════════════════════════

/// Where queries run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OffloadMode {
    /// Dedicated worker thread, message passing only.
    #[default]
    Worker,
    /// On the caller's own path.
    Inline,
}

#[derive(Clone)]
struct QueryInput {
    records: Arc<[TelemetryRecord]>,
    criteria: FilterCriteria,
    method: AggregationMethod,
}

struct Job {
    request_id: u64,
    input: QueryInput,
    reply: oneshot::Sender<QueryResult>,
}

/// Handle to the worker thread. The thread exits once this handle (and
/// with it the job sender) is dropped and the queue drains.
struct Worker {
    jobs: mpsc::UnboundedSender<Job>,
}

impl Worker {
    fn spawn() -> std::io::Result<Self> {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
        thread::Builder::new()
            .name("query-worker".into())
            .spawn(move || {
                tracing::debug!("query worker started");
                while let Some(job) = rx.blocking_recv() {
                    let input = &job.input;
                    let result =
                        run_query(job.request_id, &input.records, &input.criteria, input.method);
                    if job.reply.send(result).is_err() {
                        tracing::debug!(request_id = job.request_id, "pending query dropped before reply");
                    }
                }
                tracing::debug!("query worker stopped");
            })?;
        Ok(Self { jobs })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Shared sequencing state
// ═══════════════════════════════════════════════════════════════

struct Sequencer {
    next_id: AtomicU64,
    latest: AtomicU64,
    results: watch::Sender<Option<Arc<QueryResult>>>,
}

impl Sequencer {
    fn issue(&self) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest.fetch_max(id, Ordering::SeqCst);
        id
    }

    /// Publish `result` unless a newer request has been issued since.
    ///
    /// The staleness check runs under the watch lock, so a newer result can
    /// never be overwritten by an older one.
    fn deliver(&self, result: QueryResult) -> QueryOutcome {
        let request_id = result.request_id;
        let result = Arc::new(result);
        let mut latest = 0;
        let published = self.results.send_if_modified(|current| {
            latest = self.latest.load(Ordering::SeqCst);
            let newer_published = current
                .as_ref()
                .is_some_and(|c| c.request_id > request_id);
            if request_id != latest || newer_published {
                return false;
            }
            *current = Some(result.clone());
            true
        });

        if published {
            QueryOutcome::Completed(result)
        } else {
            tracing::debug!(request_id, latest, "discarding superseded query result");
            QueryOutcome::Superseded { request_id, latest }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  PendingQuery
// ═══════════════════════════════════════════════════════════════

enum Pending {
    Ready(QueryResult),
    Waiting {
        reply: oneshot::Receiver<QueryResult>,
        input: QueryInput,
    },
}

/// A submitted query whose result has not been collected yet.
#[must_use = "the result is only delivered through `wait`"]
pub struct PendingQuery {
    request_id: u64,
    state: Pending,
    sequencer: Arc<Sequencer>,
}

impl PendingQuery {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Suspend until the result is available. A result that lost its
    /// place to a newer request comes back as [`QueryOutcome::Superseded`].
    pub async fn wait(self) -> QueryOutcome {
        let result = match self.state {
            Pending::Ready(result) => result,
            Pending::Waiting { reply, input } => match reply.await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        request_id = self.request_id,
                        "query worker went away, computing inline"
                    );
                    run_query(self.request_id, &input.records, &input.criteria, input.method)
                }
            },
        };
        self.sequencer.deliver(result)
    }
}

// ═══════════════════════════════════════════════════════════════
//  QueryCoordinator
// ═══════════════════════════════════════════════════════════════

/// Runs filter + aggregate away from the caller and hands back only the
/// result of the most recent request.
///
/// Requests are tagged with an increasing sequence number. The worker
/// services them one at a time in issue order; any result whose number is
/// no longer the latest is discarded instead of delivered. In-flight work
/// is never cancelled.
pub struct QueryCoordinator {
    worker: Option<Worker>,
    sequencer: Arc<Sequencer>,
}

impl Default for QueryCoordinator {
    fn default() -> Self {
        Self::new(OffloadMode::default())
    }
}

impl QueryCoordinator {
    /// Build a coordinator. Asking for [`OffloadMode::Worker`] when no
    /// thread can be spawned falls back to inline execution.
    pub fn new(mode: OffloadMode) -> Self {
        let worker = match mode {
            OffloadMode::Inline => None,
            OffloadMode::Worker => match Worker::spawn() {
                Ok(worker) => Some(worker),
                Err(e) => {
                    tracing::warn!(error = %e, "cannot spawn query worker, running queries inline");
                    None
                }
            },
        };
        let (results, _) = watch::channel(None);
        Self {
            worker,
            sequencer: Arc::new(Sequencer {
                next_id: AtomicU64::new(0),
                latest: AtomicU64::new(0),
                results,
            }),
        }
    }

    pub fn mode(&self) -> OffloadMode {
        if self.worker.is_some() {
            OffloadMode::Worker
        } else {
            OffloadMode::Inline
        }
    }

    /// Dispatch a query and return immediately. In inline mode the work
    /// happens here, before returning.
    pub fn submit(
        &self,
        records: Arc<[TelemetryRecord]>,
        criteria: FilterCriteria,
        method: AggregationMethod,
    ) -> PendingQuery {
        let request_id = self.sequencer.issue();
        let input = QueryInput {
            records,
            criteria,
            method,
        };

        let state = match &self.worker {
            Some(worker) => {
                let (tx, rx) = oneshot::channel();
                let job = Job {
                    request_id,
                    input: input.clone(),
                    reply: tx,
                };
                match worker.jobs.send(job) {
                    // Our copy of the input backs the inline retry in `wait`.
                    Ok(()) => Pending::Waiting { reply: rx, input },
                    Err(_) => {
                        tracing::warn!(request_id, "query worker unavailable, computing inline");
                        Pending::Ready(run_query(request_id, &input.records, &input.criteria, input.method))
                    }
                }
            }
            None => Pending::Ready(run_query(request_id, &input.records, &input.criteria, input.method)),
        };

        PendingQuery {
            request_id,
            state,
            sequencer: Arc::clone(&self.sequencer),
        }
    }

    /// Submit and wait in one step.
    pub async fn query(
        &self,
        records: Arc<[TelemetryRecord]>,
        criteria: FilterCriteria,
        method: AggregationMethod,
    ) -> QueryOutcome {
        self.submit(records, criteria, method).wait().await
    }

    /// Receiver that always holds the most recent delivered result.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<QueryResult>>> {
        self.sequencer.results.subscribe()
    }

    pub fn latest_result(&self) -> Option<Arc<QueryResult>> {
        self.sequencer.results.borrow().clone()
    }
}
