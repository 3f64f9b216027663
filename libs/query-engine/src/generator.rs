use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use telemetry_api::{EventType, TelemetryRecord, TimeRange, date_from_ms, now_ms};

use crate::error::EngineError;

const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

// ═══════════════════════════════════════════════════════════════
//  Catalog
// ═══════════════════════════════════════════════════════════════

/// Fixed tables the generator draws from.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    /// Relative weight per event type. Order matters only for which
    /// type wins a draw on a boundary.
    pub event_weights: Vec<(EventType, f64)>,
    /// Service names, drawn uniformly.
    pub sources: Vec<String>,
    /// Length of the trailing window timestamps fall into.
    pub window_ms: i64,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            event_weights: vec![
                (EventType::Request, 0.50),
                (EventType::Metric, 0.20),
                (EventType::Trace, 0.15),
                (EventType::Warning, 0.10),
                (EventType::Error, 0.05),
            ],
            sources: [
                "api-gateway",
                "auth-service",
                "payment-service",
                "user-service",
                "notification-service",
                "analytics-service",
                "database-primary",
                "database-replica",
                "cache-redis",
                "message-queue",
                "cdn-edge",
                "logging-service",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            window_ms: WEEK_MS,
        }
    }
}

impl Catalog {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.sources.is_empty() {
            return Err(EngineError::Catalog("source list is empty".into()));
        }
        if self.event_weights.is_empty() {
            return Err(EngineError::Catalog("event weight table is empty".into()));
        }
        if let Some((t, w)) = self
            .event_weights
            .iter()
            .find(|(_, w)| !w.is_finite() || *w < 0.0)
        {
            return Err(EngineError::Catalog(format!("invalid weight {w} for '{t}'")));
        }
        if self.total_weight() <= 0.0 {
            return Err(EngineError::Catalog("event weights sum to zero".into()));
        }
        if self.window_ms <= 0 {
            return Err(EngineError::Catalog(format!(
                "window must be positive, got {}ms",
                self.window_ms
            )));
        }
        Ok(())
    }

    fn total_weight(&self) -> f64 {
        self.event_weights.iter().map(|(_, w)| w).sum()
    }

    fn pick_event_type(&self, rng: &mut impl Rng) -> EventType {
        let mut roll = rng.r#gen::<f64>() * self.total_weight();
        for &(event_type, weight) in &self.event_weights {
            if roll < weight {
                return event_type;
            }
            roll -= weight;
        }
        // Rounding can leave a sliver past the last bucket.
        self.event_weights[self.event_weights.len() - 1].0
    }

    fn pick_source(&self, rng: &mut impl Rng) -> &str {
        &self.sources[rng.gen_range(0..self.sources.len())]
    }
}

// ═══════════════════════════════════════════════════════════════
//  Value distributions
// ═══════════════════════════════════════════════════════════════

/// Draw a value whose shape depends on the event type.
fn sample_value(event_type: EventType, rng: &mut impl Rng) -> f64 {
    let u: f64 = rng.r#gen();
    match event_type {
        // latency ms: 90% in 10..200, long tail up to 1000
        EventType::Request => {
            if u < 0.9 {
                10.0 + rng.r#gen::<f64>() * 190.0
            } else {
                200.0 + rng.r#gen::<f64>() * 800.0
            }
        }
        // HTTP status 400..=599
        EventType::Error => 400.0 + (u * 200.0).floor(),
        // severity 1..=10
        EventType::Warning => 1.0 + (u * 10.0).floor(),
        // utilisation percent
        EventType::Metric => u * 100.0,
        // span duration ms
        EventType::Trace => 5.0 + u * 500.0,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ═══════════════════════════════════════════════════════════════
//  Generator
// ═══════════════════════════════════════════════════════════════

/// Synthetic telemetry source.
///
/// Timestamps fall into a window trailing the anchor instant (generation
/// time unless [`Generator::anchored_at`] pins it), with a sinusoidal bias
/// that mimics daily traffic peaks. Output is always sorted by timestamp.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    catalog: Catalog,
    seed: Option<u64>,
    anchor_ms: Option<i64>,
}

impl Generator {
    pub fn new(catalog: Catalog) -> Result<Self, EngineError> {
        catalog.validate()?;
        Ok(Self {
            catalog,
            seed: None,
            anchor_ms: None,
        })
    }

    /// Seed the PRNG. Two generators with the same seed, catalog and
    /// anchor produce identical records.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn anchored_at(mut self, anchor_ms: i64) -> Self {
        self.anchor_ms = Some(anchor_ms);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn generate(&self, count: usize) -> Vec<TelemetryRecord> {
        let started = Instant::now();
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let anchor = self.anchor_ms.unwrap_or_else(now_ms);
        let window = self.catalog.window_ms;
        let window_start = anchor - window;

        let mut records = Vec::with_capacity(count);
        for i in 0..count {
            let phase: f64 = rng.r#gen();
            let bias = (phase * PI * 2.0).sin() * 0.3 + 0.5;
            let offset = rng.r#gen::<f64>() * bias * window as f64;
            let timestamp = (window_start as f64 + offset).floor() as i64;

            let event_type = self.catalog.pick_event_type(&mut rng);
            let source = self.catalog.pick_source(&mut rng).to_string();
            let value = round2(sample_value(event_type, &mut rng));

            records.push(TelemetryRecord {
                id: format!("evt_{i}_{timestamp}"),
                timestamp,
                value,
                event_type,
                source,
            });
        }

        records.sort_by_key(|r| r.timestamp);

        match time_range(&records) {
            Some(range) => tracing::info!(
                count,
                elapsed_ms = started.elapsed().as_millis() as u64,
                from = %date_from_ms(range.min),
                to = %date_from_ms(range.max),
                "generated telemetry records"
            ),
            None => tracing::info!(count, "generated empty record set"),
        }

        records
    }
}

/// Convert a signed, user-supplied record count.
pub fn validate_count(count: i64) -> Result<usize, EngineError> {
    usize::try_from(count).map_err(|_| EngineError::NegativeCount(count))
}

// ═══════════════════════════════════════════════════════════════
//  Dataset metadata
// ═══════════════════════════════════════════════════════════════

/// Distinct sources present in `records`, sorted.
pub fn unique_sources(records: &[TelemetryRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.source.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

/// First and last timestamp of a sorted collection.
pub fn time_range(records: &[TelemetryRecord]) -> Option<TimeRange> {
    Some(TimeRange {
        min: records.first()?.timestamp,
        max: records.last()?.timestamp,
    })
}
