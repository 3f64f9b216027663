use std::io::Write;

use serde::Serialize;

use query_engine::{Page, QueryResult};
use telemetry_api::{
    AggregatedResult, FilterCriteria, Summary, TelemetryRecord, TimeRange, datetime_from_ms,
};

use super::error::QueryCliError;

// ═══════════════════════════════════════════════════════════════
//  Report (JSON view)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetView {
    pub total: usize,
    pub time_range: Option<TimeRange>,
    pub sources: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView<'a> {
    pub number: usize,
    pub size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub records: &'a [TelemetryRecord],
}

impl<'a> From<&Page<'a, TelemetryRecord>> for PageView<'a> {
    fn from(page: &Page<'a, TelemetryRecord>) -> Self {
        Self {
            number: page.number,
            size: page.size,
            total_items: page.total_items,
            total_pages: page.total_pages(),
            records: page.records,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report<'a> {
    pub request_id: u64,
    pub dataset: &'a DatasetView,
    pub criteria: &'a FilterCriteria,
    pub aggregate: AggregatedResult,
    pub summary: Summary,
    pub page: PageView<'a>,
}

pub fn write_json(out: &mut impl Write, report: &Report<'_>) -> Result<(), QueryCliError> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════
//  Text view
// ═══════════════════════════════════════════════════════════════

pub fn write_dataset(out: &mut impl Write, dataset: &DatasetView) -> Result<(), QueryCliError> {
    match dataset.time_range {
        Some(range) => writeln!(
            out,
            "  dataset : {} records, {} .. {}",
            dataset.total,
            datetime_from_ms(range.min),
            datetime_from_ms(range.max)
        )?,
        None => writeln!(out, "  dataset : empty")?,
    }
    writeln!(out, "  sources : {}", dataset.sources.join(", "))?;
    Ok(())
}

pub fn write_result(out: &mut impl Write, result: &QueryResult) -> Result<(), QueryCliError> {
    let agg = &result.aggregate;
    writeln!(
        out,
        "  query   : #{} matched {} records in {:.1} ms",
        result.request_id,
        result.records.len(),
        result.elapsed.as_secs_f64() * 1000.0
    )?;
    writeln!(out, "  {:<8}: {:.2} over {} records", agg.method.as_str(), agg.value, agg.count)?;
    Ok(())
}

pub fn write_page(out: &mut impl Write, page: &Page<'_, TelemetryRecord>) -> Result<(), QueryCliError> {
    if page.is_empty() {
        writeln!(
            out,
            "  page    : {} of {} (no records, {} total)",
            page.number,
            page.total_pages(),
            page.total_items
        )?;
        return Ok(());
    }
    let first = page.offset() + 1;
    let last = page.offset() + page.records.len();
    writeln!(
        out,
        "  page    : {} of {} (showing {first}-{last} of {})",
        page.number,
        page.total_pages(),
        page.total_items
    )?;
    writeln!(out)?;
    for r in page.records {
        writeln!(
            out,
            "  {}  {:<8} {:<21} {:>9.2}  {}",
            datetime_from_ms(r.timestamp),
            r.event_type.as_str(),
            r.source,
            r.value,
            r.id
        )?;
    }
    Ok(())
}
