use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use query_engine::{
    Generator, QueryCoordinator, QueryOutcome, QueryResult, paginate, summarize, time_range,
    unique_sources,
};
use telemetry_api::{AggregationMethod, EventType, FilterCriteria, TelemetryRecord};

use super::config::{Effective, OutputFormat};
use super::error::QueryCliError;
use super::render::{self, DatasetView, PageView, Report};

// ═══════════════════════════════════════════════════════════════
//  Main dispatch
// ═══════════════════════════════════════════════════════════════

pub async fn run(eff: &Effective) -> Result<(), QueryCliError> {
    let mut generator = Generator::default();
    if let Some(seed) = eff.seed {
        generator = generator.with_seed(seed);
    }
    let records: Arc<[TelemetryRecord]> = generator.generate(eff.count).into();

    let dataset = DatasetView {
        total: records.len(),
        time_range: time_range(&records),
        sources: unique_sources(&records),
    };

    let coordinator = QueryCoordinator::new(eff.mode);
    tracing::info!(mode = ?coordinator.mode(), method = %eff.method, "query coordinator ready");

    let mut session = Session {
        records,
        coordinator,
        criteria: eff.criteria(),
        method: eff.method,
        page: eff.page,
        page_size: eff.page_size,
        result: None,
    };
    session.refresh().await?;

    if eff.interactive {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = std::io::stdout();
        return run_interactive(&mut session, &dataset, stdin, &mut stdout.lock()).await;
    }

    let mut out = std::io::BufWriter::new(std::io::stdout().lock());
    match eff.format {
        OutputFormat::Json => session.write_report(&mut out, &dataset)?,
        OutputFormat::Text => {
            render::write_dataset(&mut out, &dataset)?;
            session.write_text(&mut out)?;
        }
    }
    out.flush()?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════
//  Session: query state on the caller side
// ═══════════════════════════════════════════════════════════════

struct Session {
    records: Arc<[TelemetryRecord]>,
    coordinator: QueryCoordinator,
    criteria: FilterCriteria,
    method: AggregationMethod,
    page: usize,
    page_size: usize,
    result: Option<Arc<QueryResult>>,
}

impl Session {
    /// Re-run the current query through the coordinator.
    async fn refresh(&mut self) -> Result<(), QueryCliError> {
        let pending =
            self.coordinator
                .submit(self.records.clone(), self.criteria.clone(), self.method);
        match pending.wait().await {
            QueryOutcome::Completed(result) => {
                tracing::info!(
                    request_id = result.request_id,
                    matched = result.records.len(),
                    total = self.records.len(),
                    method = %result.aggregate.method,
                    value = result.aggregate.value,
                    "query complete"
                );
                self.result = Some(result);
            }
            QueryOutcome::Superseded { request_id, latest } => {
                // A single-caller session only sees this if requests overlap.
                tracing::debug!(request_id, latest, "query superseded");
            }
        }
        Ok(())
    }

    fn filtered(&self) -> &[TelemetryRecord] {
        match &self.result {
            Some(result) => &result.records,
            None => &[],
        }
    }

    fn total_pages(&self) -> Result<usize, QueryCliError> {
        Ok(paginate(self.filtered(), 1, self.page_size)?.total_pages())
    }

    fn write_text(&self, out: &mut impl Write) -> Result<(), QueryCliError> {
        if let Some(result) = &self.result {
            render::write_result(out, result)?;
        }
        let page = paginate(self.filtered(), self.page, self.page_size)?;
        render::write_page(out, &page)
    }

    fn write_report(&self, out: &mut impl Write, dataset: &DatasetView) -> Result<(), QueryCliError> {
        let Some(result) = &self.result else {
            return Ok(());
        };
        let page = paginate(&result.records, self.page, self.page_size)?;
        let report = Report {
            request_id: result.request_id,
            dataset,
            criteria: &self.criteria,
            aggregate: result.aggregate,
            summary: summarize(&result.records),
            page: PageView::from(&page),
        };
        render::write_json(out, &report)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Interactive mode
// ═══════════════════════════════════════════════════════════════

const HELP: &str = "Commands: Enter -- next page | p -- previous | N -- page N | \
m <count|average|p95> -- method | t <type,..> -- event types | \
s <source,..> -- sources | q -- quit";

async fn run_interactive(
    session: &mut Session,
    dataset: &DatasetView,
    input: impl AsyncBufRead + Unpin,
    out: &mut impl Write,
) -> Result<(), QueryCliError> {
    writeln!(out, "Telemetry Query")?;
    render::write_dataset(out, dataset)?;
    writeln!(out)?;
    writeln!(out, "{HELP}")?;
    writeln!(out)?;
    session.write_text(out)?;

    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match Command::parse(line) {
            Ok(Command::Quit) => {
                writeln!(out, "Bye!")?;
                break;
            }
            Ok(Command::Next) => {
                if session.page < session.total_pages()? {
                    session.page += 1;
                }
                session.write_text(out)?;
            }
            Ok(Command::Previous) => {
                session.page = session.page.saturating_sub(1).max(1);
                session.write_text(out)?;
            }
            Ok(Command::Goto(n)) => {
                session.page = n;
                session.write_text(out)?;
            }
            Ok(Command::Method(method)) => {
                session.method = method;
                session.refresh().await?;
                session.write_text(out)?;
            }
            Ok(Command::EventTypes(types)) => {
                session.criteria.event_types = types.into_iter().collect();
                session.page = 1;
                session.refresh().await?;
                session.write_text(out)?;
            }
            Ok(Command::Sources(sources)) => {
                session.criteria.sources = sources.into_iter().collect();
                session.page = 1;
                session.refresh().await?;
                session.write_text(out)?;
            }
            Err(msg) => writeln!(out, "  {msg}")?,
        }
    }

    Ok(())
}

#[derive(Debug, PartialEq)]
enum Command {
    Next,
    Previous,
    Goto(usize),
    Method(AggregationMethod),
    EventTypes(Vec<EventType>),
    Sources(Vec<String>),
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
        let list = || -> Vec<&str> {
            rest.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect()
        };
        match head {
            "" => Ok(Command::Next),
            "p" => Ok(Command::Previous),
            "q" | "quit" => Ok(Command::Quit),
            "m" => rest.parse().map(Command::Method).map_err(|e| format!("{e}")),
            "t" => list()
                .into_iter()
                .map(str::parse)
                .collect::<Result<Vec<_>, _>>()
                .map(Command::EventTypes)
                .map_err(|e| format!("{e}")),
            "s" => Ok(Command::Sources(list().into_iter().map(String::from).collect())),
            n => match n.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Command::Goto(n)),
                _ => Err(format!("unknown command '{line}'. {HELP}")),
            },
        }
    }
}
