use std::collections::BTreeSet;

use clap::{Args, ValueEnum};
use serde::Deserialize;

use query_engine::{EngineError, OffloadMode, validate_count};
use telemetry_api::{AggregationMethod, EventType, FilterCriteria, TimeBound};

use super::error::QueryCliError;
use super::time::{Edge, parse_time};

const DEFAULT_COUNT: usize = 100_000;
const DEFAULT_PAGE_SIZE: usize = 50;

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub count: Option<i64>,
    pub seed: Option<u64>,
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(default)]
    pub event_types: Vec<EventType>,
    #[serde(default)]
    pub sources: Vec<String>,
    pub method: Option<AggregationMethod>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub inline: Option<bool>,
    pub format: Option<OutputFormat>,
}

pub fn load_config(path: &str) -> Result<Config, QueryCliError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| QueryCliError::Config(format!("cannot read config {path}: {e}")))?;
    toml::from_str(&content).map_err(|e| QueryCliError::Config(format!("bad config {path}: {e}")))
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Clone, Debug)]
pub struct QueryArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "telemetry.toml", env = "TELEMETRY_QUERY_CONFIG")]
    pub config: String,

    /// Number of records to generate
    #[arg(long, allow_hyphen_values = true)]
    pub count: Option<i64>,

    /// PRNG seed (omit for a fresh random dataset)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Range start (UTC), e.g. "2026-10-10" or "2026-10-10 08:00:00", or epoch ms
    #[arg(long)]
    pub from: Option<String>,

    /// Range end (UTC, inclusive); a bare date covers the whole day
    #[arg(long)]
    pub to: Option<String>,

    /// Keep only this event type (repeatable)
    #[arg(long = "event-type", value_name = "TYPE")]
    pub event_types: Vec<EventType>,

    /// Keep only this source (repeatable)
    #[arg(long = "source", value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Aggregation: count, average or p95
    #[arg(long)]
    pub method: Option<AggregationMethod>,

    /// Page to print (1-based)
    #[arg(long)]
    pub page: Option<usize>,

    /// Records per page
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Run queries on the calling thread instead of the worker
    #[arg(long)]
    pub inline: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Page through results from stdin commands
    #[arg(long)]
    pub interactive: bool,
}

// ═══════════════════════════════════════════════════════════════
//  Effective (merged config)
// ═══════════════════════════════════════════════════════════════

/// Final settings: defaults < config file < env/CLI.
#[derive(Debug, Clone)]
pub struct Effective {
    pub count: usize,
    pub seed: Option<u64>,
    pub start: TimeBound,
    pub end: TimeBound,
    pub event_types: BTreeSet<EventType>,
    pub sources: BTreeSet<String>,
    pub method: AggregationMethod,
    pub page: usize,
    pub page_size: usize,
    pub mode: OffloadMode,
    pub format: OutputFormat,
    pub interactive: bool,
}

impl Effective {
    pub fn new(args: &QueryArgs) -> Result<Self, QueryCliError> {
        let cfg = match load_config(&args.config) {
            Ok(c) => c,
            Err(e) => {
                if std::path::Path::new(&args.config).exists() {
                    return Err(e);
                }
                Config::default()
            }
        };
        Self::merge(args, cfg)
    }

    fn merge(args: &QueryArgs, cfg: Config) -> Result<Self, QueryCliError> {
        let count = match args.count.or(cfg.count) {
            Some(n) => validate_count(n)?,
            None => DEFAULT_COUNT,
        };

        let bound = |value: Option<&str>, edge| -> Result<TimeBound, QueryCliError> {
            value
                .map(|s| parse_time(s, edge))
                .transpose()
                .map(TimeBound::from)
        };
        let start = bound(args.from.as_deref().or(cfg.from.as_deref()), Edge::Start)?;
        let end = bound(args.to.as_deref().or(cfg.to.as_deref()), Edge::End)?;

        // Lists replace, never merge: CLI values win outright when given.
        let event_types = if args.event_types.is_empty() {
            cfg.event_types
        } else {
            args.event_types.clone()
        };
        let sources = if args.sources.is_empty() {
            cfg.sources
        } else {
            args.sources.clone()
        };

        let page = args.page.or(cfg.page).unwrap_or(1);
        if page == 0 {
            return Err(EngineError::InvalidPage.into());
        }
        let page_size = args.page_size.or(cfg.page_size).unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(EngineError::InvalidPageSize.into());
        }

        let inline = args.inline || cfg.inline.unwrap_or(false);

        Ok(Self {
            count,
            seed: args.seed.or(cfg.seed),
            start,
            end,
            event_types: event_types.into_iter().collect(),
            sources: sources.into_iter().collect(),
            method: args.method.or(cfg.method).unwrap_or_default(),
            page,
            page_size,
            mode: if inline {
                OffloadMode::Inline
            } else {
                OffloadMode::Worker
            },
            format: args.format.or(cfg.format).unwrap_or_default(),
            interactive: args.interactive,
        })
    }

    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            start_time: self.start,
            end_time: self.end,
            event_types: self.event_types.clone(),
            sources: self.sources.clone(),
        }
    }
}
