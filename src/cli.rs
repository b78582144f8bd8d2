//! CLI definition and pipeline orchestration.
//!
//! Stages: load config → connect → fetch (connection released) → calculate →
//! render chart → write results. Only configuration and connection failures
//! abort the run; every later failure is logged and the run carries on.

use chrono::Local;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_result_adapter::JsonResultAdapter;
use crate::adapters::svg_chart_adapter::SvgChartAdapter;
use crate::domain::config::{
    AppConfig, Backend, DatabaseConfig, OutputConfig, QueryConfig, DEFAULT_CHART_PATH,
    DEFAULT_LOOKBACK_DAYS, DEFAULT_METRICS_PATH, DEFAULT_TRADE_TYPE,
};
use crate::domain::error::TradestatsError;
use crate::domain::metrics::{self, Metrics};
use crate::domain::trade::{TradeFilter, TradeRow};
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::{ChartOutcome, ChartPort, ResultPort};
use crate::ports::trade_port::TradePort;

#[derive(Parser, Debug, Default)]
#[command(
    name = "tradestats",
    about = "Trade performance metrics and equity curve from the trade store"
)]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Trade type to analyse, or ALL
    #[arg(short = 't', long)]
    pub trade_type: Option<String>,
    /// Lookback window in days; 0 or less removes the date bound
    #[arg(short, long, allow_negative_numbers = true)]
    pub days: Option<i64>,
    /// Equity curve output path
    #[arg(long)]
    pub chart: Option<PathBuf>,
    /// JSON results output path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Command-line flags win over the config file.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(trade_type) = &self.trade_type {
            config.query.trade_type = trade_type.clone();
        }
        if let Some(days) = self.days {
            config.query.lookback_days = days;
        }
        if let Some(chart) = &self.chart {
            config.output.chart_path = chart.clone();
        }
        if let Some(output) = &self.output {
            config.output.metrics_path = output.clone();
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// `None` when no trades matched.
    pub metrics: Option<Metrics>,
    pub trade_count: usize,
    pub chart_written: bool,
    pub results_written: bool,
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(&cli) {
        Ok(summary) => {
            match &summary.metrics {
                Some(metrics) => {
                    info!("processing completed");
                    for line in metrics.summary_lines() {
                        info!("{line}");
                    }
                }
                None => info!("processing completed: no trades in the selected window"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

/// Run the whole pipeline with the production adapters.
pub fn execute(cli: &Cli) -> Result<RunSummary, TradestatsError> {
    let config_adapter = load_config(cli.config.as_deref())?;
    let mut config = build_app_config(&config_adapter)?;
    cli.apply_overrides(&mut config);

    let filter = TradeFilter::lookback(
        &config.query.trade_type,
        config.query.lookback_days,
        Local::now().naive_local(),
    );

    let source = open_trade_source(&config.database)?;
    let rows = load_trades(source, &filter)?;

    Ok(process_trades(
        &rows,
        &config.output,
        &SvgChartAdapter::new(),
        &JsonResultAdapter::new(),
    ))
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, TradestatsError> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            FileConfigAdapter::from_file(path).map_err(|e| TradestatsError::ConfigParse {
                file: path.display().to_string(),
                reason: e.to_string(),
            })
        }
        None => Ok(FileConfigAdapter::empty()),
    }
}

fn parse_key<T>(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<T>, TradestatsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    config
        .get_string(section, key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| TradestatsError::ConfigInvalid {
                    section: section.into(),
                    key: key.into(),
                    reason: e.to_string(),
                })
        })
        .transpose()
}

pub fn build_database_config(config: &dyn ConfigPort) -> Result<DatabaseConfig, TradestatsError> {
    let defaults = DatabaseConfig::default();

    Ok(DatabaseConfig {
        backend: parse_key::<Backend>(config, "database", "backend")?.unwrap_or(defaults.backend),
        connection_string: config.get_string("database", "connection_string"),
        host: config.get_string("database", "host").unwrap_or(defaults.host),
        port: parse_key::<u16>(config, "database", "port")?.unwrap_or(defaults.port),
        user: config.get_string("database", "user").unwrap_or(defaults.user),
        password: config.get_string("database", "password"),
        dbname: config.get_string("database", "dbname").unwrap_or(defaults.dbname),
        sqlite_path: config.get_string("sqlite", "path").map(PathBuf::from),
        connect_timeout: parse_key::<u64>(config, "database", "connect_timeout")?
            .map(Duration::from_secs),
        statement_timeout: parse_key::<u64>(config, "database", "statement_timeout")?
            .map(Duration::from_millis),
    })
}

pub fn build_app_config(config: &dyn ConfigPort) -> Result<AppConfig, TradestatsError> {
    let database = build_database_config(config)?;

    let query = QueryConfig {
        trade_type: config
            .get_string("query", "trade_type")
            .unwrap_or_else(|| DEFAULT_TRADE_TYPE.to_string()),
        lookback_days: parse_key::<i64>(config, "query", "lookback_days")?
            .unwrap_or(DEFAULT_LOOKBACK_DAYS),
    };

    let output = OutputConfig {
        chart_path: config
            .get_string("output", "chart_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CHART_PATH)),
        metrics_path: config
            .get_string("output", "metrics_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_METRICS_PATH)),
    };

    Ok(AppConfig {
        database,
        query,
        output,
    })
}

/// Connect to the configured store. Failure here is fatal.
pub fn open_trade_source(config: &DatabaseConfig) -> Result<Box<dyn TradePort>, TradestatsError> {
    info!(backend = %config.backend, "connecting to trade store");
    match config.backend {
        Backend::Postgres => open_postgres(config),
        Backend::Sqlite => open_sqlite(config),
    }
}

#[cfg(feature = "postgres")]
fn open_postgres(config: &DatabaseConfig) -> Result<Box<dyn TradePort>, TradestatsError> {
    use crate::adapters::postgres_adapter::PostgresAdapter;
    Ok(Box::new(PostgresAdapter::connect(config)?))
}

#[cfg(not(feature = "postgres"))]
fn open_postgres(_config: &DatabaseConfig) -> Result<Box<dyn TradePort>, TradestatsError> {
    Err(TradestatsError::ConfigInvalid {
        section: "database".into(),
        key: "backend".into(),
        reason: "postgres feature is not enabled".into(),
    })
}

#[cfg(feature = "sqlite")]
fn open_sqlite(config: &DatabaseConfig) -> Result<Box<dyn TradePort>, TradestatsError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    Ok(Box::new(SqliteAdapter::from_config(config)?))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_config: &DatabaseConfig) -> Result<Box<dyn TradePort>, TradestatsError> {
    Err(TradestatsError::ConfigInvalid {
        section: "database".into(),
        key: "backend".into(),
        reason: "sqlite feature is not enabled".into(),
    })
}

/// Run the single read and release the connection.
///
/// A failed query is logged and treated as an empty result. Losing the
/// store itself is fatal.
pub fn load_trades(
    source: Box<dyn TradePort>,
    filter: &TradeFilter,
) -> Result<Vec<TradeRow>, TradestatsError> {
    let result = source.fetch_trades(filter);
    drop(source);

    match result {
        Ok(rows) => {
            info!(count = rows.len(), %filter, "fetched trades");
            Ok(rows)
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(error = %e, "error fetching trades; continuing without data");
            Ok(Vec::new())
        }
    }
}

/// Calculate metrics, then render and persist them. Never fails: output
/// errors are logged and reflected in the summary.
pub fn process_trades(
    rows: &[TradeRow],
    output: &OutputConfig,
    chart: &dyn ChartPort,
    results: &dyn ResultPort,
) -> RunSummary {
    let (metrics, trades) = metrics::calculate(rows);
    if metrics.is_none() {
        info!("no trades to analyse");
    }

    let chart_written = match chart.render_equity_curve(&trades, &output.chart_path) {
        Ok(ChartOutcome::Written) => true,
        Ok(ChartOutcome::NoData) => false,
        Err(e) => {
            warn!(path = %output.chart_path.display(), error = %e, "failed to render equity curve");
            false
        }
    };

    let results_written =
        match results.write_results(metrics.as_ref(), &trades, &output.metrics_path) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %output.metrics_path.display(), error = %e, "failed to write results");
                false
            }
        };

    RunSummary {
        metrics,
        trade_count: trades.len(),
        chart_written,
        results_written,
    }
}
