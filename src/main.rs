// src/main.rs
use anyhow::{anyhow, bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use capacity_core::capacity::{calculate_available_capacity, calculate_weekly_capacity, weekly_breakdown};
use capacity_core::config::{AppConfig, ConfigError};
use capacity_core::export::export_report_to_file;
use capacity_core::models::AnalysisPeriod;
use capacity_core::report::build_utilization_report;
use capacity_core::server::{self, AppState, CapacityResponse};
use capacity_core::source::{FileSource, RecordSource};
use capacity_core::validation::validate_snapshot;

#[derive(Parser, Debug)]
#[command(name = "capacity-core", version, about = "Team capacity and utilization reports")]
struct Cli {
    /// JSON snapshot to read instead of the configured source
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct PeriodArgs {
    /// First day of the period (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day of the period, inclusive
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Any date inside a week to analyse; repeat for more weeks. Overrides --start/--end.
    #[arg(long = "week")]
    weeks: Vec<NaiveDate>,
}

impl PeriodArgs {
    fn resolve(&self) -> Option<AnalysisPeriod> {
        AnalysisPeriod::resolve(self.start, self.end, &self.weeks)
    }

    fn require(&self) -> Result<AnalysisPeriod> {
        self.resolve()
            .ok_or_else(|| anyhow!("Provide --start and --end, or at least one --week"))
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Utilization for every employee over a period
    Report {
        #[command(flatten)]
        period: PeriodArgs,

        /// Also write the per-employee rows to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Available capacity for one employee
    Capacity {
        /// Employee id or linked account id
        #[arg(long)]
        employee: String,

        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Check snapshot records against the data-entry guards (current year unless a period is given)
    Validate {
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Run the HTTP API
    Serve {
        /// Overrides CAPACITY_BIND_ADDR
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Loading configuration failed")?;
    init_tracing(&config.log_level)?;

    match cli.command {
        Command::Report { period, csv } => {
            let period = period.require()?;
            let source = resolve_source(cli.data, &config)?;
            let snapshot = source
                .load_snapshot(&period)
                .await
                .with_context(|| format!("Loading records from {} failed", source.describe()))?;

            let findings = validate_snapshot(&snapshot);
            if !findings.is_empty() {
                warn!(
                    "{} snapshot records failed validation; run `validate` for details",
                    findings.len()
                );
            }

            let report = build_utilization_report(&snapshot, period);
            if let Some(path) = csv {
                export_report_to_file(&report, &path)
                    .with_context(|| format!("Writing CSV to {} failed", path.display()))?;
            }
            print_json(&report)?;
        }
        Command::Capacity { employee, period } => {
            let requested = period.require()?;
            let source = resolve_source(cli.data, &config)?;
            let snapshot = source
                .load_snapshot(&requested)
                .await
                .with_context(|| format!("Loading records from {} failed", source.describe()))?;
            let found = snapshot
                .employees
                .iter()
                .find(|candidate| candidate.is_owner(&employee))
                .ok_or_else(|| anyhow!("Employee '{}' not found in snapshot", employee))?;

            let response = if period.weeks.is_empty() {
                CapacityResponse {
                    capacity: calculate_available_capacity(
                        found,
                        requested.start,
                        requested.end,
                        &snapshot.holidays,
                        &snapshot.absences,
                    ),
                    weeks: Vec::new(),
                }
            } else {
                CapacityResponse {
                    capacity: calculate_weekly_capacity(
                        found,
                        &period.weeks,
                        &snapshot.holidays,
                        &snapshot.absences,
                    ),
                    weeks: weekly_breakdown(found, &period.weeks, &snapshot.holidays, &snapshot.absences),
                }
            };
            print_json(&response)?;
        }
        Command::Validate { period } => {
            let period = period.resolve().unwrap_or_else(current_year);
            let source = resolve_source(cli.data, &config)?;
            let snapshot = source
                .load_snapshot(&period)
                .await
                .with_context(|| format!("Loading records from {} failed", source.describe()))?;
            let findings = validate_snapshot(&snapshot);
            print_json(&findings)?;
            if !findings.is_empty() {
                bail!("{} invalid records found", findings.len());
            }
            info!("All snapshot records passed validation");
        }
        Command::Serve { bind } => {
            let addr = match bind {
                Some(addr) => addr,
                None => config.socket_addr()?,
            };
            let source = match resolve_source(cli.data, &config) {
                Ok(source) => Some(source),
                Err(ConfigError::MissingSource) => {
                    warn!("No record source configured; GET /api/utilization will answer 503");
                    None
                }
                Err(e) => return Err(e).context("Record source setup failed"),
            };
            server::serve(addr, AppState::new(source))
                .await
                .context("HTTP server failed")?;
        }
    }

    Ok(())
}

fn init_tracing(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .with_context(|| format!("Invalid log level '{}'", default_level))?;
    // stdout carries the JSON output, logs go to stderr.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Setting tracing subscriber failed")?;
    Ok(())
}

/// `--data` wins over the environment.
fn resolve_source(
    data: Option<PathBuf>,
    config: &AppConfig,
) -> Result<Arc<dyn RecordSource>, ConfigError> {
    match data {
        Some(path) => Ok(Arc::new(FileSource::new(path))),
        None => config.record_source(),
    }
}

fn current_year() -> AnalysisPeriod {
    let today = chrono::Local::now().date_naive();
    let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
    let end = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
    AnalysisPeriod::new(start, end)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Serializing output failed")?;
    println!("{}", json);
    Ok(())
}
