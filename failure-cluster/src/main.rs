//! Failure Cluster CLI
//!
//! Reads failed-test records (a JSON array) and prints ranked clusters.
//!
//! Usage:
//!   failure-cluster [OPTIONS] <INPUT>
//!
//! Examples:
//!   failure-cluster failures.json                      # Terminal summary
//!   failure-cluster failures.json --min-cluster-size 2 # Hide singletons
//!   failure-cluster - --format json < failures.json    # Read stdin, emit JSON
//!   failure-cluster failures.json --skip 20 --limit 20 # Second page of 20

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use failure_cluster::config::FileConfig;
use failure_cluster::report::{OutputFormat, Reporter};
use failure_cluster::{FailureRecord, SortBy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "failure-cluster")]
#[command(about = "Collapse bulk test-run failures into ranked root-cause clusters")]
struct Cli {
    /// JSON file with an array of failure records, or '-' for stdin
    input: String,

    /// Minimum similarity for a fuzzy match, in (0, 1]
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Hide clusters with fewer members than this
    #[arg(short, long)]
    min_cluster_size: Option<usize>,

    /// Ranking: count, error-category
    #[arg(short, long)]
    sort_by: Option<SortBy>,

    /// Number of ranked clusters to skip
    #[arg(long)]
    skip: Option<usize>,

    /// Maximum number of clusters to print
    #[arg(short, long)]
    limit: Option<usize>,

    /// Output format: terminal, markdown, json, csv
    #[arg(short, long, default_value = "terminal")]
    format: String,

    /// Config file path (searched for if not specified)
    #[arg(short, long, env = "FAILURE_CLUSTER_CONFIG")]
    config: Option<PathBuf>,

    /// List member test names under each cluster
    #[arg(long)]
    members: bool,

    /// Log per-record clustering decisions
    #[arg(short, long)]
    verbose: bool,
}

/// Logs go to stderr so stdout carries only the report.
///
/// Set `LOG_FORMAT=json` for structured JSON output.
fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let directive = format!("failure_cluster={}", level);
    let filter = EnvFilter::from_default_env().add_directive(directive.parse()?);

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .init();
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let format: OutputFormat = cli.format.parse()?;

    let file_config = match &cli.config {
        Some(path) => FileConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FileConfig::load()
            .context("Failed to load config")?
            .unwrap_or_default(),
    };

    // CLI flags override the [clustering] section
    let mut params = file_config.clustering.clone();
    if let Some(threshold) = cli.threshold {
        params.threshold = threshold;
    }
    if let Some(min_cluster_size) = cli.min_cluster_size {
        params.min_cluster_size = min_cluster_size;
    }
    if let Some(sort_by) = cli.sort_by {
        params.sort_by = sort_by;
    }
    if let Some(skip) = cli.skip {
        params.skip = skip;
    }
    if cli.limit.is_some() {
        params.limit = cli.limit;
    }
    params.validate()?;

    let engine = file_config.build_engine()?;
    let records = read_records(&cli.input)?;
    tracing::debug!(records = records.len(), input = %cli.input, "Loaded failure records");

    let report = engine.cluster(&records, &params);

    let reporter = Reporter::new(format).with_members(cli.members);
    println!("{}", reporter.render(&report));

    Ok(())
}

fn read_records(input: &str) -> Result<Vec<FailureRecord>> {
    let content = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        let path = Path::new(input);
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };

    let records: Vec<FailureRecord> =
        serde_json::from_str(&content).context("Input is not a JSON array of failure records")?;
    Ok(records)
}
