//! bmperf CLI application
//!
//! Measures every compiled bmodel of an artifact tree and writes the results
//! to `<outdir>/stats.csv`.

use std::time::Instant;

use anyhow::{Context, Result};
use bmperf_cli::cli::{Cli, LogFormat};
use bmperf_cli::exit::{EXIT_FAILURE, EXIT_SUCCESS};
use bmperf_device::BenchmarkLibrary;
use bmperf_runner::{BuildTree, CsvReport, Orchestrator, REPORT_FILE, RowSink, run_all};
use bmperf_stats::format_seconds;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::time::uptime;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(&cli.log_level, cli.log_format) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(EXIT_FAILURE);
    }

    if let Err(e) = run(&cli) {
        error!("Command failed: {}", e);

        let mut source = e.source();
        while let Some(err) = source {
            error!("  Caused by: {}", err);
            source = err.source();
        }

        std::process::exit(EXIT_FAILURE);
    }

    std::process::exit(EXIT_SUCCESS);
}

fn run(cli: &Cli) -> Result<()> {
    let start = Instant::now();

    BuildTree::check(&cli.root)
        .with_context(|| format!("{} is not an artifact tree", cli.root.display()))?;
    let tree = BuildTree::load(&cli.root, &cli.overrides())
        .context("failed to load global configuration")?;

    let entries = tree
        .walk(&cli.models)
        .context("failed to walk artifact tree")?;
    if entries.is_empty() {
        warn!(
            "no model configuration found under {}",
            tree.root().display()
        );
    }

    let discovery = cli.discovery();
    let schema = cli.report_schema(&discovery.extra_headers(&entries));

    let library = match BenchmarkLibrary::open(&tree.global().benchmark_lib) {
        Ok(lib) => Some(lib),
        Err(e) => {
            warn!("{e}; measurements without reference data will be skipped");
            None
        }
    };

    let mut orchestrator = Orchestrator::new(&tree, &schema, cli.run_options());
    if let Some(lib) = &library {
        orchestrator = orchestrator.with_provider(lib);
    }

    let report_path = tree.global().outdir.join(REPORT_FILE);
    let mut report = CsvReport::create(report_path).context("failed to create report")?;
    report
        .write_header(&schema.header())
        .context("failed to write report header")?;

    run_all(&tree, &entries, discovery, &orchestrator, &mut report)?;

    info!(
        "{} rows written to {}",
        report.rows(),
        report.path().display()
    );
    info!("Total time: {}", format_seconds(start.elapsed().as_secs()));
    Ok(())
}

/// Install the global subscriber; `RUST_LOG` wins over `level`.
fn setup_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => subscriber.json().with_timer(uptime()).try_init(),
        LogFormat::Compact => subscriber.compact().try_init(),
        LogFormat::Pretty => subscriber.pretty().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("{e}"))
}
