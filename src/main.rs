//! bundle-harvester - tabulate the package imports and exports of OSGi bundles.

use anyhow::Context;
use bundle_harvester::harvest::{FailurePolicy, HarvestPipeline, JarReader};
use bundle_harvester::report::{ReportFormat, TabularReporter};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bundle-harvester")]
#[command(
    author,
    version,
    about = "Scan a directory of OSGi bundles and write one row per package import or export"
)]
struct Cli {
    /// Directory scanned recursively for *.jar bundles
    #[arg(default_value = ".")]
    modules_dir: PathBuf,

    /// Report file; parent directories are created
    #[arg(default_value = "osgi.csv")]
    out_path: PathBuf,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Tsv)]
    format: ReportFormat,

    /// Number of bundles harvested at once
    #[arg(long, default_value = "4")]
    concurrency: usize,

    /// Per-bundle read timeout in seconds
    #[arg(long, default_value = "300")]
    timeout: u64,

    /// Skip bundles with malformed manifests instead of failing
    #[arg(long)]
    skip_malformed: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let policy = if cli.skip_malformed {
        FailurePolicy::Skip
    } else {
        FailurePolicy::Abort
    };

    let result = HarvestPipeline::new(JarReader::new())
        .with_concurrency(cli.concurrency)
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_policy(policy)
        .execute(&cli.modules_dir)
        .await
        .with_context(|| format!("Failed to harvest {}", cli.modules_dir.display()))?;

    let written = TabularReporter::new(cli.format)
        .write_to_path(&result.bundles, &cli.out_path)
        .with_context(|| format!("Failed to write {}", cli.out_path.display()))?;

    info!(
        bundles = result.stats.bundles_harvested,
        scanned = result.stats.jars_scanned,
        "Done"
    );
    eprintln!("Written {}", written.display());
    Ok(())
}
