//! tablematch - turn a list of show descriptors into per-show JSON records
//! built from Cagematch event pages.

mod compose;
mod config;
mod descriptor;
mod error;
mod extractor;
mod fetch;
mod names;
mod output;
mod resolver;
mod schema;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use config::FetchConfig;
use descriptor::Descriptor;
use error::ResolveError;
use fetch::{CachingFetcher, Fetcher, HttpFetcher, PageCache};
use resolver::Resolver;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse FILENAME, writing JSON representations of the shows into folder
/// DESTINATION, which is created if it does not exist. Existing files are
/// overwritten if they clash.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// YAML list of show descriptors.
    filename: PathBuf,

    /// Output directory.
    destination: PathBuf,

    /// Log level, used when RUST_LOG is not set.
    #[arg(long, default_value = "warn")]
    loglevel: tracing::Level,

    /// Log entries that fail to resolve and carry on instead of stopping at
    /// the first one. Invalid descriptors are always skipped.
    #[arg(long)]
    keep_going: bool,

    /// Do not read or write the on-disk page cache.
    #[arg(long)]
    no_cache: bool,

    /// Directory for the on-disk page cache.
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.loglevel.as_str().to_ascii_lowercase().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = FetchConfig::from_env().with_cache(cli.cache_dir.clone(), cli.no_cache);
    let cache = match &config.cache_dir {
        Some(dir) => PageCache::with_dir(dir),
        None => PageCache::new(),
    };
    let fetcher = CachingFetcher::new(HttpFetcher::new(config)?, cache);
    let resolver = Resolver::new(fetcher)?;

    let text = std::fs::read_to_string(&cli.filename)
        .with_context(|| format!("Failed to read descriptors: {:?}", cli.filename))?;
    let entries = descriptor::load_batch(&text)
        .with_context(|| format!("Failed to parse descriptors: {:?}", cli.filename))?;
    let total = entries.len();
    info!("Loaded {} descriptors from {:?}", total, cli.filename);

    let report = run_batch(&resolver, entries, &cli.destination, cli.keep_going).await?;
    info!("Wrote {} of {} shows", report.written.len(), total);
    if report.failures > 0 {
        anyhow::bail!("{} of {} entries failed", report.failures, total);
    }
    Ok(())
}

#[derive(Debug, Default)]
struct BatchReport {
    written: Vec<PathBuf>,
    failures: usize,
}

/// Resolve and write every entry in order. Invalid descriptors are logged
/// and skipped; any other failure aborts the batch unless `keep_going`.
async fn run_batch<F: Fetcher>(
    resolver: &Resolver<F>,
    entries: Vec<serde_yaml::Value>,
    destination: &Path,
    keep_going: bool,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    for (idx, entry) in entries.into_iter().enumerate() {
        let position = idx + 1;
        match process_entry(resolver, entry, destination).await {
            Ok(path) => {
                info!("Entry {}: wrote {:?}", position, path);
                report.written.push(path);
            }
            Err(e) if keep_going || is_invalid_descriptor(&e) => {
                error!("Entry {} failed: {:#}", position, e);
                report.failures += 1;
            }
            Err(e) => return Err(e.context(format!("Entry {} failed", position))),
        }
    }
    Ok(report)
}

fn is_invalid_descriptor(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<ResolveError>(),
        Some(ResolveError::InvalidDescriptor(_))
    )
}

/// Resolve one batch entry and write its record.
async fn process_entry<F: Fetcher>(
    resolver: &Resolver<F>,
    entry: serde_yaml::Value,
    destination: &Path,
) -> Result<PathBuf> {
    let descriptor = Descriptor::try_from(entry)?;
    let show = resolver.resolve(&descriptor).await?;
    output::write_show(destination, &show)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::tests::{sample_page, SHOW_URL};
    use crate::fetch::tests::StubFetcher;

    const MISSING_URL: &str = "https://www.cagematch.net/?id=1&nr=4";

    fn resolver() -> Resolver<StubFetcher> {
        Resolver::new(StubFetcher::default().with_page(SHOW_URL, sample_page())).unwrap()
    }

    fn entries(yaml: &str) -> Vec<serde_yaml::Value> {
        descriptor::load_batch(yaml).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_descriptor_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let batch = entries(&format!("- 42\n- \"{SHOW_URL}\"\n"));

        let report = run_batch(&resolver(), batch, dir.path(), false).await.unwrap();
        assert_eq!(report.failures, 1);
        assert_eq!(report.written, vec![dir.path().join("300001.json")]);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let batch = entries(&format!("- \"{MISSING_URL}\"\n- \"{SHOW_URL}\"\n"));

        let err = run_batch(&resolver(), batch, dir.path(), false).await.unwrap_err();
        assert!(format!("{err:#}").contains("Entry 1 failed"));
        assert!(!dir.path().join("300001.json").exists());
    }

    #[tokio::test]
    async fn test_keep_going_counts_every_failure() {
        let dir = tempfile::tempdir().unwrap();
        let batch = entries(&format!(
            "- \"{MISSING_URL}\"\n- partial: 7\n- \"{SHOW_URL}\"\n"
        ));

        let report = run_batch(&resolver(), batch, dir.path(), true).await.unwrap();
        assert_eq!(report.failures, 2);
        assert_eq!(report.written.len(), 1);
    }
}
