//! Divergence CLI: import, generate, normalize and cache commands.
//!
//! Commands:
//! - `import`: read a `date,value` CSV into the Parquet cache
//! - `generate`: write deterministic synthetic series into the cache
//! - `normalize`: standardize and merge symbols, store scores, write artifacts
//! - `cache status`: list cached series per symbol and metric

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use divergence_core::data::{import_csv, DataSource, ParquetCache, ParquetScoreStore};
use divergence_core::domain::Metric;
use divergence_core::Normalizer;
use divergence_runner::{
    run_batch, save_artifacts, write_synthetic, BatchSummary, CacheLoader, PipelineConfig,
    RunManifest,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "divergence",
    about = "Divergence CLI: normalize price, holdings and search series onto one daily table"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a `date,value` CSV for one symbol and metric into the cache.
    Import {
        /// Symbol the series belongs to.
        #[arg(long)]
        symbol: String,

        /// Metric: price, holdings or search.
        #[arg(long)]
        metric: Metric,

        /// Path to the CSV file.
        csv: PathBuf,

        /// Cache directory.
        #[arg(long, default_value = "data/cache")]
        cache_dir: PathBuf,
    },
    /// Generate synthetic series for symbols and write them into the cache.
    Generate {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD).
        #[arg(long, default_value = "2023-01-01")]
        start: String,

        /// End date (YYYY-MM-DD).
        #[arg(long, default_value = "2024-12-31")]
        end: String,

        /// Cache directory.
        #[arg(long, default_value = "data/cache")]
        cache_dir: PathBuf,
    },
    /// Normalize symbols, store merged scores and write run artifacts.
    Normalize {
        /// Symbols to normalize. Defaults to the config's symbols, then to every cached symbol.
        symbols: Vec<String>,

        /// Path to a pipeline TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Generate synthetic series for symbols with nothing cached.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached series with date ranges and counts.
    Status {
        /// Only these symbols. Defaults to every cached symbol.
        symbols: Vec<String>,

        /// Cache directory.
        #[arg(long, default_value = "data/cache")]
        cache_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import {
            symbol,
            metric,
            csv,
            cache_dir,
        } => run_import(&symbol, metric, &csv, &cache_dir),
        Commands::Generate {
            symbols,
            start,
            end,
            cache_dir,
        } => run_generate(&symbols, &start, &end, &cache_dir),
        Commands::Normalize {
            symbols,
            config,
            synthetic,
        } => run_normalize(symbols, config.as_deref(), synthetic),
        Commands::Cache { action } => match action {
            CacheAction::Status { symbols, cache_dir } => run_cache_status(&symbols, &cache_dir),
        },
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn run_import(symbol: &str, metric: Metric, csv: &Path, cache_dir: &Path) -> Result<()> {
    let observations =
        import_csv(csv).with_context(|| format!("failed to import {}", csv.display()))?;
    if observations.is_empty() {
        bail!("{} contains no rows", csv.display());
    }

    let cache = ParquetCache::new(cache_dir);
    let meta = cache.write(symbol, metric, &observations, DataSource::CsvImport)?;
    println!(
        "Imported {} {} observations for {} ({} to {})",
        meta.count, meta.metric, meta.symbol, meta.start_date, meta.end_date
    );
    Ok(())
}

fn run_generate(symbols: &[String], start: &str, end: &str, cache_dir: &Path) -> Result<()> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    if start > end {
        bail!("start {start} is after end {end}");
    }

    let cache = ParquetCache::new(cache_dir);
    for generated in write_synthetic(&cache, symbols, start, end)? {
        let counts: Vec<String> = generated
            .written
            .iter()
            .map(|meta| format!("{} {}", meta.count, meta.metric))
            .collect();
        println!("{}: {} observations (synthetic)", generated.symbol, counts.join(", "));
        for metric in &generated.skipped {
            println!("  note: no {metric} observations between {start} and {end}; not cached");
        }
    }
    Ok(())
}

fn run_normalize(symbols: Vec<String>, config_path: Option<&Path>, synthetic: bool) -> Result<()> {
    let config = match config_path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    let cache = ParquetCache::new(&config.data_dir);
    let symbols = if !symbols.is_empty() {
        symbols
    } else if !config.symbols.is_empty() {
        config.symbols.clone()
    } else {
        cache.symbols()
    };
    if symbols.is_empty() {
        bail!("no symbols given and the cache at {} is empty", config.data_dir.display());
    }
    tracing::debug!(
        symbols = symbols.len(),
        data_dir = %config.data_dir.display(),
        synthetic,
        "resolved symbols"
    );

    let normalizer = Normalizer::new(config.normalization.clone())?;
    let mut loader = CacheLoader::new(cache);
    if synthetic {
        loader = loader.with_synthetic(config.synthetic);
    }
    let store = ParquetScoreStore::new(config.output_dir.join("scores"));

    let summary = run_batch(&symbols, &normalizer, &loader, &store);

    let config_hash = config.config_hash();
    let runs_dir = config.output_dir.join("runs");
    for run in &summary.runs {
        let manifest = RunManifest::new(run, &config_hash, loader.source_of(&run.symbol));
        save_artifacts(run, &manifest, &runs_dir)?;
    }

    print_summary(&summary, &runs_dir);

    if !summary.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(summary: &BatchSummary, runs_dir: &Path) {
    println!();
    println!("=== Normalization ===");
    println!("Symbols:        {} ok, {} failed", summary.succeeded(), summary.failed.len());
    println!("Rows:           {}", summary.total_rows());
    println!();
    println!("{:<8} {:<25} {:>6} {:>9}", "Symbol", "Date Range", "Rows", "Findings");
    println!("{}", "-".repeat(51));
    for run in &summary.runs {
        let range = run
            .date_range()
            .map(|(start, end)| format!("{start} to {end}"))
            .unwrap_or_else(|| "(empty)".into());
        println!(
            "{:<8} {:<25} {:>6} {:>9}",
            run.symbol,
            range,
            run.rows.len(),
            run.findings.len()
        );
    }
    println!();
    print!("{}", summary.findings().render());
    for failed in &summary.failed {
        println!("FAILED: {} ({})", failed.symbol, failed.reason);
    }
    if !summary.runs.is_empty() {
        println!();
        println!("Artifacts saved to: {}", runs_dir.display());
    }
    println!();
}

fn run_cache_status(symbols: &[String], cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = ParquetCache::new(cache_dir);
    let symbols = if symbols.is_empty() {
        cache.symbols()
    } else {
        symbols.to_vec()
    };
    if symbols.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let sym_refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", symbols.len());
    println!();
    println!(
        "{:<8} {:<9} {:<25} {:>6} {:<10}",
        "Symbol", "Metric", "Date Range", "Count", "Source"
    );
    println!("{}", "-".repeat(62));
    for status in cache.status(&sym_refs) {
        let (range, count, source) = match (status.start_date, status.end_date) {
            (Some(start), Some(end)) if status.cached => (
                format!("{start} to {end}"),
                status.count.unwrap_or(0).to_string(),
                status.source.map(|s| s.as_str()).unwrap_or("-"),
            ),
            _ => ("(not cached)".to_string(), "-".to_string(), "-"),
        };
        println!(
            "{:<8} {:<9} {:<25} {:>6} {:<10}",
            status.symbol, status.metric, range, count, source
        );
    }
    Ok(())
}
