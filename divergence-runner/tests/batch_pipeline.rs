//! End-to-end batch runs over a Parquet cache seeded with synthetic series.

use chrono::NaiveDate;
use divergence_core::data::{DataSource, ParquetCache, ParquetScoreStore, ScoreStore};
use divergence_core::domain::{FindingCategory, Metric};
use divergence_core::{NormalizationConfig, Normalizer};
use divergence_runner::{
    generate_series, load_manifest, run_batch, save_artifacts, write_synthetic, CacheLoader,
    PipelineConfig, RunManifest, SyntheticRange,
};

fn range() -> SyntheticRange {
    SyntheticRange {
        start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        end: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
    }
}

fn seed_cache(cache: &ParquetCache, symbols: &[&str]) {
    for symbol in symbols {
        let set = generate_series(symbol, range().start, range().end);
        for metric in Metric::ALL {
            cache
                .write(symbol, metric, set.get(metric), DataSource::Synthetic)
                .unwrap();
        }
    }
}

fn symbols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn batch_over_cache_persists_scores() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ParquetCache::new(dir.path().join("cache"));
    seed_cache(&cache, &["SPY", "GME"]);

    let normalizer = Normalizer::new(NormalizationConfig::default()).unwrap();
    let loader = CacheLoader::new(cache);
    let store = ParquetScoreStore::new(dir.path().join("scores"));

    let summary = run_batch(&symbols(&["SPY", "GME"]), &normalizer, &loader, &store);
    assert!(summary.is_success());
    assert_eq!(summary.succeeded(), 2);

    for run in &summary.runs {
        // a year of daily rows, Jan 1 .. Dec 31
        assert_eq!(run.rows.len(), 365);
        assert_eq!(store.load(&run.symbol).unwrap(), run.rows);
        assert!(run.rows.iter().any(|r| r.price.value().is_some()));
        assert!(run.rows.iter().any(|r| r.search.value().is_some()));
        assert_eq!(run.series.len(), 3);
    }
}

#[test]
fn rerun_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ParquetCache::new(dir.path().join("cache"));
    seed_cache(&cache, &["TSLA"]);

    let normalizer = Normalizer::new(NormalizationConfig::default()).unwrap();
    let loader = CacheLoader::new(cache);
    let store = ParquetScoreStore::new(dir.path().join("scores"));
    let batch = symbols(&["TSLA"]);

    let first = run_batch(&batch, &normalizer, &loader, &store);
    let stored_once = store.load("TSLA").unwrap();
    let second = run_batch(&batch, &normalizer, &loader, &store);

    assert_eq!(first.runs[0].rows, second.runs[0].rows);
    assert_eq!(first.runs[0].dataset_hash, second.runs[0].dataset_hash);
    assert_eq!(store.load("TSLA").unwrap(), stored_once);
}

#[test]
fn missing_symbol_fails_alone() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ParquetCache::new(dir.path().join("cache"));
    seed_cache(&cache, &["SPY"]);

    let normalizer = Normalizer::new(NormalizationConfig::default()).unwrap();
    let loader = CacheLoader::new(cache);
    let store = ParquetScoreStore::new(dir.path().join("scores"));

    let summary = run_batch(&symbols(&["SPY", "NOPE"]), &normalizer, &loader, &store);
    assert_eq!(summary.succeeded(), 1);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].symbol, "NOPE");
    assert!(store.load("NOPE").unwrap().is_empty());
}

#[test]
fn synthetic_fallback_writes_tagged_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::default();
    let normalizer = Normalizer::new(config.normalization.clone()).unwrap();
    let loader = CacheLoader::new(ParquetCache::new(dir.path().join("cache"))).with_synthetic(range());
    let store = ParquetScoreStore::new(dir.path().join("scores"));

    let summary = run_batch(&symbols(&["AMC"]), &normalizer, &loader, &store);
    let run = &summary.runs[0];
    let manifest = RunManifest::new(run, &config.config_hash(), loader.source_of("AMC"));
    let run_dir = save_artifacts(run, &manifest, &dir.path().join("output")).unwrap();

    let loaded = load_manifest(&run_dir).unwrap();
    assert!(loaded.is_synthetic());
    assert_eq!(loaded.row_count, run.rows.len());
    assert_eq!(loaded.config_hash, config.config_hash());

    let csv = std::fs::read_to_string(run_dir.join("scores.csv")).unwrap();
    assert_eq!(csv.lines().count(), run.rows.len() + 1);
}

#[test]
fn generated_cache_yields_synthetic_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ParquetCache::new(dir.path().join("cache"));
    write_synthetic(&cache, &symbols(&["SPY"]), range().start, range().end).unwrap();

    let config = PipelineConfig::default();
    let normalizer = Normalizer::new(config.normalization.clone()).unwrap();
    let loader = CacheLoader::new(cache);
    let store = ParquetScoreStore::new(dir.path().join("scores"));

    let summary = run_batch(&symbols(&["SPY"]), &normalizer, &loader, &store);
    let run = &summary.runs[0];
    let manifest = RunManifest::new(run, &config.config_hash(), loader.source_of("SPY"));
    assert_eq!(manifest.source, Some(DataSource::Synthetic));

    let run_dir = save_artifacts(run, &manifest, &dir.path().join("output")).unwrap();
    assert!(load_manifest(&run_dir).unwrap().is_synthetic());
}

#[test]
fn validator_flags_gaps_in_cached_prices() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ParquetCache::new(dir.path().join("cache"));
    let mut set = generate_series("QQQ", range().start, range().end);
    // drop a business week of prices
    set.price.drain(40..45);
    cache.write("QQQ", Metric::Price, &set.price, DataSource::CsvImport).unwrap();

    let normalizer = Normalizer::new(NormalizationConfig::default()).unwrap();
    let loader = CacheLoader::new(cache);
    let store = ParquetScoreStore::new(dir.path().join("scores"));

    let summary = run_batch(&symbols(&["QQQ"]), &normalizer, &loader, &store);
    let findings = &summary.runs[0].findings;
    assert!(findings
        .iter()
        .any(|f| f.category == FindingCategory::DataGaps && f.metric == Some(Metric::Price)));
    assert!(findings
        .iter()
        .any(|f| f.category == FindingCategory::MissingData && f.metric == Some(Metric::Search)));
}
