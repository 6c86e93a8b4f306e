//! Synthetic raw series for development and demos.
//!
//! Deterministic per symbol: the RNG is seeded from the BLAKE3 hash of the
//! symbol, so the same symbol and date range always produce the same data.
//! Results produced on synthetic data are tagged as such.
//!
//! - Price: business-day geometric random walk with occasional news jumps
//! - Search: weekly interest index in [0, 100] with rare spikes
//! - Holdings: quarter-end institutional ownership percent

use chrono::{Datelike, Days, NaiveDate, Weekday};
use divergence_core::data::{DataError, DataSource, ParquetCache, SeriesMeta};
use divergence_core::domain::{Metric, RawObservation, SeriesSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Per-symbol character of the generated data.
#[derive(Debug, Clone, Copy)]
struct Profile {
    base_price: f64,
    volatility: f64,
    drift: f64,
    retail_interest: f64,
    ownership: f64,
}

impl Profile {
    fn sample(rng: &mut StdRng) -> Self {
        Self {
            base_price: rng.gen_range(20.0..500.0),
            volatility: rng.gen_range(0.01..0.05),
            drift: rng.gen_range(-0.0002..0.0003),
            retail_interest: rng.gen_range(0.4..0.95),
            ownership: rng.gen_range(5.0..25.0),
        }
    }
}

fn rng_for(symbol: &str) -> StdRng {
    let seed_bytes = blake3::hash(symbol.as_bytes());
    StdRng::from_seed(*seed_bytes.as_bytes())
}

/// Standard normal draw (Box-Muller).
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Generate all three raw series for a symbol over `[start, end]`.
pub fn generate_series(symbol: &str, start: NaiveDate, end: NaiveDate) -> SeriesSet {
    let mut rng = rng_for(symbol);
    let profile = Profile::sample(&mut rng);
    SeriesSet {
        price: generate_prices(&mut rng, &profile, start, end),
        holdings: generate_holdings(&mut rng, &profile, start, end),
        search: generate_search(&mut rng, &profile, start, end),
    }
}

fn generate_prices(rng: &mut StdRng, profile: &Profile, start: NaiveDate, end: NaiveDate) -> Vec<RawObservation> {
    let mut prices = Vec::new();
    let mut price = profile.base_price;
    let mut day = start;
    while day <= end {
        if is_business_day(day) {
            let mut ret = profile.drift + profile.volatility * standard_normal(rng);
            // news event
            if rng.gen_bool(0.02) {
                ret += rng.gen_range(-0.05..0.08);
            }
            price = (price * (1.0 + ret)).max(0.01);
            prices.push(RawObservation::new(day, price));
        }
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    prices
}

fn generate_search(rng: &mut StdRng, profile: &Profile, start: NaiveDate, end: NaiveDate) -> Vec<RawObservation> {
    let base = 50.0 * profile.retail_interest;
    // weekly points fall on Sundays
    let offset = (7 - start.weekday().num_days_from_sunday()) % 7;
    let mut search = Vec::new();
    let mut day = start.checked_add_days(Days::new(u64::from(offset)));
    while let Some(d) = day.filter(|d| *d <= end) {
        let mut interest = base + rng.gen_range(-10.0..=10.0_f64);
        if rng.gen_bool(0.05) {
            interest *= rng.gen_range(2.0..5.0);
        }
        search.push(RawObservation::new(d, interest.round().clamp(0.0, 100.0)));
        day = d.checked_add_days(Days::new(7));
    }
    search
}

/// Last calendar day of each calendar quarter within `[start, end]`.
pub fn quarter_ends(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    (start.year()..=end.year())
        .flat_map(|year| {
            [(year, 4), (year, 7), (year, 10), (year + 1, 1)]
                .into_iter()
                .filter_map(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1)?.pred_opt())
        })
        .filter(|d| *d >= start && *d <= end)
        .collect()
}

fn generate_holdings(rng: &mut StdRng, profile: &Profile, start: NaiveDate, end: NaiveDate) -> Vec<RawObservation> {
    let mut ownership = profile.ownership;
    quarter_ends(start, end)
        .into_iter()
        .map(|date| {
            ownership = (ownership + rng.gen_range(-1.5..1.5)).clamp(0.0, 100.0);
            RawObservation::new(date, ownership)
        })
        .collect()
}

/// What `write_synthetic` put into the cache for one symbol.
#[derive(Debug, Clone)]
pub struct GeneratedSymbol {
    pub symbol: String,
    pub written: Vec<SeriesMeta>,
    /// Metrics with no observation in the range (e.g. no quarter end).
    pub skipped: Vec<Metric>,
}

/// Generate series for `symbols` and write every non-empty one to the cache,
/// tagged [`DataSource::Synthetic`].
pub fn write_synthetic(
    cache: &ParquetCache,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<GeneratedSymbol>, DataError> {
    let mut generated = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let series = generate_series(symbol, start, end);
        let mut result = GeneratedSymbol {
            symbol: symbol.clone(),
            written: Vec::new(),
            skipped: Vec::new(),
        };
        for metric in Metric::ALL {
            let observations = series.get(metric);
            if observations.is_empty() {
                tracing::debug!(symbol = %symbol, %metric, "no synthetic observations in range");
                result.skipped.push(metric);
                continue;
            }
            result
                .written
                .push(cache.write(symbol, metric, observations, DataSource::Synthetic)?);
        }
        generated.push(result);
    }
    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn deterministic_per_symbol() {
        let a = generate_series("SPY", d(2023, 1, 1), d(2023, 12, 31));
        let b = generate_series("SPY", d(2023, 1, 1), d(2023, 12, 31));
        let c = generate_series("QQQ", d(2023, 1, 1), d(2023, 12, 31));
        assert_eq!(a, b);
        assert_ne!(a.price, c.price);
    }

    #[test]
    fn cadences_and_ranges() {
        let set = generate_series("TSLA", d(2023, 1, 1), d(2023, 12, 31));

        assert!(set.price.iter().all(|o| is_business_day(o.date) && o.value > 0.0));
        assert!(set.price.len() > 250);

        assert!(set.search.iter().all(|o| o.date.weekday() == Weekday::Sun));
        assert!(set.search.iter().all(|o| (0.0..=100.0).contains(&o.value)));
        assert_eq!(set.search.len(), 53); // 2023 has 53 Sundays

        assert_eq!(
            set.holdings.iter().map(|o| o.date).collect::<Vec<_>>(),
            vec![d(2023, 3, 31), d(2023, 6, 30), d(2023, 9, 30), d(2023, 12, 31)]
        );
        assert!(set.holdings.iter().all(|o| (0.0..=100.0).contains(&o.value)));
    }

    #[test]
    fn short_range_skips_empty_holdings() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let symbols = vec!["SPY".to_string()];

        let generated = write_synthetic(&cache, &symbols, d(2024, 1, 1), d(2024, 2, 15)).unwrap();
        assert_eq!(generated[0].skipped, vec![Metric::Holdings]);
        assert_eq!(generated[0].written.len(), 2);
        assert!(cache.get_meta("SPY", Metric::Holdings).is_none());
        let price = cache.get_meta("SPY", Metric::Price).unwrap();
        assert_eq!(price.source, DataSource::Synthetic);
        assert_eq!(price.count, 34);
    }

    #[test]
    fn quarter_ends_respect_range() {
        assert_eq!(quarter_ends(d(2024, 4, 1), d(2024, 9, 29)), vec![d(2024, 6, 30)]);
        assert!(quarter_ends(d(2024, 1, 1), d(2024, 3, 30)).is_empty());
    }
}
