//! Descriptive statistics over finite samples.
//!
//! Callers filter out missing values first; every function here assumes its
//! input is finite and returns `None` when the sample is too small.

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator). Needs at least two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    // A constant sample is exactly zero; the mean of equal values can round.
    if values.iter().all(|v| *v == values[0]) {
        return Some(0.0);
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (n - 1) as f64).sqrt())
}

/// Median (mean of the two middle values for even-length samples).
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(median_of_sorted(&sorted))
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Median absolute deviation from the median, unscaled. Returns (median, MAD).
pub fn median_abs_deviation(values: &[f64]) -> Option<(f64, f64)> {
    let center = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    let mad = median(&deviations)?;
    Some((center, mad))
}

/// Quantile with linear interpolation between order statistics (rank `p * (n - 1)`).
///
/// `p` is clamped to [0, 1].
pub fn quantile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(quantile_of_sorted(&sorted, p))
}

pub(crate) fn quantile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Adjusted Fisher-Pearson sample skewness (G1). Needs at least three values.
///
/// A sample with zero variance has skewness 0.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    if values.iter().all(|v| *v == values[0]) {
        return Some(0.0);
    }
    let m = mean(values)?;
    let (mut m2, mut m3) = (0.0, 0.0);
    for v in values {
        let d = v - m;
        m2 += d * d;
        m3 += d * d * d;
    }
    if m2 == 0.0 {
        return Some(0.0);
    }
    let n = n as f64;
    Some(n * (n - 1.0).sqrt() / (n - 2.0) * m3 / m2.powf(1.5))
}
