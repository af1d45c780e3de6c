//! Streaming-friendly summary statistics.

/// Arithmetic mean. Returns 0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sum of squared deviations from the mean, Σ(v - mean)².
pub fn sum_squared_deviations(values: &[f64]) -> f64 {
    let avg = mean(values);
    values.iter().map(|v| (v - avg) * (v - avg)).sum()
}

/// Population standard deviation. Returns 0 for empty input.
pub fn population_stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (sum_squared_deviations(values) / values.len() as f64).sqrt()
}

/// Weighted mean of `values` with non-negative `weights`.
///
/// Returns 0 when the total weight is zero or the slices differ in length.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    if values.len() != weights.len() {
        return 0.0;
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    values
        .iter()
        .zip(weights)
        .map(|(v, w)| v * w)
        .sum::<f64>()
        / total
}

/// Whether `value` lies `filter_std_devs` or more standard deviations away
/// from `avg`.
///
/// Disabled (always false) when `avg` is zero (no statistics yet) or
/// `filter_std_devs` is not positive.
pub fn is_outlier(value: f64, avg: f64, stddev: f64, filter_std_devs: f64) -> bool {
    if avg == 0.0 || filter_std_devs <= 0.0 {
        return false;
    }
    (value - avg).abs() >= filter_std_devs * stddev
}

/// Integer percentage of `part` over `whole`, rounded half away from zero.
pub fn percent(part: f64, whole: f64) -> u32 {
    if whole <= 0.0 || !part.is_finite() {
        return 0;
    }
    let p = (part / whole * 100.0).round();
    if p <= 0.0 {
        0
    } else {
        p as u32
    }
}

/// Normalise a row of counts into integer percentages.
///
/// Each cell is rounded half away from zero; the rounding residual is then
/// applied to the largest cell so that a non-empty row sums to exactly 100.
/// An all-zero row yields all zeros.
pub fn percentages(row: &[u64]) -> Vec<u32> {
    let sum: u64 = row.iter().sum();
    if sum == 0 {
        return vec![0; row.len()];
    }
    let mut out: Vec<u32> = row
        .iter()
        .map(|&c| percent(c as f64, sum as f64))
        .collect();

    let total: i64 = out.iter().map(|&p| p as i64).sum();
    let residual = 100 - total;
    if residual != 0 {
        if let Some((idx, _)) = row.iter().enumerate().max_by_key(|(_, &c)| c) {
            let adjusted = out[idx] as i64 + residual;
            out[idx] = adjusted.max(0) as u32;
        }
    }
    out
}
