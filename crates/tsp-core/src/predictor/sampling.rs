//! Random draws used by the simulation.

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use tsp_common::{Error, Result, State, Stats};

/// Draw a next state from integer percentage weights.
pub fn sample_state<R: Rng>(rng: &mut R, probs: &[u32]) -> Result<State> {
    let dist = WeightedIndex::new(probs)
        .map_err(|e| Error::EmptyDistribution(format!("{:?}: {}", probs, e)))?;
    Ok(dist.sample(rng))
}

/// Turn a discrete state back into a value inside its bucket.
///
/// `value = min + state * size + noise` with `size = round((max - min) /
/// states)` and `noise = uniform(0..size) * stddev / max`. The noise is zero
/// when a bucket is narrower than one unit or `max` is zero.
pub fn reconstruct_value<R: Rng>(rng: &mut R, state: State, states: usize, stats: &Stats) -> f64 {
    if states == 0 {
        return stats.min;
    }
    let size = ((stats.max - stats.min) / states as f64).round();
    let noise = if size < 1.0 || stats.max == 0.0 {
        0.0
    } else {
        rng.random_range(0..size as u64) as f64 * stats.stddev / stats.max
    };
    stats.min + state as f64 * size + noise
}
