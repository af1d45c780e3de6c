//! Per-metric summary statistics with incremental combination.

use serde::{Deserialize, Serialize};
use tsp_math::{mean, population_stddev, sum_squared_deviations, weighted_mean};

/// Running statistics of one metric.
///
/// `stddev_sum` is the accumulated second moment Σ(v - avg)²; `stddev` is
/// always `sqrt(stddev_sum / count)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: f64,
    #[serde(default)]
    pub stddev: f64,
    #[serde(default)]
    pub avg: f64,
    #[serde(default)]
    pub count: u64,
    #[serde(rename = "stddevsum", default)]
    pub stddev_sum: f64,
}

impl Stats {
    /// Statistics of a batch of raw values within the given bounds.
    pub fn from_values(values: &[f64], min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            stddev: population_stddev(values),
            avg: mean(values),
            count: values.len() as u64,
            stddev_sum: sum_squared_deviations(values),
        }
    }

    /// Whether no observation has been merged yet.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether `incoming` reaches outside the recorded `[min, max]`.
    ///
    /// Always false for empty statistics: the first batch defines the range.
    pub fn is_widened_by(&self, incoming: &Stats) -> bool {
        !self.is_empty() && (incoming.min < self.min || incoming.max > self.max)
    }

    /// Widen `[min, max]` to include the incoming range.
    pub fn widen_range(&mut self, incoming: &Stats) {
        if self.is_empty() {
            self.min = incoming.min;
            self.max = incoming.max;
            return;
        }
        self.min = self.min.min(incoming.min);
        self.max = self.max.max(incoming.max);
    }

    /// Merge a batch into the running statistics.
    ///
    /// The mean is the count-weighted mean and the second moment grows by
    /// Σ(v - old_avg)(v - new_avg) over the batch values, computed from the
    /// batch's own moments so the raw values are not needed.
    pub fn merge(&mut self, incoming: &Stats) {
        self.widen_range(incoming);
        if incoming.count == 0 {
            return;
        }

        let old_avg = self.avg;
        let n_old = self.count as f64;
        let n_new = incoming.count as f64;
        let new_avg = weighted_mean(&[old_avg, incoming.avg], &[n_old, n_new]);

        self.stddev_sum += incoming.stddev_sum
            + n_new * (incoming.avg - old_avg) * (incoming.avg - new_avg);
        self.count += incoming.count;
        self.avg = new_avg;
        self.stddev = (self.stddev_sum.max(0.0) / self.count as f64).sqrt();
    }
}
