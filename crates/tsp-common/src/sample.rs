//! Input samples fed into the profiler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One named value inside a sample, optionally carrying fixed bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMetric {
    pub name: String,
    pub value: f64,
    #[serde(rename = "fixedmin", default, skip_serializing_if = "Option::is_none")]
    pub fixed_min: Option<f64>,
    #[serde(rename = "fixedmax", default, skip_serializing_if = "Option::is_none")]
    pub fixed_max: Option<f64>,
}

impl SampleMetric {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            fixed_min: None,
            fixed_max: None,
        }
    }

    /// A value whose buffer range is pinned to `[min, max]`.
    pub fn bounded(name: impl Into<String>, value: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            value,
            fixed_min: Some(min),
            fixed_max: Some(max),
        }
    }

    /// Fixed bounds, only when both ends are present.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match (self.fixed_min, self.fixed_max) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }
}

/// One timestamped multi-metric observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metrics: Vec<SampleMetric>,
}

impl Sample {
    /// An empty sample stamped with the current time.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            metrics: Vec::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.push(SampleMetric::new(name, value));
        self
    }

    pub fn with_bounded_metric(
        mut self,
        name: impl Into<String>,
        value: f64,
        min: f64,
        max: f64,
    ) -> Self {
        self.metrics.push(SampleMetric::bounded(name, value, min, max));
        self
    }

    pub fn push(&mut self, metric: SampleMetric) {
        self.metrics.push(metric);
    }

    pub fn get(&self, name: &str) -> Option<&SampleMetric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl Default for Sample {
    fn default() -> Self {
        Self::new()
    }
}
