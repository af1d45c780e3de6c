//! Per-cycle sample accumulation.
//!
//! Values arriving between two discretization cycles are collected into one
//! [`MetricBuffer`] per metric. The dynamic range of every metric survives
//! [`Buffer::reset`] so that later cycles are binned against everything seen
//! so far, never against a single batch.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::debug;
use tsp_common::{Sample, Settings};
use tsp_math::is_outlier;

use crate::logging::event_names;

/// Raw values of one metric collected during a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricBuffer {
    pub metric: String,
    pub values: Vec<f64>,
    /// Observed range, including the range carried over from earlier cycles.
    pub min: f64,
    pub max: f64,
    /// Bounds pinned by the sample or by the settings.
    pub fixed: Option<(f64, f64)>,
    /// Values flagged by the outlier predicate during this cycle.
    pub outliers: u64,
    /// Whether `min`/`max` hold an observed range; `(0, 0)` can be one.
    seen: bool,
}

impl MetricBuffer {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            values: Vec::new(),
            min: 0.0,
            max: 0.0,
            fixed: None,
            outliers: 0,
            seen: false,
        }
    }

    fn seeded(metric: &str, seed: Option<(f64, f64)>) -> Self {
        let mut buffer = Self::new(metric);
        if let Some((min, max)) = seed {
            buffer.min = min;
            buffer.max = max;
            buffer.seen = true;
        }
        buffer
    }

    fn has_range(&self) -> bool {
        self.seen
    }

    pub fn append(&mut self, value: f64) {
        if self.seen {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        } else {
            self.min = value;
            self.max = value;
            self.seen = true;
        }
        self.values.push(value);
    }

    /// The range states of this buffer are expressed in.
    pub fn bounds(&self) -> (f64, f64) {
        self.fixed.unwrap_or((self.min, self.max))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Reference {
    avg: f64,
    stddev: f64,
}

#[derive(Debug, Default)]
struct BufferState {
    items: Vec<MetricBuffer>,
    seeds: HashMap<String, (f64, f64)>,
    references: HashMap<String, Reference>,
}

/// Thread-safe collection of the current cycle's metric buffers.
#[derive(Debug)]
pub struct Buffer {
    fixed: Option<(f64, f64)>,
    filter_std_devs: f64,
    filter_outliers: bool,
    state: Mutex<BufferState>,
}

impl Buffer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            fixed: settings.fixed_bounds(),
            filter_std_devs: settings.filter_std_devs,
            filter_outliers: settings.filter_outliers,
            state: Mutex::new(BufferState::default()),
        }
    }

    /// Append every metric of `sample` to its buffer.
    ///
    /// Returns the number of values accepted. With outlier filtering enabled
    /// a value far from the metric's reference average is rejected.
    pub fn add(&self, sample: &Sample) -> usize {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let BufferState {
            items,
            seeds,
            references,
        } = &mut *state;

        let mut accepted = 0;
        for input in &sample.metrics {
            let idx = match items.iter().position(|b| b.metric == input.name) {
                Some(idx) => idx,
                None => {
                    items.push(MetricBuffer::seeded(
                        &input.name,
                        seeds.get(&input.name).copied(),
                    ));
                    items.len() - 1
                }
            };
            let buffer = &mut items[idx];
            buffer.fixed = input.bounds().or(self.fixed);

            let outlier = references
                .get(&input.name)
                .is_some_and(|r| is_outlier(input.value, r.avg, r.stddev, self.filter_std_devs));
            if outlier {
                buffer.outliers += 1;
                debug!(
                    event = event_names::BUFFER_OUTLIER,
                    metric = %input.name,
                    value = input.value,
                    rejected = self.filter_outliers,
                    "outlier observed"
                );
                if self.filter_outliers {
                    continue;
                }
            }

            buffer.append(input.value);
            accepted += 1;
        }
        accepted
    }

    /// Hand out the collected buffers and start a new cycle.
    pub fn reset(&self) -> Vec<MetricBuffer> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let items = std::mem::take(&mut state.items);
        for buffer in items.iter().filter(|b| b.has_range()) {
            state
                .seeds
                .insert(buffer.metric.clone(), (buffer.min, buffer.max));
        }
        items
    }

    /// Set the average and deviation incoming values are checked against.
    pub fn set_reference(&self, metric: &str, avg: f64, stddev: f64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .references
            .insert(metric.to_string(), Reference { avg, stddev });
    }

    /// Range carried over for `metric`, if any cycle has seen it.
    pub fn seed(&self, metric: &str) -> Option<(f64, f64)> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.seeds.get(metric).copied()
    }
}
