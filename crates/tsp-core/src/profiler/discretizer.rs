//! Turns a cycle's buffers into discrete states.

use tracing::error;
use tsp_common::{MetricState, Stats};
use tsp_math::discretize;

use crate::logging::event_names;
use crate::profiler::buffer::MetricBuffer;

#[derive(Debug, Clone, Copy)]
pub struct Discretizer {
    states: usize,
}

impl Discretizer {
    pub fn new(states: usize) -> Self {
        Self { states }
    }

    /// One state per non-empty buffer.
    ///
    /// The state is the bucket of the buffer's average within the buffer's
    /// bounds. Buffers whose average has no bucket are logged and skipped.
    pub fn discretize(&self, buffers: &[MetricBuffer]) -> Vec<MetricState> {
        buffers
            .iter()
            .filter(|b| !b.is_empty())
            .filter_map(|buffer| {
                let (min, max) = buffer.bounds();
                let stats = Stats::from_values(&buffer.values, min, max);
                match discretize(stats.avg, self.states, min, max) {
                    Some(state) => Some(MetricState::new(buffer.metric.clone(), state, stats)),
                    None => {
                        error!(
                            event = event_names::DISCRETIZE_INVALID_BUCKET,
                            metric = %buffer.metric,
                            avg = stats.avg,
                            min,
                            max,
                            "no valid state for buffer average"
                        );
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(metric: &str, values: &[f64], fixed: Option<(f64, f64)>) -> MetricBuffer {
        let mut b = MetricBuffer::new(metric);
        for &v in values {
            b.append(v);
        }
        b.fixed = fixed;
        b
    }

    #[test]
    fn test_average_is_binned_within_bounds() {
        let d = Discretizer::new(4);
        let out = d.discretize(&[buffer("cpu", &[50.0, 60.0], Some((0.0, 100.0)))]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].state, 2);
        assert_eq!(out[0].stats.avg, 55.0);
        assert_eq!(out[0].stats.stddev, 5.0);
        assert_eq!(out[0].stats.count, 2);
        assert_eq!((out[0].stats.min, out[0].stats.max), (0.0, 100.0));
    }

    #[test]
    fn test_dynamic_bounds() {
        let d = Discretizer::new(2);
        let out = d.discretize(&[buffer("io", &[10.0, 90.0, 90.0], None)]);
        // avg 63.3 over [10, 90]
        assert_eq!(out[0].state, 1);
    }

    #[test]
    fn test_all_zero_buffer_is_state_zero() {
        let d = Discretizer::new(4);
        let out = d.discretize(&[buffer("cpu", &[0.0, 0.0], None)]);
        assert_eq!(out[0].state, 0);
    }

    #[test]
    fn test_invalid_and_empty_buffers_are_skipped() {
        let d = Discretizer::new(4);
        let out = d.discretize(&[
            buffer("flat", &[5.0], None),
            buffer("over", &[150.0], Some((0.0, 100.0))),
            MetricBuffer::new("empty"),
            buffer("ok", &[25.0], Some((0.0, 100.0))),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].metric, "ok");
        assert_eq!(out[0].state, 1);
    }
}
