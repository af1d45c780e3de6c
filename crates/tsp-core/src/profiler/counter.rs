//! Transition counting per metric.
//!
//! A [`Counter`] keeps, for every metric it has seen, a sliding window of the
//! most recent states, the raw transition counts keyed by that window, and
//! the metric's running [`Stats`]. Counts are re-binned whenever the running
//! range widens so that every row stays in the current coordinate system.

use std::collections::VecDeque;

use tracing::{debug, warn};
use tsp_common::{
    history_key, key_suffixes, MetricState, Settings, State, Stats, TxMatrix, TxStep,
};
use tsp_math::{percent, percentages};

use crate::logging::event_names;
use crate::profiler::rescale::{change_dimension, Dimension, Table};

#[derive(Debug, Clone)]
struct MetricCounter {
    metric: String,
    window: VecDeque<State>,
    table: Table,
    /// Width the rows of `table` were binned with.
    table_states: usize,
    stats: Stats,
}

impl MetricCounter {
    fn new(metric: &str, history: usize, states: usize) -> Self {
        Self {
            metric: metric.to_string(),
            window: std::iter::repeat(0).take(history).collect(),
            table: Table::new(),
            table_states: states,
            stats: Stats::default(),
        }
    }

    fn rescale(&mut self, states: usize, incoming: &Stats) {
        let from = Dimension::new(self.table_states, self.stats.min, self.stats.max);
        let to = Dimension::new(
            states,
            self.stats.min.min(incoming.min),
            self.stats.max.max(incoming.max),
        );

        let rescaled = change_dimension(&self.table, from, to);
        for state in self.window.iter_mut() {
            *state = from.remap(*state, &to).unwrap_or(0);
        }

        debug!(
            event = event_names::COUNTER_RESCALE,
            metric = %self.metric,
            from_states = from.states,
            from_min = from.min,
            from_max = from.max,
            to_states = to.states,
            to_min = to.min,
            to_max = to.max,
            rows = rescaled.table.len(),
            "rescaled transition table"
        );
        if rescaled.dropped_cells > 0 {
            warn!(
                event = event_names::COUNTER_RESCALE_DROPPED,
                metric = %self.metric,
                dropped = rescaled.dropped_cells,
                "dropped cells without a valid bucket after rescale"
            );
        }

        self.table = rescaled.table;
    }

    fn current_key(&self) -> String {
        history_key(self.window.iter().copied())
    }
}

/// Markov-chain transition counter over a set of metrics.
#[derive(Debug, Clone)]
pub struct Counter {
    history: usize,
    states: usize,
    buffer_size: usize,
    metrics: Vec<MetricCounter>,
    observations: u64,
}

impl Counter {
    pub fn new(history: usize, states: usize, buffer_size: usize) -> Self {
        Self {
            history,
            states,
            buffer_size,
            metrics: Vec::new(),
            observations: 0,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.history, settings.states, settings.buffer_size)
    }

    pub fn states(&self) -> usize {
        self.states
    }

    /// Change the number of states. Existing rows are re-binned the next
    /// time their metric is counted; growing the space zero-extends them.
    pub fn set_states(&mut self, states: usize) {
        self.states = states;
    }

    /// Count one discretized batch.
    pub fn count(&mut self, batch: &[MetricState]) {
        for observed in batch {
            self.count_one(observed);
        }
        self.observations += 1;
    }

    fn count_one(&mut self, observed: &MetricState) {
        let (history, states) = (self.history, self.states);
        let idx = match self.metrics.iter().position(|m| m.metric == observed.metric) {
            Some(idx) => idx,
            None => {
                self.metrics
                    .push(MetricCounter::new(&observed.metric, history, states));
                self.metrics.len() - 1
            }
        };
        let counter = &mut self.metrics[idx];

        let widened = counter.stats.is_widened_by(&observed.stats);
        if (widened || counter.table_states != states) && !counter.table.is_empty() {
            counter.rescale(states, &observed.stats);
        }
        counter.table_states = states;
        counter.stats.merge(&observed.stats);

        if observed.state >= states {
            warn!(
                event = event_names::COUNTER_INVALID_STATE,
                metric = %observed.metric,
                state = observed.state,
                states,
                "state outside of state space, not counted"
            );
            return;
        }

        let window: Vec<State> = counter.window.iter().copied().collect();
        for key in key_suffixes(&window) {
            let row = counter
                .table
                .entry(key)
                .or_insert_with(|| vec![0; states]);
            if row.len() < states {
                row.resize(states, 0);
            }
            row[observed.state] += 1;
        }

        if counter.window.pop_front().is_some() {
            counter.window.push_back(observed.state);
        }
    }

    /// Normalised transition matrices, one per metric in first-seen order.
    pub fn get_tx(&self) -> Vec<TxMatrix> {
        self.metrics
            .iter()
            .map(|m| {
                // cycles, not raw samples
                let cycles = m.stats.count as f64 / self.buffer_size.max(1) as f64;
                let transitions = m
                    .table
                    .iter()
                    .map(|(key, row)| {
                        let row_sum: u64 = row.iter().sum();
                        let step = percent(row_sum as f64, cycles).min(100);
                        (key.clone(), TxStep::new(percentages(row), step))
                    })
                    .collect();
                TxMatrix {
                    metric: m.metric.clone(),
                    transitions,
                    stats: m.stats,
                }
            })
            .collect()
    }

    /// Mean probability of `batch` given each metric's current history.
    ///
    /// Metrics without a row for their history, or whose state lies outside
    /// the row, do not contribute. `None` when none did.
    pub fn likeliness(&self, batch: &[MetricState]) -> Option<f64> {
        let mut sum = 0.0;
        let mut contributions = 0usize;

        for observed in batch {
            let Some(m) = self.metric(&observed.metric) else {
                continue;
            };
            let Some(row) = m.table.get(&m.current_key()) else {
                continue;
            };
            if observed.state >= row.len() {
                continue;
            }
            let probs = percentages(row);
            sum += f64::from(probs[observed.state]) / 100.0;
            contributions += 1;
        }

        (contributions > 0).then(|| sum / contributions as f64)
    }

    /// Clear histories, tables and statistics.
    pub fn reset(&mut self) {
        self.metrics.clear();
        self.observations = 0;
    }

    /// Clear histories and tables, keeping statistics.
    pub fn reset_counters(&mut self) {
        let history = self.history;
        for m in &mut self.metrics {
            m.window = std::iter::repeat(0).take(history).collect();
            m.table.clear();
        }
        self.observations = 0;
    }

    /// Clear statistics, keeping histories and tables.
    pub fn reset_stats(&mut self) {
        for m in &mut self.metrics {
            m.stats = Stats::default();
        }
    }

    fn metric(&self, metric: &str) -> Option<&MetricCounter> {
        self.metrics.iter().find(|m| m.metric == metric)
    }

    pub fn stats(&self, metric: &str) -> Option<Stats> {
        self.metric(metric).map(|m| m.stats)
    }

    /// Running statistics of every metric in first-seen order.
    pub fn all_stats(&self) -> Vec<(String, Stats)> {
        self.metrics
            .iter()
            .map(|m| (m.metric.clone(), m.stats))
            .collect()
    }

    /// The history key the next observation of `metric` will be counted under.
    pub fn current_key(&self, metric: &str) -> Option<String> {
        self.metric(metric).map(MetricCounter::current_key)
    }

    pub fn metrics(&self) -> Vec<&str> {
        self.metrics.iter().map(|m| m.metric.as_str()).collect()
    }

    /// Number of batches counted since the last reset.
    pub fn observations(&self) -> u64 {
        self.observations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(metric: &str, state: State, values: &[f64], min: f64, max: f64) -> Vec<MetricState> {
        vec![MetricState::new(
            metric,
            state,
            Stats::from_values(values, min, max),
        )]
    }

    #[test]
    fn test_first_observation_uses_zero_history() {
        let mut counter = Counter::new(2, 4, 1);
        counter.count(&batch("cpu", 3, &[80.0], 0.0, 100.0));
        let tx = counter.get_tx();
        assert_eq!(tx.len(), 1);
        assert_eq!(tx[0].transitions["0-0"].next_probs, vec![0, 0, 0, 100]);
        assert_eq!(tx[0].transitions["0"].next_probs, vec![0, 0, 0, 100]);
        assert_eq!(counter.current_key("cpu").as_deref(), Some("0-3"));
    }

    #[test]
    fn test_suffix_rows_are_counted() {
        let mut counter = Counter::new(2, 2, 1);
        for state in [1, 0, 1, 0, 1] {
            counter.count(&batch("cpu", state, &[50.0], 0.0, 100.0));
        }
        let tx = &counter.get_tx()[0];
        assert_eq!(tx.transitions["1-0"].next_probs, vec![0, 100]);
        assert_eq!(tx.transitions["0-1"].next_probs, vec![100, 0]);
        assert_eq!(tx.transitions["1"].next_probs, vec![100, 0]);
        assert_eq!(counter.observations(), 5);
    }

    #[test]
    fn test_step_probability_uses_cycles() {
        let mut counter = Counter::new(1, 2, 2);
        for state in [0, 1, 0, 1] {
            counter.count(&batch("cpu", state, &[10.0, 20.0], 0.0, 100.0));
        }
        let tx = &counter.get_tx()[0];
        // four cycles of two samples each; "0" seen three times
        assert_eq!(tx.stats.count, 8);
        assert_eq!(tx.transitions["0"].probability, 75);
        assert_eq!(tx.transitions["1"].probability, 25);
    }

    #[test]
    fn test_rows_sum_to_hundred() {
        let mut counter = Counter::new(1, 3, 1);
        for state in [0, 1, 0, 2, 0, 0] {
            counter.count(&batch("io", state, &[1.0], 0.0, 3.0));
        }
        for row in counter.get_tx()[0].transitions.values() {
            assert_eq!(row.row_sum(), 100);
        }
    }

    #[test]
    fn test_widening_range_rescales_table() {
        let mut counter = Counter::new(1, 4, 1);
        counter.count(&batch("cpu", 3, &[54.0], 50.0, 55.0));
        counter.count(&batch("cpu", 3, &[54.0], 50.0, 55.0));
        counter.count(&batch("cpu", 0, &[1.0], 0.0, 100.0));

        let tx = &counter.get_tx()[0];
        assert_eq!(tx.stats.min, 0.0);
        assert_eq!(tx.stats.max, 100.0);
        // rows "0" and "3" both collapse onto "2" after the range widened
        assert!(!tx.transitions.contains_key("3"));
        assert_eq!(tx.transitions["2"].next_probs, vec![33, 0, 67, 0]);
        assert_eq!(counter.current_key("cpu").as_deref(), Some("0"));
    }

    #[test]
    fn test_growing_state_space() {
        let mut counter = Counter::new(1, 1, 1);
        counter.count(&batch("phasetx", 0, &[0.0], 0.0, 1.0));
        counter.set_states(2);
        counter.count(&batch("phasetx", 1, &[0.0], 0.0, 2.0));
        let tx = &counter.get_tx()[0];
        assert_eq!(tx.transitions["0"].next_probs, vec![50, 50]);
    }

    #[test]
    fn test_invalid_state_not_counted() {
        let mut counter = Counter::new(1, 2, 1);
        counter.count(&batch("cpu", 5, &[1.0], 0.0, 100.0));
        assert!(counter.get_tx()[0].transitions.is_empty());
        assert_eq!(counter.stats("cpu").map(|s| s.count), Some(1));
    }

    #[test]
    fn test_likeliness() {
        let mut counter = Counter::new(1, 2, 1);
        assert_eq!(counter.likeliness(&batch("cpu", 0, &[1.0], 0.0, 100.0)), None);
        for state in [1, 0, 1, 0] {
            counter.count(&batch("cpu", state, &[1.0], 0.0, 100.0));
        }
        // current history "0", which was always followed by 1
        assert_eq!(counter.likeliness(&batch("cpu", 1, &[1.0], 0.0, 100.0)), Some(1.0));
        assert_eq!(counter.likeliness(&batch("cpu", 0, &[1.0], 0.0, 100.0)), Some(0.0));
        assert_eq!(counter.likeliness(&batch("io", 0, &[1.0], 0.0, 100.0)), None);
    }

    #[test]
    fn test_resets() {
        let mut counter = Counter::new(1, 2, 1);
        counter.count(&batch("cpu", 1, &[1.0], 0.0, 100.0));

        counter.reset_counters();
        assert!(counter.get_tx()[0].transitions.is_empty());
        assert_eq!(counter.stats("cpu").map(|s| s.count), Some(1));
        assert_eq!(counter.current_key("cpu").as_deref(), Some("0"));

        counter.reset_stats();
        assert_eq!(counter.stats("cpu"), Some(Stats::default()));

        counter.reset();
        assert!(counter.metrics().is_empty());
        assert_eq!(counter.observations(), 0);
    }

    #[test]
    fn test_metrics_keep_first_seen_order() {
        let mut counter = Counter::new(1, 2, 1);
        let stats = Stats::from_values(&[1.0], 0.0, 10.0);
        counter.count(&[
            MetricState::new("net", 0, stats),
            MetricState::new("cpu", 1, stats),
        ]);
        assert_eq!(counter.metrics(), vec!["net", "cpu"]);
        assert_eq!(counter.all_stats()[1].0, "cpu");
    }
}
