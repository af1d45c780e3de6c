//! Normalised transition matrices.
//!
//! A [`TxMatrix`] is the read-only percentage form of one metric's transition
//! table: history key → next-state percentages plus the share of all cycles
//! that passed through that key. Period aggregation combines matrices with
//! [`TxMatrix::merge`] and compares them with [`TxMatrix::diff`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::state::{history_key, parse_history_key, MetricState, State};
use crate::stats::Stats;

/// One row of a transition matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStep {
    /// Percentage per next state, summing to 100 for a populated row.
    #[serde(rename = "nextProbs", alias = "nextStateProbs", default)]
    pub next_probs: Vec<u32>,
    /// Percentage of discretization cycles that passed through this row.
    #[serde(rename = "probability", default)]
    pub probability: u32,
}

impl TxStep {
    pub fn new(next_probs: Vec<u32>, probability: u32) -> Self {
        Self {
            next_probs,
            probability,
        }
    }

    pub fn row_sum(&self) -> u32 {
        self.next_probs.iter().sum()
    }
}

/// Transition model of one metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxMatrix {
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub transitions: BTreeMap<String, TxStep>,
    #[serde(default)]
    pub stats: Stats,
}

impl TxMatrix {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Fold `other` into this matrix.
    ///
    /// Cells are averaged as integers, `(a + b) / 2`, for both next-state
    /// percentages and the step probability. Rows only present in `other` are
    /// taken over as they are; rows whose width differs are replaced.
    pub fn merge(&mut self, other: &TxMatrix) {
        if self.metric.is_empty() {
            self.metric = other.metric.clone();
        }

        for (key, incoming) in &other.transitions {
            match self.transitions.get_mut(key) {
                Some(row) if row.next_probs.len() == incoming.next_probs.len() => {
                    for (cell, &b) in row.next_probs.iter_mut().zip(&incoming.next_probs) {
                        *cell = (*cell + b) / 2;
                    }
                    row.probability = (row.probability + incoming.probability) / 2;
                }
                Some(row) => *row = incoming.clone(),
                None => {
                    self.transitions.insert(key.clone(), incoming.clone());
                }
            }
        }

        self.stats.merge(&other.stats);
    }

    /// Similarity in `[0, 1]`: the overlapping percentage mass of every row of
    /// `self` with the same row in `other`, over `rows * 100`.
    ///
    /// Identical matrices score 1, disjoint ones 0. Rows missing from `other`
    /// contribute nothing. Two empty matrices are identical.
    pub fn diff(&self, other: &TxMatrix) -> f64 {
        if self.transitions.is_empty() {
            return if other.transitions.is_empty() { 1.0 } else { 0.0 };
        }

        let overlap: u64 = self
            .transitions
            .iter()
            .filter_map(|(key, row)| other.transitions.get(key).map(|o| (row, o)))
            .map(|(a, b)| {
                a.next_probs
                    .iter()
                    .zip(&b.next_probs)
                    .map(|(&x, &y)| u64::from(x.min(y)))
                    .sum::<u64>()
            })
            .sum();

        let total = self.transitions.len() as f64 * 100.0;
        (overlap as f64 / total).clamp(0.0, 1.0)
    }

    /// Probability in `[0, 1]` of moving from `key` to `next`.
    ///
    /// `None` when the row is missing or narrower than `next`.
    pub fn likeliness(&self, key: &str, next: State) -> Option<f64> {
        let row = self.transitions.get(key)?;
        let p = row.next_probs.get(next)?;
        Some(f64::from(*p) / 100.0)
    }

    /// Find the row for `history`, dropping the oldest state until a row
    /// matches. Returns the matched key with its row.
    pub fn lookup(&self, history: &str) -> Option<(&str, &TxStep)> {
        let states = parse_history_key(history);
        (0..states.len()).find_map(|start| {
            let key = history_key(states[start..].iter().copied());
            self.transitions
                .get_key_value(key.as_str())
                .map(|(k, row)| (k.as_str(), row))
        })
    }

    /// The row with the highest step probability. Ties resolve to the
    /// smallest key.
    pub fn most_probable(&self) -> Option<(&str, &TxStep)> {
        let mut best: Option<(&str, &TxStep)> = None;
        for (key, row) in &self.transitions {
            match best {
                Some((_, current)) if row.probability <= current.probability => {}
                _ => best = Some((key.as_str(), row)),
            }
        }
        best
    }
}

/// Find the matrix for `metric` in a per-metric set.
pub fn find_metric<'a>(matrices: &'a [TxMatrix], metric: &str) -> Option<&'a TxMatrix> {
    matrices.iter().find(|tx| tx.metric == metric)
}

/// Merge a per-metric set into `target`.
///
/// When the sets do not cover the same metrics, `target` is overwritten.
pub fn merge_sets(target: &mut Vec<TxMatrix>, incoming: &[TxMatrix]) {
    let same_shape = target.len() == incoming.len()
        && incoming
            .iter()
            .all(|tx| target.iter().any(|t| t.metric == tx.metric));
    if !same_shape {
        *target = incoming.to_vec();
        return;
    }
    for tx in incoming {
        if let Some(existing) = target.iter_mut().find(|t| t.metric == tx.metric) {
            existing.merge(tx);
        }
    }
}

/// Mean [`TxMatrix::diff`] over the metrics of `a`; metrics missing in `b`
/// score 0. Two empty sets are identical.
pub fn diff_sets(a: &[TxMatrix], b: &[TxMatrix]) -> f64 {
    if a.is_empty() {
        return if b.is_empty() { 1.0 } else { 0.0 };
    }
    let total: f64 = a
        .iter()
        .map(|tx| find_metric(b, &tx.metric).map_or(0.0, |other| tx.diff(other)))
        .sum();
    total / a.len() as f64
}

/// Mean likeliness of `next` given the per-metric states in `history`
/// (oldest step first), scored against `matrices`.
///
/// Metrics without a matrix, without a state in every history step, or
/// without a matching row do not contribute. `None` when nothing did.
pub fn tx_likeliness(
    matrices: &[TxMatrix],
    history: &[&[MetricState]],
    next: &[MetricState],
) -> Option<f64> {
    let mut sum = 0.0;
    let mut contributions = 0usize;

    for observed in next {
        let Some(tx) = find_metric(matrices, &observed.metric) else {
            continue;
        };
        let states: Option<Vec<State>> = history
            .iter()
            .map(|step| {
                step.iter()
                    .find(|s| s.metric == observed.metric)
                    .map(|s| s.state)
            })
            .collect();
        let Some(states) = states else {
            continue;
        };
        if let Some(p) = tx.likeliness(&history_key(states), observed.state) {
            sum += p;
            contributions += 1;
        }
    }

    (contributions > 0).then(|| sum / contributions as f64)
}
