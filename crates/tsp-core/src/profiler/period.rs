//! Period profiling: one transition model per position in a fixed cycle.
//!
//! With period sizes `[s0, s1, .., sn]` the tree has one level per size. The
//! counter of level `d` collects the batches of the node at
//! `path[..d]`; when `path[d]` wraps around, the counter's matrices are merged
//! into that node and the counter starts over.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tsp_common::{diff_sets, merge_sets, MetricState, PeriodTree, Settings};

use crate::logging::event_names;
use crate::profiler::counter::Counter;

/// Number of [`PeriodChange`] records kept.
pub const MAX_PERIOD_CHANGES: usize = 100;

/// A node whose incoming model differed from the stored one by more than the
/// configured ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodChange {
    pub timestamp: DateTime<Utc>,
    pub level: usize,
    pub path: Vec<usize>,
    /// [`diff_sets`] of the stored and the incoming model.
    pub similarity: f64,
}

/// Advance `path` by one step of the finest level.
///
/// Returns the levels that wrapped around, deepest first. A level wraps when
/// its position reaches its size, which in turn advances its parent.
pub fn advance_path(path: &mut [usize], sizes: &[usize]) -> Vec<usize> {
    let mut rolled = Vec::new();
    let levels = path.len().min(sizes.len());
    if levels == 0 {
        return rolled;
    }

    let mut level = levels - 1;
    loop {
        path[level] += 1;
        if path[level] < sizes[level] {
            break;
        }
        path[level] = 0;
        rolled.push(level);
        if level == 0 {
            break;
        }
        level -= 1;
    }
    rolled
}

#[derive(Debug)]
struct PeriodState {
    tree: PeriodTree,
    counters: Vec<Counter>,
    positions: Vec<usize>,
    changes: VecDeque<PeriodChange>,
    rollovers: u64,
}

#[derive(Debug)]
pub struct Period {
    sizes: Vec<usize>,
    change_ratio: Option<f64>,
    state: Mutex<PeriodState>,
}

impl Period {
    pub fn new(settings: &Settings) -> Self {
        let sizes = settings.period_size.clone();
        let state = PeriodState {
            tree: PeriodTree::new(&sizes),
            counters: sizes.iter().map(|_| Counter::from_settings(settings)).collect(),
            positions: vec![0; sizes.len()],
            changes: VecDeque::new(),
            rollovers: 0,
        };
        Self {
            sizes,
            change_ratio: settings.period_change_ratio,
            state: Mutex::new(state),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.sizes.is_empty()
    }

    /// Count one batch on every level and roll over completed nodes.
    pub fn count(&self, batch: &[MetricState]) {
        if !self.is_enabled() {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let PeriodState {
            tree,
            counters,
            positions,
            changes,
            rollovers,
        } = &mut *state;

        for counter in counters.iter_mut() {
            counter.count(batch);
        }

        let before = positions.clone();
        for level in advance_path(positions, &self.sizes) {
            let path = &before[..level];
            let incoming = counters[level].get_tx();

            let Some(node) = tree.node_mut(path) else {
                warn!(
                    event = event_names::PERIOD_ROLLOVER,
                    level,
                    path = ?path,
                    "period node out of bounds, model discarded"
                );
                counters[level].reset();
                continue;
            };

            if let Some(ratio) = self.change_ratio {
                if !node.tx_matrix.is_empty() {
                    let similarity = diff_sets(&node.tx_matrix, &incoming);
                    if 1.0 - similarity > ratio {
                        warn!(
                            event = event_names::PERIOD_CHANGE,
                            level,
                            path = ?path,
                            similarity,
                            ratio,
                            "period behaviour changed"
                        );
                        if changes.len() >= MAX_PERIOD_CHANGES {
                            changes.pop_front();
                        }
                        changes.push_back(PeriodChange {
                            timestamp: Utc::now(),
                            level,
                            path: path.to_vec(),
                            similarity,
                        });
                    }
                }
            }

            merge_sets(&mut node.tx_matrix, &incoming);
            counters[level].reset();
            *rollovers += 1;
            debug!(
                event = event_names::PERIOD_ROLLOVER,
                level,
                path = ?path,
                "period node completed"
            );
        }
    }

    /// Position on every level, coarsest first.
    pub fn current_path(&self) -> Vec<usize> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.positions.clone()
    }

    pub fn tree(&self) -> PeriodTree {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.tree.clone()
    }

    pub fn recent_changes(&self) -> Vec<PeriodChange> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.changes.iter().cloned().collect()
    }

    /// Total number of node rollovers on all levels.
    pub fn rollovers(&self) -> u64 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.rollovers
    }

    /// Batches counted by the level counter since its last rollover.
    pub fn level_observations(&self, level: usize) -> Option<u64> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.counters.get(level).map(Counter::observations)
    }
}
