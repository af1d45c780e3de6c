//! Phase detection.
//!
//! Every phase is a separate [`Counter`]. While the recent batches are
//! likely under the active phase it keeps learning; once the average
//! likeliness over the recent window drops below the threshold, the phase
//! that best explains the recent window takes over, or a new phase starts.
//! Phase changes themselves are learned by a single-metric meta counter.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use tracing::info;
use tsp_common::{
    tx_likeliness, MetricState, Phases, Settings, Stats, TxMatrix, PHASE_TX_METRIC,
};
use tsp_math::{mean, weighted_mean};

use crate::logging::event_names;
use crate::profiler::counter::Counter;

#[derive(Debug)]
struct PhaseState {
    phases: Vec<Counter>,
    active: usize,
    meta: Counter,
    state_history: VecDeque<Vec<MetricState>>,
    likeliness_history: VecDeque<f64>,
}

#[derive(Debug)]
pub struct Phase {
    threshold: f64,
    window: usize,
    fadeout: bool,
    template: Counter,
    state: Mutex<PhaseState>,
}

impl Phase {
    pub fn new(settings: &Settings) -> Self {
        let template = Counter::from_settings(settings);
        let state = PhaseState {
            phases: vec![template.clone()],
            active: 0,
            meta: Counter::new(1, 1, 1),
            state_history: VecDeque::new(),
            likeliness_history: VecDeque::new(),
        };
        Self {
            threshold: settings.phase_change_likeliness,
            window: settings.phase_change_history.max(1),
            fadeout: settings.phase_change_history_fadeout,
            template,
            state: Mutex::new(state),
        }
    }

    fn history_likeliness(&self, history: &VecDeque<f64>) -> f64 {
        let values: Vec<f64> = history.iter().copied().collect();
        if self.fadeout {
            let weights: Vec<f64> = (1..=values.len()).map(|w| w as f64).collect();
            weighted_mean(&values, &weights)
        } else {
            mean(&values)
        }
    }

    pub fn count(&self, batch: &[MetricState]) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let PhaseState {
            phases,
            active,
            meta,
            state_history,
            likeliness_history,
        } = &mut *state;

        // no model yet means nothing contradicts the batch
        let current = phases[*active].likeliness(batch).unwrap_or(1.0);
        likeliness_history.push_back(current);
        while likeliness_history.len() > self.window {
            likeliness_history.pop_front();
        }

        let mut best = self.history_likeliness(likeliness_history);
        if best < self.threshold {
            let mut candidate = None;
            for (idx, phase) in phases.iter().enumerate() {
                let Some(score) = window_score(phase, state_history, batch) else {
                    continue;
                };
                if score > best && score > self.threshold {
                    candidate = Some(idx);
                    best = score;
                }
            }

            match candidate {
                Some(idx) if idx == *active => {}
                Some(idx) => {
                    info!(
                        event = event_names::PHASE_SWITCHED,
                        from = *active,
                        to = idx,
                        likeliness = best,
                        "switched to existing phase"
                    );
                    *active = idx;
                    likeliness_history.clear();
                }
                None => {
                    let idx = phases.len();
                    phases.push(self.template.clone());
                    info!(
                        event = event_names::PHASE_CREATED,
                        from = *active,
                        phase = idx,
                        "created new phase"
                    );
                    *active = idx;
                    likeliness_history.clear();
                }
            }
        }

        phases[*active].count(batch);

        let phase_count = phases.len();
        meta.set_states(phase_count);
        meta.count(&[MetricState::new(
            PHASE_TX_METRIC,
            *active,
            Stats {
                min: 0.0,
                max: phase_count as f64,
                count: 1,
                ..Stats::default()
            },
        )]);

        state_history.push_back(batch.to_vec());
        while state_history.len() > self.window {
            state_history.pop_front();
        }
    }

    /// Matrix sets of every phase plus the phase-to-phase model.
    pub fn phases_tx(&self) -> Phases {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Phases {
            phases: state.phases.iter().map(Counter::get_tx).collect(),
            tx: state
                .meta
                .get_tx()
                .into_iter()
                .next()
                .unwrap_or_else(|| TxMatrix::new(PHASE_TX_METRIC)),
        }
    }

    pub fn current_phase(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.active
    }

    pub fn phase_count(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.phases.len()
    }
}

/// Average one-step likeliness of the recent window under `phase`: each
/// batch is scored as the successor of the one before it, the incoming batch
/// as the successor of the newest. `None` without history.
fn window_score(
    phase: &Counter,
    history: &VecDeque<Vec<MetricState>>,
    incoming: &[MetricState],
) -> Option<f64> {
    if history.is_empty() {
        return None;
    }
    let tx = phase.get_tx();
    let total: f64 = history
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let next = history.get(i + 1).map_or(incoming, Vec::as_slice);
            tx_likeliness(&tx, &[step.as_slice()], next).unwrap_or(0.0)
        })
        .sum();
    Some(total / history.len() as f64)
}
