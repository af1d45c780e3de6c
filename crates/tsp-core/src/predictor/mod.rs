//! Offline prediction from a persisted [`Profile`].
//!
//! The predictor walks the learned Markov chains forward. Depending on the
//! [`PredictionMode`] it uses the root matrices, the matrices of the current
//! phase (advancing the phase with the phase-to-phase model first) or the
//! matrices of the current period node (advancing the period path first).
//!
//! A predictor is single-owner: `simulate` takes `&mut self`.

pub mod likeliness;
pub mod sampling;

pub use sampling::{reconstruct_value, sample_state};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tsp_common::{find_metric, Error, History, Profile, Result, State, TxMatrix};

use crate::logging::event_names;
use crate::profiler::advance_path;

/// Which part of the profile drives the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMode {
    #[default]
    RootTx,
    Phases,
    Periods,
}

impl FromStr for PredictionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "root" | "roottx" | "root_tx" => Ok(PredictionMode::RootTx),
            "phase" | "phases" => Ok(PredictionMode::Phases),
            "period" | "periods" => Ok(PredictionMode::Periods),
            _ => Err(format!("unknown prediction mode: {}", s)),
        }
    }
}

impl fmt::Display for PredictionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionMode::RootTx => write!(f, "root_tx"),
            PredictionMode::Phases => write!(f, "phases"),
            PredictionMode::Periods => write!(f, "periods"),
        }
    }
}

/// One simulated metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedState {
    pub metric: String,
    pub state: State,
    pub value: f64,
}

fn select_matrices<'a>(
    profile: &'a Profile,
    mode: PredictionMode,
    phase: usize,
    path: &[usize],
    depth: usize,
) -> Result<&'a [TxMatrix]> {
    match mode {
        PredictionMode::RootTx => Ok(&profile.root_tx),
        PredictionMode::Phases => profile
            .phases
            .phases
            .get(phase)
            .map(Vec::as_slice)
            .ok_or(Error::PhaseOutOfRange {
                phase,
                available: profile.phases.len(),
            }),
        PredictionMode::Periods => {
            let node_path = &path[..depth.min(path.len())];
            profile
                .period_tree
                .node(node_path)
                .map(|node| node.tx_matrix.as_slice())
                .ok_or_else(|| Error::PeriodPathOutOfBounds {
                    path: node_path.to_vec(),
                })
        }
    }
}

/// Markov-chain simulator over a profile.
pub struct Predictor<R: Rng = StdRng> {
    profile: Profile,
    rng: R,
    mode: PredictionMode,
    current_state: BTreeMap<String, String>,
    current_phase: usize,
    period_path: Vec<usize>,
    period_depth: usize,
}

impl Predictor<StdRng> {
    /// A root-mode predictor seeded from the operating system.
    pub fn new(profile: Profile) -> Self {
        Self::with_rng(profile, StdRng::from_os_rng())
    }
}

impl<R: Rng> Predictor<R> {
    /// A root-mode predictor drawing from `rng`.
    pub fn with_rng(profile: Profile, rng: R) -> Self {
        let levels = profile.settings.period_size.len();
        let mut predictor = Self {
            profile,
            rng,
            mode: PredictionMode::RootTx,
            current_state: BTreeMap::new(),
            current_phase: 0,
            period_path: vec![0; levels],
            period_depth: 0,
        };
        predictor.initialize_state();
        predictor
    }

    /// Resume from an observed [`History`]: its phase, its period path and
    /// its most recent per-metric states. `depth` overrides the history's
    /// period depth.
    pub fn from_history(
        profile: Profile,
        mode: PredictionMode,
        history: &History,
        depth: Option<usize>,
        rng: R,
    ) -> Self {
        let mut predictor = Self::with_rng(profile, rng);
        predictor.mode = mode;
        predictor.current_phase = history.current_phase;
        predictor.set_period_path(
            history.period_path.clone(),
            depth.unwrap_or(history.period_path_depth),
        );
        predictor.initialize_state();
        if let Some(last) = history.last_state() {
            predictor
                .current_state
                .extend(last.iter().map(|(m, s)| (m.clone(), s.clone())));
        }
        predictor
    }

    pub fn set_state(&mut self, state: BTreeMap<String, String>) {
        self.current_state = state;
    }

    pub fn set_phase(&mut self, phase: usize) {
        self.current_phase = phase;
    }

    /// Set the position in the period tree. Paths are fitted to the tree's
    /// level count and the depth to the deepest node level.
    pub fn set_period_path(&mut self, mut path: Vec<usize>, depth: usize) {
        let levels = self.profile.settings.period_size.len();
        let max_depth = levels.saturating_sub(1);
        if path.len() != levels || depth > max_depth {
            warn!(
                event = event_names::PREDICT_PATH_ADJUSTED,
                path = ?path,
                depth,
                levels,
                "period path does not fit the profile"
            );
            path.resize(levels, 0);
        }
        self.period_path = path;
        self.period_depth = depth.min(max_depth);
    }

    pub fn set_mode(&mut self, mode: PredictionMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> PredictionMode {
        self.mode
    }

    pub fn current_state(&self) -> &BTreeMap<String, String> {
        &self.current_state
    }

    pub fn current_phase(&self) -> usize {
        self.current_phase
    }

    pub fn period_path(&self) -> &[usize] {
        &self.period_path
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    fn matrices(&self) -> Result<&[TxMatrix]> {
        select_matrices(
            &self.profile,
            self.mode,
            self.current_phase,
            &self.period_path,
            self.period_depth,
        )
    }

    /// Start every metric from the history with the highest step probability.
    fn initialize_state(&mut self) {
        let selected = select_matrices(
            &self.profile,
            self.mode,
            self.current_phase,
            &self.period_path,
            self.period_depth,
        );
        let matrices = match selected {
            Ok(matrices) => matrices,
            Err(err) => {
                warn!(
                    event = event_names::PREDICT_STATE_UNINITIALIZED,
                    mode = %self.mode,
                    error = %err,
                    "no matrices to initialise from"
                );
                self.current_state.clear();
                return;
            }
        };

        let mut state = BTreeMap::new();
        for tx in matrices {
            match tx.most_probable() {
                Some((key, _)) => {
                    state.entry(tx.metric.clone()).or_insert_with(|| key.to_string());
                }
                None => warn!(
                    event = event_names::PREDICT_STATE_UNINITIALIZED,
                    metric = %tx.metric,
                    "metric has no transitions"
                ),
            }
        }
        self.current_state = state;
    }

    fn next_phase(&mut self) {
        let current = self.current_phase;
        let Some((_, row)) = self.profile.phases.tx.lookup(&current.to_string()) else {
            warn!(
                event = event_names::PREDICT_PHASE_STALLED,
                phase = current,
                "no phase transitions from current phase"
            );
            return;
        };
        let next = match sample_state(&mut self.rng, &row.next_probs) {
            Ok(next) => next,
            Err(err) => {
                warn!(
                    event = event_names::PREDICT_PHASE_STALLED,
                    phase = current,
                    error = %err,
                    "cannot draw next phase"
                );
                return;
            }
        };
        if next != current {
            debug!(
                event = event_names::PREDICT_PHASE_CHANGE,
                from = current,
                to = next,
                "simulated phase change"
            );
            self.current_phase = next;
            self.initialize_state();
        }
    }

    fn next_state(&mut self) -> Result<Vec<SimulatedState>> {
        match self.mode {
            PredictionMode::RootTx => {}
            PredictionMode::Phases => self.next_phase(),
            PredictionMode::Periods => {
                advance_path(&mut self.period_path, &self.profile.settings.period_size);
            }
        }

        if self.current_state.is_empty() {
            self.initialize_state();
        }
        if self.current_state.is_empty() {
            return Err(Error::NoTransitionData {
                metric: "*".to_string(),
                history: String::new(),
            });
        }

        let matrices = select_matrices(
            &self.profile,
            self.mode,
            self.current_phase,
            &self.period_path,
            self.period_depth,
        )?;
        let states = self.profile.settings.states;

        let mut step = Vec::with_capacity(self.current_state.len());
        for (metric, history) in &self.current_state {
            let Some(tx) = find_metric(matrices, metric) else {
                warn!(
                    event = event_names::PREDICT_METRIC_MISSING,
                    metric = %metric,
                    mode = %self.mode,
                    "metric missing from selected matrices"
                );
                continue;
            };

            let row = match tx.lookup(history) {
                Some((_, row)) => row,
                None => {
                    let (key, row) = tx.most_probable().ok_or_else(|| Error::NoTransitionData {
                        metric: metric.clone(),
                        history: history.clone(),
                    })?;
                    debug!(
                        event = event_names::PREDICT_LOOKUP_FALLBACK,
                        metric = %metric,
                        history = %history,
                        fallback = %key,
                        "history unknown, using most probable row"
                    );
                    row
                }
            };

            let state = sample_state(&mut self.rng, &row.next_probs)?;
            let value = reconstruct_value(&mut self.rng, state, states, &tx.stats);
            step.push(SimulatedState {
                metric: metric.clone(),
                state,
                value,
            });
        }

        let history = self.profile.settings.history;
        for simulated in &step {
            let key = match self.current_state.get(&simulated.metric) {
                Some(key) => likeliness::slide(key, simulated.state, history),
                None => simulated.state.to_string(),
            };
            self.current_state.insert(simulated.metric.clone(), key);
        }

        Ok(step)
    }

    /// Simulate `steps` transitions of every metric.
    pub fn simulate(&mut self, steps: usize) -> Result<Vec<Vec<SimulatedState>>> {
        (0..steps).map(|_| self.next_state()).collect()
    }

    /// Distribution of every metric's state `steps` transitions after
    /// `current`, in percent per state.
    ///
    /// Metrics missing from `current` start from the predictor's own state.
    /// Unknown histories fall back to the most probable row, as in
    /// [`Predictor::simulate`]. `steps <= 1` yields the next-state row itself.
    /// Fails only for a metric whose matrix has no rows.
    pub fn likeliness(
        &self,
        current: &BTreeMap<String, String>,
        steps: usize,
    ) -> Result<BTreeMap<String, Vec<u32>>> {
        let matrices = self.matrices()?;
        let states = self.profile.settings.states;
        let history = self.profile.settings.history;

        let mut out = BTreeMap::new();
        for tx in matrices {
            let Some(key) = current
                .get(&tx.metric)
                .or_else(|| self.current_state.get(&tx.metric))
            else {
                continue;
            };
            let projected = likeliness::project(tx, key, steps, history, states).ok_or_else(|| {
                Error::NoTransitionData {
                    metric: tx.metric.clone(),
                    history: key.clone(),
                }
            })?;
            out.insert(tx.metric.clone(), projected);
        }
        Ok(out)
    }
}

impl<R: Rng> fmt::Debug for Predictor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predictor")
            .field("profile", &self.profile.name)
            .field("mode", &self.mode)
            .field("current_state", &self.current_state)
            .field("current_phase", &self.current_phase)
            .field("period_path", &self.period_path)
            .finish()
    }
}
