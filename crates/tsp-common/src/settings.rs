//! The settings record a profiler is built from.
//!
//! `Settings` travels inside every persisted profile so a predictor running in
//! another process knows the state count, history length and period layout the
//! model was learned with.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of discrete states per metric.
pub const DEFAULT_STATES: usize = 4;
/// Default number of samples per discretization cycle.
pub const DEFAULT_BUFFER_SIZE: usize = 10;
/// Default Markov-chain history length.
pub const DEFAULT_HISTORY: usize = 1;
/// Default outlier threshold in standard deviations.
pub const DEFAULT_FILTER_STD_DEVS: f64 = 2.0;
/// Default phase-change likeliness threshold.
pub const DEFAULT_PHASE_LIKELINESS: f64 = 0.6;
/// Default phase-change history window.
pub const DEFAULT_PHASE_HISTORY: usize = 60;
/// Default capacity of the ingestion channel.
pub const DEFAULT_INPUT_CAPACITY: usize = 1024;

/// Profiler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Human readable profiler name, copied into every profile.
    pub name: String,

    /// Samples per discretization cycle.
    #[serde(rename = "buffersize")]
    pub buffer_size: usize,

    /// Number of discrete states per metric.
    pub states: usize,

    /// Number of previous states forming a history key.
    pub history: usize,

    /// Outlier threshold in standard deviations (non-positive disables).
    #[serde(rename = "filterstddevs")]
    pub filter_std_devs: f64,

    /// Reject outliers instead of only counting them.
    #[serde(rename = "filteroutliers")]
    pub filter_outliers: bool,

    /// Use `fixed_min`/`fixed_max` instead of the observed range.
    #[serde(rename = "fixbound")]
    pub fix_bound: bool,

    #[serde(rename = "fixedmin")]
    pub fixed_min: f64,

    #[serde(rename = "fixedmax")]
    pub fixed_max: f64,

    /// Period sizes, coarsest first. Empty disables period profiling.
    #[serde(rename = "periodsize")]
    pub period_size: Vec<usize>,

    /// Report period nodes whose behaviour changes by more than this ratio.
    #[serde(
        rename = "periodchangeratio",
        skip_serializing_if = "Option::is_none"
    )]
    pub period_change_ratio: Option<f64>,

    #[serde(rename = "phaseChangeLikeliness")]
    pub phase_change_likeliness: f64,

    #[serde(rename = "phaseChangeHistory")]
    pub phase_change_history: usize,

    /// Weight recent likeliness scores higher when averaging.
    #[serde(rename = "phaseChangeHistoryFadeout")]
    pub phase_change_history_fadeout: bool,

    /// Bounded ingestion queue size; `put` blocks when full.
    #[serde(rename = "inputcapacity")]
    pub input_capacity: usize,

    /// Interval of the periodic output callback. Runtime only.
    #[serde(skip)]
    pub output_interval: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: String::new(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            states: DEFAULT_STATES,
            history: DEFAULT_HISTORY,
            filter_std_devs: DEFAULT_FILTER_STD_DEVS,
            filter_outliers: false,
            fix_bound: false,
            fixed_min: 0.0,
            fixed_max: 100.0,
            period_size: Vec::new(),
            period_change_ratio: None,
            phase_change_likeliness: DEFAULT_PHASE_LIKELINESS,
            phase_change_history: DEFAULT_PHASE_HISTORY,
            phase_change_history_fadeout: false,
            input_capacity: DEFAULT_INPUT_CAPACITY,
            output_interval: None,
        }
    }
}

impl Settings {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_states(mut self, states: usize) -> Self {
        self.states = states;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history;
        self
    }

    pub fn with_fixed_bounds(mut self, min: f64, max: f64) -> Self {
        self.fix_bound = true;
        self.fixed_min = min;
        self.fixed_max = max;
        self
    }

    pub fn with_period_size(mut self, sizes: Vec<usize>) -> Self {
        self.period_size = sizes;
        self
    }

    /// The settings-level fixed bounds, when enabled.
    pub fn fixed_bounds(&self) -> Option<(f64, f64)> {
        self.fix_bound.then_some((self.fixed_min, self.fixed_max))
    }

    pub fn periods_enabled(&self) -> bool {
        !self.period_size.is_empty()
    }
}
