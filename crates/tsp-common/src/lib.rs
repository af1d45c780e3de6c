//! Time series profiler common types and errors.
//!
//! This crate provides the value types shared by the profiler and the
//! predictor:
//! - Discrete states, history keys and per-metric statistics
//! - Input samples
//! - Transition matrices with merge/diff/likeliness operations
//! - The period tree and phase wire forms
//! - The persisted `Profile` and the `Settings` record it embeds
//! - Common error types

pub mod error;
pub mod history;
pub mod profile;
pub mod sample;
pub mod settings;
pub mod state;
pub mod stats;
pub mod tree;
pub mod txmatrix;

pub use error::{Error, ErrorCategory, Result};
pub use history::History;
pub use profile::{Phases, Profile};
pub use sample::{Sample, SampleMetric};
pub use settings::Settings;
pub use state::{history_key, key_suffixes, parse_history_key, MetricState, State};
pub use stats::Stats;
pub use tree::{PeriodTree, PeriodTreeNode};
pub use txmatrix::{diff_sets, find_metric, merge_sets, tx_likeliness, TxMatrix, TxStep};

/// Metric name used by the phase-to-phase meta model.
pub const PHASE_TX_METRIC: &str = "phasetx";
