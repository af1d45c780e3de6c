//! Time Series Profiler Core Library
//!
//! This library learns and replays statistical profiles of multi-metric time
//! series:
//! - Online profiling: buffering, discretization and Markov-chain counting
//!   with period and phase detection
//! - Offline prediction: simulation and likeliness projection from a
//!   persisted profile
//! - Structured logging setup
//!
//! Settings loading lives in `tsp-config`, shared value types in
//! `tsp-common`.

pub mod logging;
pub mod predictor;
pub mod profiler;

pub use predictor::{PredictionMode, Predictor, SimulatedState};
pub use profiler::{PeriodChange, Profiler};
pub use tsp_common::{Error, History, MetricState, Profile, Result, Sample, Settings, Stats};
