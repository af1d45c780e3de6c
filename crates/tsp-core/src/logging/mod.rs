//! Structured logging for the profiler.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSONL for collectors and pipelines
//!
//! # Usage
//!
//! ```ignore
//! use tsp_core::logging::{event_names, init_logging, LogConfig};
//!
//! init_logging(&LogConfig::from_env(None, None));
//! tracing::info!(event = event_names::INGEST_STARTED, "profiler started");
//! ```
//!
//! All output goes to stderr. Every event emitted by this crate carries an
//! `event` field holding one of the names in [`event_names`].

pub mod config;

pub use config::{LogConfig, LogFormat, LogLevel};

use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

/// Stable names for the `event` field of structured log records.
pub mod event_names {
    // Profiler lifecycle
    pub const INGEST_STARTED: &str = "ingest.started";
    pub const INGEST_STOPPED: &str = "ingest.stopped";
    pub const INGEST_REJECTED: &str = "ingest.rejected";
    pub const PROFILER_TERMINATED: &str = "profiler.terminated";
    pub const CYCLE_COMPLETED: &str = "cycle.completed";
    pub const CYCLE_EMPTY: &str = "cycle.empty";

    // Buffer and discretizer
    pub const BUFFER_OUTLIER: &str = "buffer.outlier";
    pub const DISCRETIZE_INVALID_BUCKET: &str = "discretize.invalid_bucket";

    // Counter
    pub const COUNTER_RESCALE: &str = "counter.rescale";
    pub const COUNTER_RESCALE_DROPPED: &str = "counter.rescale_dropped";
    pub const COUNTER_INVALID_STATE: &str = "counter.invalid_state";

    // Period tree
    pub const PERIOD_ROLLOVER: &str = "period.rollover";
    pub const PERIOD_CHANGE: &str = "period.change";

    // Phase detection
    pub const PHASE_SWITCHED: &str = "phase.switched";
    pub const PHASE_CREATED: &str = "phase.created";

    // Output loop
    pub const OUTPUT_STARTED: &str = "output.started";
    pub const OUTPUT_TICK: &str = "output.tick";
    pub const OUTPUT_STOPPED: &str = "output.stopped";

    // Predictor
    pub const PREDICT_LOOKUP_FALLBACK: &str = "predict.lookup_fallback";
    pub const PREDICT_METRIC_MISSING: &str = "predict.metric_missing";
    pub const PREDICT_PHASE_CHANGE: &str = "predict.phase_change";
    pub const PREDICT_PHASE_STALLED: &str = "predict.phase_stalled";
    pub const PREDICT_STATE_UNINITIALIZED: &str = "predict.state_uninitialized";
    pub const PREDICT_PATH_ADJUSTED: &str = "predict.path_adjusted";
}

// RUST_LOG directives apply only while TSP_LOG is unset
fn build_filter(config: &LogConfig) -> EnvFilter {
    let directive = format!("tsp_core={}", config.level);
    if std::env::var_os(config::ENV_LOG).is_some() {
        return EnvFilter::new(directive);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
}

/// Initialize the logging subsystem.
///
/// Must be called at most once per process; panics if a global subscriber
/// is already installed. Use [`try_init_logging`] where that can happen.
pub fn init_logging(config: &LogConfig) {
    if let Err(err) = try_init_logging(config) {
        panic!("failed to initialize logging: {}", err);
    }
}

/// Initialize logging, reporting an error if a subscriber already exists.
pub fn try_init_logging(config: &LogConfig) -> Result<(), TryInitError> {
    let filter = build_filter(config);

    match config.format {
        LogFormat::Human => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_names(true)
                .with_ansi(std::io::stderr().is_terminal());
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
        }
        LogFormat::Jsonl => {
            let json_layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init()
        }
    }
}

/// Initialize logging from the environment, ignoring an existing subscriber.
pub fn init_default_logging() {
    let _ = try_init_logging(&LogConfig::from_env(None, None));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_dotted() {
        for name in [
            event_names::INGEST_STARTED,
            event_names::COUNTER_RESCALE,
            event_names::PHASE_CREATED,
            event_names::PREDICT_LOOKUP_FALLBACK,
        ] {
            assert!(name.contains('.'), "{name}");
        }
    }

    #[test]
    fn test_second_init_is_an_error_not_a_panic() {
        init_default_logging();
        assert!(try_init_logging(&LogConfig::default()).is_err());
    }
}
