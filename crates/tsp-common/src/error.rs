//! Error types for the time series profiler.
//!
//! Errors carry:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for callers driving long-running ingestion
//!
//! Lookup misses and invalid buckets are *not* errors: the pipeline recovers
//! from them locally and logs. Only conditions the caller must act on surface
//! here, most notably the complete absence of model data during simulation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for profiler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Settings and configuration errors.
    Config,
    /// Sample ingestion and profiler lifecycle errors.
    Ingestion,
    /// Errors addressing the learned model (metrics, tree paths).
    Model,
    /// Simulation and likeliness projection errors.
    Prediction,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Ingestion => write!(f, "ingestion"),
            ErrorCategory::Model => write!(f, "model"),
            ErrorCategory::Prediction => write!(f, "prediction"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for the time series profiler.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    // Ingestion errors (20-29)
    #[error("profiler has been terminated")]
    ProfilerTerminated,

    #[error("failed to start background worker: {0}")]
    WorkerSpawn(String),

    // Model errors (30-39)
    #[error("metric {metric} not found in transition matrices")]
    MetricNotFound { metric: String },

    #[error("period tree path {path:?} is out of bounds")]
    PeriodPathOutOfBounds { path: Vec<usize> },

    // Prediction errors (40-49)
    #[error("no transition data for metric {metric} (history {history:?})")]
    NoTransitionData { metric: String, history: String },

    #[error("phase {phase} not present in profile ({available} phases)")]
    PhaseOutOfRange { phase: usize, available: usize },

    #[error("cannot sample from an empty distribution: {0}")]
    EmptyDistribution(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Ingestion errors
    /// - 30-39: Model errors
    /// - 40-49: Prediction errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidSettings(_) => 11,
            Error::ProfilerTerminated => 20,
            Error::WorkerSpawn(_) => 21,
            Error::MetricNotFound { .. } => 30,
            Error::PeriodPathOutOfBounds { .. } => 31,
            Error::NoTransitionData { .. } => 40,
            Error::PhaseOutOfRange { .. } => 41,
            Error::EmptyDistribution(_) => 42,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidSettings(_) => ErrorCategory::Config,

            Error::ProfilerTerminated | Error::WorkerSpawn(_) => ErrorCategory::Ingestion,

            Error::MetricNotFound { .. } | Error::PeriodPathOutOfBounds { .. } => {
                ErrorCategory::Model
            }

            Error::NoTransitionData { .. }
            | Error::PhaseOutOfRange { .. }
            | Error::EmptyDistribution(_) => ErrorCategory::Prediction,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// Recoverable errors may be resolved by fixing the settings, feeding more
    /// data before simulating, or retrying the I/O.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::InvalidSettings(_) => true,

            // A terminated profiler never accepts input again
            Error::ProfilerTerminated => false,
            Error::WorkerSpawn(_) => true,

            Error::MetricNotFound { .. } => true,
            Error::PeriodPathOutOfBounds { .. } => true,

            // More profiling data fills the missing rows
            Error::NoTransitionData { .. } => true,
            Error::PhaseOutOfRange { .. } => true,
            Error::EmptyDistribution(_) => true,

            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(Error::Config("x".into()).code(), 10);
        assert_eq!(Error::ProfilerTerminated.code(), 20);
        assert_eq!(
            Error::NoTransitionData {
                metric: "cpu".into(),
                history: "1-2".into()
            }
            .code(),
            40
        );
    }

    #[test]
    fn test_error_category() {
        assert_eq!(Error::InvalidSettings("x".into()).category(), ErrorCategory::Config);
        assert_eq!(
            Error::MetricNotFound { metric: "io".into() }.category(),
            ErrorCategory::Model
        );
        assert_eq!(
            Error::PhaseOutOfRange { phase: 3, available: 2 }.category(),
            ErrorCategory::Prediction
        );
    }

    #[test]
    fn test_error_recoverable() {
        assert!(!Error::ProfilerTerminated.is_recoverable());
        assert!(Error::EmptyDistribution("row".into()).is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = Error::PhaseOutOfRange { phase: 3, available: 2 };
        assert_eq!(err.to_string(), "phase 3 not present in profile (2 phases)");
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Prediction.to_string(), "prediction");
        assert_eq!(
            serde_json::to_string(&ErrorCategory::Ingestion).unwrap(),
            "\"ingestion\""
        );
    }
}
