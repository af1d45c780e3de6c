//! Logging configuration for embedding applications.
//!
//! The level comes from `TSP_LOG`, else from a bare level in `RUST_LOG`; the
//! format from `TSP_LOG_FORMAT`. Explicit arguments win over both.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environment variable selecting the log level.
pub const ENV_LOG: &str = "TSP_LOG";
/// Environment variable selecting the log format.
pub const ENV_LOG_FORMAT: &str = "TSP_LOG_FORMAT";

/// Output shape of log records on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line, for collectors tailing the profiler.
    Jsonl,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Human => "human",
            LogFormat::Jsonl => "jsonl",
        })
    }
}

/// Minimum level of `tsp_core` records.
///
/// `Debug` adds per-cycle events (rescale, rollover, outliers); `Trace` is
/// currently unused by the crate but passed through to the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LogConfig {
    /// Read the process environment, then apply explicit overrides.
    pub fn from_env(level: Option<LogLevel>, format: Option<LogFormat>) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), level, format)
    }

    /// Like [`LogConfig::from_env`] with an injected variable lookup.
    ///
    /// Unparsable values are ignored. `RUST_LOG` is only consulted when it is
    /// a single bare level; target directives are left to the filter itself.
    pub fn from_lookup<F>(lookup: F, level: Option<LogLevel>, format: Option<LogFormat>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_level = lookup(ENV_LOG)
            .or_else(|| lookup("RUST_LOG"))
            .and_then(|v| v.parse().ok());
        let env_format = lookup(ENV_LOG_FORMAT).and_then(|v| v.parse().ok());

        LogConfig {
            format: format.or(env_format).unwrap_or_default(),
            level: level.or(env_level).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Jsonl));
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(" warning ".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("off".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }

    #[test]
    fn test_tsp_log_wins_over_rust_log() {
        let config = LogConfig::from_lookup(env(&[(ENV_LOG, "error"), ("RUST_LOG", "trace")]), None, None);
        assert_eq!(config.level, LogLevel::Error);
    }

    #[test]
    fn test_rust_log_bare_level_only() {
        let bare = LogConfig::from_lookup(env(&[("RUST_LOG", "debug"), (ENV_LOG_FORMAT, "jsonl")]), None, None);
        assert_eq!(bare.level, LogLevel::Debug);
        assert_eq!(bare.format, LogFormat::Jsonl);

        let directive = LogConfig::from_lookup(env(&[("RUST_LOG", "tsp_core=debug")]), None, None);
        assert_eq!(directive.level, LogLevel::Info);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let config = LogConfig::from_lookup(
            env(&[(ENV_LOG, "error")]),
            Some(LogLevel::Trace),
            Some(LogFormat::Jsonl),
        );
        assert_eq!(config.level, LogLevel::Trace);
        assert_eq!(config.format, LogFormat::Jsonl);
    }
}
