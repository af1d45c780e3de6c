//! Settings file loading and environment overrides.

use std::path::Path;

use tsp_common::Settings;

use crate::validate::{ValidationError, ValidationResult};

/// Environment variable names for individual overrides.
pub const ENV_STATES: &str = "TSP_STATES";
pub const ENV_BUFFER_SIZE: &str = "TSP_BUFFER_SIZE";
pub const ENV_HISTORY: &str = "TSP_HISTORY";
pub const ENV_PERIOD_SIZE: &str = "TSP_PERIOD_SIZE";
pub const ENV_PHASE_LIKELINESS: &str = "TSP_PHASE_LIKELINESS";
pub const ENV_PHASE_HISTORY: &str = "TSP_PHASE_HISTORY";

/// On-disk settings formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    Json,
    Toml,
}

impl SettingsFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> ValidationResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(SettingsFormat::Json),
            Some("toml") => Ok(SettingsFormat::Toml),
            other => Err(ValidationError::FormatError(format!(
                "{} (extension {:?}, expected .json or .toml)",
                path.display(),
                other.unwrap_or("")
            ))),
        }
    }

    pub fn parse(self, content: &str) -> ValidationResult<Settings> {
        match self {
            SettingsFormat::Json => serde_json::from_str(content)
                .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e))),
            SettingsFormat::Toml => toml::from_str(content)
                .map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e))),
        }
    }
}

/// Load settings from a `.json` or `.toml` file. Missing fields take their
/// defaults.
pub fn load_settings(path: &Path) -> ValidationResult<Settings> {
    let format = SettingsFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| {
        ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    format.parse(&content)
}

/// Apply `TSP_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut Settings) -> ValidationResult<()> {
    apply_overrides_with(settings, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary lookup.
pub fn apply_overrides_with<F>(settings: &mut Settings, lookup: F) -> ValidationResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(ENV_STATES) {
        settings.states = parse_number(ENV_STATES, &v)?;
    }
    if let Some(v) = lookup(ENV_BUFFER_SIZE) {
        settings.buffer_size = parse_number(ENV_BUFFER_SIZE, &v)?;
    }
    if let Some(v) = lookup(ENV_HISTORY) {
        settings.history = parse_number(ENV_HISTORY, &v)?;
    }
    if let Some(v) = lookup(ENV_PERIOD_SIZE) {
        settings.period_size = v
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| parse_number(ENV_PERIOD_SIZE, part))
            .collect::<ValidationResult<Vec<usize>>>()?;
    }
    if let Some(v) = lookup(ENV_PHASE_LIKELINESS) {
        settings.phase_change_likeliness = parse_number(ENV_PHASE_LIKELINESS, &v)?;
    }
    if let Some(v) = lookup(ENV_PHASE_HISTORY) {
        settings.phase_change_history = parse_number(ENV_PHASE_HISTORY, &v)?;
    }
    Ok(())
}

fn parse_number<T>(field: &str, raw: &str) -> ValidationResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("{:?}: {}", raw, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            SettingsFormat::from_path(Path::new("a/settings.json")).unwrap(),
            SettingsFormat::Json
        );
        assert_eq!(
            SettingsFormat::from_path(Path::new("settings.toml")).unwrap(),
            SettingsFormat::Toml
        );
        assert_eq!(
            SettingsFormat::from_path(Path::new("settings.yaml"))
                .unwrap_err()
                .code(),
            62
        );
    }

    #[test]
    fn test_parse_toml() {
        let s = SettingsFormat::Toml
            .parse("states = 6\nperiodsize = [24, 60]\nfixbound = true\nfixedmin = 0.0\nfixedmax = 50.0\n")
            .unwrap();
        assert_eq!(s.states, 6);
        assert_eq!(s.period_size, vec![24, 60]);
        assert_eq!(s.fixed_bounds(), Some((0.0, 50.0)));
    }

    #[test]
    fn test_overrides() {
        let mut s = Settings::default();
        apply_overrides_with(
            &mut s,
            lookup(&[
                (ENV_STATES, "8"),
                (ENV_PERIOD_SIZE, "7, 24,60"),
                (ENV_PHASE_LIKELINESS, "0.75"),
            ]),
        )
        .unwrap();
        assert_eq!(s.states, 8);
        assert_eq!(s.period_size, vec![7, 24, 60]);
        assert_eq!(s.phase_change_likeliness, 0.75);
        assert_eq!(s.history, 1);
    }

    #[test]
    fn test_bad_override_names_variable() {
        let mut s = Settings::default();
        let err = apply_overrides_with(&mut s, lookup(&[(ENV_HISTORY, "two")])).unwrap_err();
        assert!(err.to_string().contains(ENV_HISTORY));
    }
}
