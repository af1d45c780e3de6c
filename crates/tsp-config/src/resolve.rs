//! Settings resolution and path discovery.
//!
//! Resolution order: CLI argument → `TSP_SETTINGS` → `TSP_CONFIG_DIR` →
//! XDG config directory → built-in defaults. Environment overrides and
//! validation run on whatever was found.

use std::path::{Path, PathBuf};

use tsp_common::Settings;

use crate::load::{apply_env_overrides, load_settings};
use crate::validate::{validate_settings, ValidationResult};

/// Where the settings came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SettingsSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Named by an environment variable.
    Environment,

    /// Found in the XDG config directory.
    XdgConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for SettingsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsSource::CliArgument => write!(f, "CLI argument"),
            SettingsSource::Environment => write!(f, "environment variable"),
            SettingsSource::XdgConfig => write!(f, "XDG config"),
            SettingsSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Resolved, overridden and validated settings.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub settings: Settings,
    pub source: SettingsSource,
    /// File the settings were read from, if any.
    pub path: Option<PathBuf>,
}

/// Environment variable naming a settings file.
pub const ENV_SETTINGS_PATH: &str = "TSP_SETTINGS";
/// Environment variable naming a directory holding a settings file.
pub const ENV_CONFIG_DIR: &str = "TSP_CONFIG_DIR";

/// Settings file names probed inside config directories, in order.
const SETTINGS_FILENAMES: [&str; 2] = ["settings.toml", "settings.json"];

/// Application name for XDG directories.
const APP_NAME: &str = "tsprofiler";

/// Resolve, load, override and validate settings.
pub fn resolve_settings(cli_path: Option<&Path>) -> ValidationResult<ResolvedSettings> {
    let (path, source) = resolve_settings_path(cli_path);
    let mut settings = match &path {
        Some(p) => load_settings(p)?,
        None => Settings::default(),
    };
    apply_env_overrides(&mut settings)?;
    validate_settings(&settings)?;
    Ok(ResolvedSettings {
        settings,
        source,
        path,
    })
}

/// Find the settings file to use, without reading it.
pub fn resolve_settings_path(cli_path: Option<&Path>) -> (Option<PathBuf>, SettingsSource) {
    // 1. CLI argument
    if let Some(path) = cli_path {
        if path.exists() {
            return (Some(path.to_path_buf()), SettingsSource::CliArgument);
        }
    }

    // 2. Environment variable (direct path)
    if let Ok(env_path) = std::env::var(ENV_SETTINGS_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return (Some(path), SettingsSource::Environment);
        }
    }

    // 3. Environment variable (config dir)
    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        if let Some(path) = find_in_dir(Path::new(&config_dir)) {
            return (Some(path), SettingsSource::Environment);
        }
    }

    // 4. XDG config directory
    if let Some(dir) = xdg_config_dir() {
        if let Some(path) = find_in_dir(&dir) {
            return (Some(path), SettingsSource::XdgConfig);
        }
    }

    (None, SettingsSource::BuiltinDefault)
}

/// The XDG config directory for the profiler.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

fn find_in_dir(dir: &Path) -> Option<PathBuf> {
    SETTINGS_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}
