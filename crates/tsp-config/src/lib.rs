//! Time series profiler settings loading and validation.
//!
//! This crate provides:
//! - Settings file loading (JSON or TOML)
//! - Environment variable overrides
//! - Settings resolution (CLI → env → config dir → XDG → defaults)
//! - Semantic validation

pub mod load;
pub mod resolve;
pub mod validate;

pub use load::{apply_env_overrides, load_settings, SettingsFormat};
pub use resolve::{resolve_settings, ResolvedSettings, SettingsSource};
pub use validate::{validate_settings, ValidationError, ValidationResult};
