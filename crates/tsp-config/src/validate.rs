//! Settings validation errors and semantic validation.

use thiserror::Error;
use tsp_common::Settings;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Settings validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unsupported settings format: {0}")]
    FormatError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::FormatError(_) => 62,
            ValidationError::SemanticError(_) => 63,
            ValidationError::MissingField(_) => 64,
            ValidationError::InvalidValue { .. } => 65,
        }
    }
}

impl From<ValidationError> for tsp_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::IoError(msg) | ValidationError::ParseError(msg) => {
                tsp_common::Error::Config(msg)
            }
            other => tsp_common::Error::InvalidSettings(other.to_string()),
        }
    }
}

fn invalid(field: &str, message: String) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message,
    }
}

/// Validate settings semantically.
pub fn validate_settings(settings: &Settings) -> ValidationResult<()> {
    if settings.states == 0 {
        return Err(invalid("states", "Must be at least 1".to_string()));
    }
    if settings.buffer_size == 0 {
        return Err(invalid("buffersize", "Must be at least 1".to_string()));
    }
    if settings.history == 0 {
        return Err(invalid("history", "Must be at least 1".to_string()));
    }

    if let Some(pos) = settings.period_size.iter().position(|&s| s == 0) {
        return Err(invalid(
            &format!("periodsize[{}]", pos),
            "Period sizes must be positive".to_string(),
        ));
    }

    if let Some(ratio) = settings.period_change_ratio {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(invalid(
                "periodchangeratio",
                format!("Must be in [0, 1], got {}", ratio),
            ));
        }
    }

    if !(0.0..=1.0).contains(&settings.phase_change_likeliness) {
        return Err(invalid(
            "phaseChangeLikeliness",
            format!("Must be in [0, 1], got {}", settings.phase_change_likeliness),
        ));
    }
    if settings.phase_change_history == 0 {
        return Err(invalid("phaseChangeHistory", "Must be at least 1".to_string()));
    }

    if !settings.filter_std_devs.is_finite() {
        return Err(invalid(
            "filterstddevs",
            format!("Must be finite, got {}", settings.filter_std_devs),
        ));
    }

    if settings.fix_bound {
        if !settings.fixed_min.is_finite() || !settings.fixed_max.is_finite() {
            return Err(ValidationError::SemanticError(
                "Fixed bounds must be finite".to_string(),
            ));
        }
        if settings.fixed_min >= settings.fixed_max {
            return Err(ValidationError::SemanticError(format!(
                "fixedmin ({}) must be below fixedmax ({})",
                settings.fixed_min, settings.fixed_max
            )));
        }
    }

    if settings.input_capacity == 0 {
        return Err(invalid("inputcapacity", "Must be at least 1".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn test_zero_states_rejected() {
        let err = validate_settings(&Settings::default().with_states(0)).unwrap_err();
        assert_eq!(err.code(), 65);
        assert!(err.to_string().contains("states"));
    }

    #[test]
    fn test_zero_period_rejected() {
        let s = Settings::default().with_period_size(vec![24, 0]);
        let err = validate_settings(&s).unwrap_err();
        assert!(err.to_string().contains("periodsize[1]"));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let s = Settings::default().with_fixed_bounds(10.0, 10.0);
        let err = validate_settings(&s).unwrap_err();
        assert_eq!(err.code(), 63);
    }

    #[test]
    fn test_likeliness_range() {
        let s = Settings {
            phase_change_likeliness: 1.5,
            ..Settings::default()
        };
        assert!(validate_settings(&s).is_err());
    }

    #[test]
    fn test_converts_into_common_error() {
        let err: tsp_common::Error = invalid("states", "Must be at least 1".into()).into();
        assert_eq!(err.code(), 11);
    }
}
