//! Settings validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: RewriterSettings → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::RewriterSettings;

pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// One failed semantic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check the settings, collecting every problem found.
pub fn validate_settings(settings: &RewriterSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let search_paths = &settings.store.search_paths;
    if search_paths.is_empty() {
        errors.push(ValidationError::new(
            "store.search_paths",
            "at least one search path is required",
        ));
    }
    let mut seen = HashSet::new();
    for path in search_paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(
                "store.search_paths",
                format!("'{path}' is not absolute"),
            ));
        }
        if !seen.insert(path.trim_end_matches('/')) {
            errors.push(ValidationError::new(
                "store.search_paths",
                format!("'{path}' is listed twice"),
            ));
        }
    }

    if settings.watcher.poll_interval_secs == 0 {
        errors.push(ValidationError::new(
            "watcher.poll_interval_secs",
            "must be greater than zero",
        ));
    }

    let level = settings.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "logging.level",
            format!("unknown level '{}'", settings.logging.level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_settings(&RewriterSettings::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut settings = RewriterSettings::default();
        settings.store.search_paths = vec!["apps".into(), "/libs".into(), "/libs/".into()];
        settings.watcher.poll_interval_secs = 0;
        settings.logging.level = "loud".into();

        let errors = validate_settings(&settings).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "store.search_paths",
                "store.search_paths",
                "watcher.poll_interval_secs",
                "logging.level"
            ]
        );
    }

    #[test]
    fn test_empty_search_paths() {
        let mut settings = RewriterSettings::default();
        settings.store.search_paths.clear();
        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("at least one"));
    }
}
