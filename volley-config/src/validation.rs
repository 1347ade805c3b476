//! Configuration validation traits and utilities

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

static LABEL_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("label name pattern is valid")
});

/// Trait for validatable configuration
pub trait Validatable {
    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()>;

    /// Get the domain name for error reporting
    fn domain_name(&self) -> &'static str;

    /// Helper to create a domain-specific validation error
    fn validation_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::DomainError {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }
}

/// Validate a positive number
pub fn validate_positive<T>(value: T, field_name: &str, domain: &str) -> ConfigResult<()>
where
    T: PartialOrd + Default + std::fmt::Display,
{
    if value <= T::default() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be greater than 0, got {}", field_name, value),
        });
    }
    Ok(())
}

/// Validate that a duration is at least `min`
pub fn validate_min_duration(
    value: Duration,
    min: Duration,
    field_name: &str,
    domain: &str,
) -> ConfigResult<()> {
    if value < min {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!(
                "{} must be at least {:?}, got {:?}",
                field_name, min, value
            ),
        });
    }
    Ok(())
}

/// Validate telemetry label names
pub fn validate_labels(labels: &HashMap<String, String>, domain: &str) -> ConfigResult<()> {
    for name in labels.keys() {
        if !LABEL_NAME.is_match(name) {
            return Err(ConfigError::DomainError {
                domain: domain.to_string(),
                message: format!(
                    "invalid label name '{}', labels should be [a-z][A-Z][0-9] and _",
                    name
                ),
            });
        }
    }
    Ok(())
}
