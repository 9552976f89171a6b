//! Configuration loading from disk and process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GuardConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from a TOML file, apply environment overrides and validate.
pub fn load_config(path: &Path) -> Result<GuardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GuardConfig = toml::from_str(&content)?;
    finish(config)
}

/// Build configuration without a file: defaults plus environment overrides.
pub fn load_from_env() -> Result<GuardConfig, ConfigError> {
    finish(GuardConfig::default())
}

fn finish(mut config: GuardConfig) -> Result<GuardConfig, ConfigError> {
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay secrets and deployment settings from the environment.
///
/// `lookup` is injected so the mapping can be tested without touching the
/// real process environment.
pub fn apply_env_overrides<F>(config: &mut GuardConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(secret) = lookup("TOKEN_SECRET").filter(|v| !v.is_empty()) {
        config.session.token_secret = secret;
    }
    if let Some(key) = lookup("API_KEY") {
        config.bypass.api_key = key;
    }
    if let Some(key) = lookup("ADMIN_KEY") {
        config.bypass.admin_key = key;
    }
    if let Some(keys) = lookup("REPUTATION_KEYS") {
        config.reputation.credentials = keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(env) = lookup("APP_ENV") {
        match env.parse() {
            Ok(parsed) => config.environment = parsed,
            Err(e) => tracing::warn!(error = %e, "Ignoring APP_ENV"),
        }
    }
}
