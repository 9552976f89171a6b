//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, iterations > 0)
//! - Validate addresses and URLs
//! - Refuse development placeholders in production
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::config::schema::{GuardConfig, PLACEHOLDER_TOKEN_SECRET};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
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

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let production = config.environment.is_production();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    for proxy in &config.listener.trusted_proxies {
        if proxy.parse::<IpAddr>().is_err() {
            errors.push(ValidationError::new(
                "listener.trusted_proxies",
                format!("'{}' is not an IP address", proxy),
            ));
        }
    }
    if config.upstream.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "upstream.address",
            format!("'{}' is not a socket address", config.upstream.address),
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be > 0"));
    }

    let session = &config.session;
    if session.token_secret.is_empty() {
        errors.push(ValidationError::new("session.token_secret", "must not be empty"));
    } else if production && session.token_secret == PLACEHOLDER_TOKEN_SECRET {
        errors.push(ValidationError::new(
            "session.token_secret",
            "placeholder secret is not allowed in production",
        ));
    }
    if session.cookie_name.is_empty() {
        errors.push(ValidationError::new("session.cookie_name", "must not be empty"));
    }
    if session.ttl_secs == 0 {
        errors.push(ValidationError::new("session.ttl_secs", "must be > 0"));
    }
    if session.kdf_iterations == 0 {
        errors.push(ValidationError::new("session.kdf_iterations", "must be > 0"));
    }

    let routes = &config.routes;
    let prefixes = [
        ("routes.api_prefix", &routes.api_prefix),
        ("routes.admin_api_prefix", &routes.admin_api_prefix),
        ("routes.admin_prefix", &routes.admin_prefix),
        ("routes.admin_login_path", &routes.admin_login_path),
    ];
    for (field, value) in prefixes {
        if !value.starts_with('/') {
            errors.push(ValidationError::new(field, "must start with '/'"));
        }
    }
    for path in routes.vote_paths.iter().chain(&routes.excluded_prefixes) {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(
                "routes",
                format!("path '{}' must start with '/'", path),
            ));
        }
    }

    let reputation = &config.reputation;
    if url::Url::parse(&reputation.base_url).is_err() {
        errors.push(ValidationError::new(
            "reputation.base_url",
            format!("'{}' is not a URL", reputation.base_url),
        ));
    }
    if reputation.timeout_ms == 0 {
        errors.push(ValidationError::new("reputation.timeout_ms", "must be > 0"));
    }
    if reputation.credentials.is_empty() && production {
        errors.push(ValidationError::new(
            "reputation.credentials",
            "at least one credential is required in production",
        ));
    }

    let admin = &config.admin;
    if let Some(base) = &admin.auth_base_url {
        if url::Url::parse(base).is_err() {
            errors.push(ValidationError::new(
                "admin.auth_base_url",
                format!("'{}' is not a URL", base),
            ));
        }
    }
    if !admin.auth_path.starts_with('/') {
        errors.push(ValidationError::new("admin.auth_path", "must start with '/'"));
    }
    if admin.timeout_ms == 0 {
        errors.push(ValidationError::new("admin.timeout_ms", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
