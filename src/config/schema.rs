//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Placeholder token secret used when nothing is configured.
///
/// Accepted in development, rejected by validation in production.
pub const PLACEHOLDER_TOKEN_SECRET: &str = "default-secret-key-change-in-production";

/// Root configuration for the guard.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Deployment environment; controls the cookie `Secure` flag.
    pub environment: Environment,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Origin application that allowed requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Access token and cookie settings.
    pub session: SessionConfig,

    /// Path classification used by the dispatcher.
    pub routes: RoutesConfig,

    /// Internal bypass keys.
    pub bypass: BypassConfig,

    /// External IP reputation service.
    pub reputation: ReputationConfig,

    /// Delegated admin authentication.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" | "test" => Ok(Environment::Development),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Peers allowed to supply `x-forwarded-for` / `x-real-ip`. Empty trusts
    /// every peer; otherwise other peers are identified by their own address.
    pub trusted_proxies: Vec<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            trusted_proxies: Vec::new(),
        }
    }
}

/// Upstream (origin application) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Origin address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Upstream forward timeout in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 20,
        }
    }
}

/// Access token settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Secret used for key derivation and signing.
    pub token_secret: String,

    /// Name of the access cookie.
    pub cookie_name: String,

    /// Token lifetime in seconds; also the cookie Max-Age.
    pub ttl_secs: u64,

    /// PBKDF2 iteration count.
    pub kdf_iterations: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_secret: PLACEHOLDER_TOKEN_SECRET.to_string(),
            cookie_name: "api_access".to_string(),
            ttl_secs: 24 * 60 * 60,
            kdf_iterations: 100_000,
        }
    }
}

/// Path classification.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Exact paths whose POST requests go through proxy detection.
    pub vote_paths: Vec<String>,

    /// Prefix of the API namespace (strict session checks).
    pub api_prefix: String,

    /// Prefix of the admin API (bypasses every check).
    pub admin_api_prefix: String,

    /// Prefix of the admin UI.
    pub admin_prefix: String,

    /// Admin login page, reachable without an admin cookie.
    pub admin_login_path: String,

    /// Prefixes the guard never inspects (static assets).
    pub excluded_prefixes: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            vote_paths: vec![
                "/api/streamers/vote".to_string(),
                "/api/servers/vote".to_string(),
            ],
            api_prefix: "/api/".to_string(),
            admin_api_prefix: "/api/admin/".to_string(),
            admin_prefix: "/admin".to_string(),
            admin_login_path: "/admin/login".to_string(),
            excluded_prefixes: vec![
                "/_next/static".to_string(),
                "/_next/image".to_string(),
                "/favicon.ico".to_string(),
            ],
        }
    }
}

/// Internal bypass keys. Empty means disabled.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BypassConfig {
    /// Compared against the `x-api-key` header.
    pub api_key: String,

    /// Compared against the `x-admin-key` header.
    pub admin_key: String,
}

/// IP reputation service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// Base URL of the service (e.g., "https://pro.ip-api.com").
    pub base_url: String,

    /// Ordered credentials; the first is primary, the rest are fallbacks.
    pub credentials: Vec<String>,

    /// Field mask requested from the service.
    pub fields: u64,

    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,

    /// Service name reported in verdicts.
    pub service_name: String,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://pro.ip-api.com".to_string(),
            credentials: Vec::new(),
            fields: 66_842_623,
            timeout_ms: 3_000,
            service_name: "ip-api.com-pro".to_string(),
        }
    }
}

/// Delegated admin authentication.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Name of the admin cookie.
    pub cookie_name: String,

    /// Path of the "who am I" endpoint.
    pub auth_path: String,

    /// Base URL of the admin API. When unset the upstream address is used.
    pub auth_base_url: Option<String>,

    /// Delegation timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            cookie_name: "adminToken".to_string(),
            auth_path: "/api/admin/auth/me".to_string(),
            auth_base_url: None,
            timeout_ms: 5_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
