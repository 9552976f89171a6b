//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (overlay TOKEN_SECRET, API_KEY, ... from the environment)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; secrets are injected into the
//!   components that need them, never looked up ambiently
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    AdminConfig, BypassConfig, Environment, GuardConfig, ListenerConfig, ObservabilityConfig,
    ReputationConfig, RoutesConfig, SessionConfig, TimeoutConfig, UpstreamConfig,
};
