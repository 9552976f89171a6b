//! Vote guard: stateless cookie sessions and proxy detection in front of a
//! voting application.

pub mod admin;
pub mod config;
pub mod crypto;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;
pub mod session;
pub mod token;

pub use config::GuardConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
