//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, tracing)
//!     → middleware/guard.rs (vote check, admin check, bypass, session gate)
//!     → server.rs forward_handler (upstream application)
//!     → response.rs (guard-produced rejections and redirects)
//!     → Send to client
//! ```

pub mod middleware;
pub mod response;
pub mod server;

pub use server::{HttpServer, ServerError, UpstreamState};
