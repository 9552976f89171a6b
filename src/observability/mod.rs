//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Client address, route and verdict reason are log fields, never
//!   interpolated into messages
//! - Token contents and secrets are never logged
//! - Request ID flows through via the `x-request-id` header

pub mod logging;
pub mod metrics;
