//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an external dependency:
//!     → tokio::time::timeout (every attempt has a deadline)
//!     → On failure: retries.rs (next credential in the chain)
//!     → Exhausted: caller's fail-closed default
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Deterministic failures (token decode/validate) are never retried

pub mod retries;

pub use retries::CredentialChain;
