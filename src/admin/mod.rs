//! Admin UI protection.
//!
//! # Data Flow
//! ```text
//! /admin/... (not the login page)
//!     → adminToken cookie? no → 302 login?session=expired
//!     → GET {base}/api/admin/auth/me with the cookie
//!         2xx + success:true  → allow
//!         otherwise           → 302 login?session=expired
//!         transport/timeout   → 302 login?session=error
//! ```

pub mod auth;

pub use auth::{AdminAuthError, AdminDecision, AdminVerifier, SessionMarker};
