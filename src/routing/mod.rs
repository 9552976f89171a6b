//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (excluded? vote mutation? route class)
//!     → matcher.rs (evaluate match conditions)
//!
//! Route Compilation (at startup):
//!     RoutesConfig
//!     → Compile matchers (prefixes, exact paths, method)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always yields the same class

pub mod matcher;
pub mod router;

pub use router::{RouteClass, RouteTable};
