//! Security subsystem: proxy, VPN and bot classification.
//!
//! # Data Flow
//! ```text
//! Vote request (headers, client IP):
//!     → headers.rs (cheap, local, synchronous)
//!     → flagged? stop
//!     → reputation.rs (external lookup, credential fallback)
//!     → Verdict { isProxy, reason, service }
//! ```
//!
//! # Design Decisions
//! - Fail closed: if the reputation service cannot answer, the client is
//!   treated as a proxy
//! - Verdicts are produced per request and never cached
//! - No trust in client input

pub mod detector;
pub mod headers;
pub mod reputation;
pub mod verdict;

pub use detector::{ProxyDetector, HEADER_ANALYSIS};
pub use headers::inspect_headers;
pub use reputation::{classify_address, AddressClass, ReputationClassifier, ReputationError};
pub use verdict::Verdict;
