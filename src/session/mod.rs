//! Cookie-carried session handling.
//!
//! # Data Flow
//! ```text
//! Request
//!     → cookie.rs (read api_access)
//!     → gate.rs (NoCookie / ValidCookie / InvalidCookie → pass, reissue, reject)
//!     → cookie.rs (render Set-Cookie for reissued tokens)
//! ```
//!
//! # Design Decisions
//! - No server-side session store; the cookie is the only state
//! - Every request re-validates from the token bytes and the current time

pub mod cookie;
pub mod gate;

pub use cookie::{read_cookie, CookiePolicy};
pub use gate::{GateError, GateOutcome, Scope, SessionGate, SessionState};
