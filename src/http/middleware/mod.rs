//! Request middleware.

pub mod guard;

pub use guard::{client_ip, guard_middleware, BypassKeys, GuardInitError, GuardState, TrustedProxies};
