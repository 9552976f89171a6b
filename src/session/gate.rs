//! Session gate: validate, reissue or reject the access cookie.
//!
//! # States
//! ```text
//!                 Page scope             Api scope
//! NoCookie      → reissue, pass          reissue, 403 "Forbidden2"
//! InvalidCookie → reissue, pass          reissue, 403 "Invalid token"
//! ValidCookie   → pass                   pass
//! ```
//!
//! API requests are never granted on a missing or invalid credential; the
//! reissued cookie lets the client succeed on its next request.

use axum::http::HeaderMap;
use thiserror::Error;

use crate::session::cookie::CookiePolicy;
use crate::token::{TokenCodec, TokenError};

pub const NO_COOKIE_ERROR: &str = "Forbidden2";
pub const INVALID_TOKEN_ERROR: &str = "Invalid token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoCookie,
    ValidCookie,
    InvalidCookie,
}

/// Which rules apply to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Pages self-heal through reissue.
    Page,
    /// API endpoints hard-reject.
    Api,
}

/// What the gate wants done, before any token is minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Pass,
    ReissueAndPass,
    ReissueAndReject(&'static str),
}

/// Pure transition table.
pub fn transition(scope: Scope, state: SessionState) -> Action {
    match (scope, state) {
        (_, SessionState::ValidCookie) => Action::Pass,
        (Scope::Page, _) => Action::ReissueAndPass,
        (Scope::Api, SessionState::NoCookie) => Action::ReissueAndReject(NO_COOKIE_ERROR),
        (Scope::Api, SessionState::InvalidCookie) => Action::ReissueAndReject(INVALID_TOKEN_ERROR),
    }
}

/// Gate decision with the freshly issued token where one was needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Pass,
    Reissue { token: String },
    Reject { error: &'static str, token: String },
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("failed to issue access token: {0}")]
    Issue(#[from] TokenError),
}

#[derive(Debug, Clone)]
pub struct SessionGate {
    codec: TokenCodec,
    cookie: CookiePolicy,
}

impl SessionGate {
    pub fn new(codec: TokenCodec, cookie: CookiePolicy) -> Self {
        Self { codec, cookie }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn cookie(&self) -> &CookiePolicy {
        &self.cookie
    }

    /// Determine the session state of a request.
    pub async fn inspect(&self, headers: &HeaderMap, client_ip: &str) -> SessionState {
        match self.cookie.read(headers) {
            None => SessionState::NoCookie,
            Some(token) if self.codec.validate_blocking(token, client_ip).await => {
                SessionState::ValidCookie
            }
            Some(_) => SessionState::InvalidCookie,
        }
    }

    pub async fn evaluate(
        &self,
        scope: Scope,
        headers: &HeaderMap,
        client_ip: &str,
    ) -> Result<GateOutcome, GateError> {
        let state = self.inspect(headers, client_ip).await;
        let outcome = match transition(scope, state) {
            Action::Pass => GateOutcome::Pass,
            Action::ReissueAndPass => GateOutcome::Reissue {
                token: self.codec.issue_blocking(client_ip).await?,
            },
            Action::ReissueAndReject(error) => GateOutcome::Reject {
                error,
                token: self.codec.issue_blocking(client_ip).await?,
            },
        };

        tracing::debug!(client_ip = %client_ip, ?scope, ?state, "Session gate evaluated");
        Ok(outcome)
    }
}
