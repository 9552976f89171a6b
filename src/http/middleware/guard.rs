//! Guard middleware: the per-request dispatcher.
//!
//! Evaluated top to bottom, first decision wins:
//! 0. excluded static paths pass untouched
//! 1. `POST` to a vote endpoint runs proxy detection; a flag is a `403`
//! 2. admin API bypasses everything
//! 3. admin UI needs a live admin session or is redirected to login
//! 4. a matching bypass key skips the session gate
//! 5. session gate, strict for `/api/`, self-healing for pages and clean votes

use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header::SET_COOKIE, HeaderMap},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::admin::{AdminAuthError, AdminDecision, AdminVerifier};
use crate::config::{BypassConfig, GuardConfig};
use crate::http::response;
use crate::observability::metrics;
use crate::routing::{RouteClass, RouteTable};
use crate::security::{ProxyDetector, ReputationClassifier, ReputationError};
use crate::session::{read_cookie, CookiePolicy, GateOutcome, Scope, SessionGate};
use crate::token::TokenCodec;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

const FALLBACK_CLIENT_IP: &str = "127.0.0.1";

#[derive(Debug, Error)]
pub enum GuardInitError {
    #[error("reputation classifier: {0}")]
    Reputation(#[from] ReputationError),

    #[error("admin verifier: {0}")]
    Admin(#[from] AdminAuthError),

    #[error("trusted proxy: {0}")]
    TrustedProxy(#[from] AddrParseError),
}

/// Internal keys that skip the session gate. Empty keys are never matched.
#[derive(Debug, Clone, Default)]
pub struct BypassKeys {
    api_key: Option<String>,
    admin_key: Option<String>,
}

impl BypassKeys {
    pub fn from_config(config: &BypassConfig) -> Self {
        let non_empty = |key: &str| (!key.is_empty()).then(|| key.to_string());
        Self {
            api_key: non_empty(&config.api_key),
            admin_key: non_empty(&config.admin_key),
        }
    }

    pub fn matches(&self, headers: &HeaderMap) -> bool {
        key_matches(headers, API_KEY_HEADER, self.api_key.as_deref())
            || key_matches(headers, ADMIN_KEY_HEADER, self.admin_key.as_deref())
    }
}

fn key_matches(headers: &HeaderMap, header: &str, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return false;
    };
    headers
        .get(header)
        .map(|presented| bool::from(presented.as_bytes().ct_eq(expected.as_bytes())))
        .unwrap_or(false)
}

/// Peers whose forwarding headers are believed.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies(Vec<IpAddr>);

impl TrustedProxies {
    pub fn parse(proxies: &[String]) -> Result<Self, AddrParseError> {
        proxies
            .iter()
            .map(|p| p.parse())
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// An empty list trusts every peer. Without connection info there is no
    /// peer to distrust.
    pub fn trusts(&self, peer: Option<SocketAddr>) -> bool {
        match peer {
            Some(addr) if !self.0.is_empty() => self.0.contains(&addr.ip().to_canonical()),
            _ => true,
        }
    }
}

struct GuardInner {
    routes: RouteTable,
    session: SessionGate,
    detector: ProxyDetector,
    admin: AdminVerifier,
    bypass: BypassKeys,
    proxies: TrustedProxies,
}

/// Shared, immutable guard state.
#[derive(Clone)]
pub struct GuardState {
    inner: Arc<GuardInner>,
}

impl GuardState {
    pub fn new(
        routes: RouteTable,
        session: SessionGate,
        detector: ProxyDetector,
        admin: AdminVerifier,
        bypass: BypassKeys,
        proxies: TrustedProxies,
    ) -> Self {
        Self {
            inner: Arc::new(GuardInner {
                routes,
                session,
                detector,
                admin,
                bypass,
                proxies,
            }),
        }
    }

    pub fn from_config(config: &GuardConfig) -> Result<Self, GuardInitError> {
        let session = SessionGate::new(
            TokenCodec::from_config(&config.session),
            CookiePolicy::from_config(&config.session, config.environment),
        );
        let detector = ProxyDetector::new(ReputationClassifier::from_config(&config.reputation)?);
        let admin = AdminVerifier::from_config(
            &config.admin,
            &config.upstream,
            &config.routes.admin_login_path,
        )?;

        Ok(Self::new(
            RouteTable::from_config(&config.routes),
            session,
            detector,
            admin,
            BypassKeys::from_config(&config.bypass),
            TrustedProxies::parse(&config.listener.trusted_proxies)?,
        ))
    }

    pub fn session(&self) -> &SessionGate {
        &self.inner.session
    }
}

/// Client address: first `x-forwarded-for` hop, then `x-real-ip`, then the
/// TCP peer. Forwarding headers from an untrusted peer are ignored.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, proxies: &TrustedProxies) -> String {
    if !proxies.trusts(peer) {
        if let Some(addr) = peer {
            return addr.ip().to_canonical().to_string();
        }
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("x-forwarded-for")
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
    {
        return first.to_string();
    }
    if let Some(real) = header("x-real-ip") {
        return real.to_string();
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| FALLBACK_CLIENT_IP.to_string())
}

pub async fn guard_middleware(
    State(state): State<GuardState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (route, response) = dispatch(&state.inner, request, next).await;
    if let Some(route) = route {
        metrics::record_request(route, response.status().as_u16());
    }
    response
}

async fn dispatch(
    guard: &GuardInner,
    request: Request<Body>,
    next: Next,
) -> (Option<&'static str>, Response) {
    let path = request.uri().path().to_string();
    if guard.routes.is_excluded(&path) {
        return (None, next.run(request).await);
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer, &guard.proxies);

    let is_vote = guard.routes.is_vote_mutation(request.method(), &path);
    if is_vote {
        let verdict = guard.detector.detect(request.headers(), &ip).await;
        if verdict.is_proxy {
            tracing::warn!(
                client_ip = %ip,
                path = %path,
                reason = verdict.reason.as_deref().unwrap_or("unknown"),
                service = verdict.service.as_deref().unwrap_or("unknown"),
                "Vote blocked: proxy detected"
            );
            return (Some("vote"), response::vote_forbidden());
        }
    }

    let class = guard.routes.classify(&path);
    match class {
        RouteClass::AdminApi => return (Some(class.as_str()), next.run(request).await),
        RouteClass::AdminPage => {
            let admin_token =
                read_cookie(request.headers(), guard.admin.cookie_name()).map(str::to_string);
            let response = match guard.admin.check(admin_token.as_deref()).await {
                AdminDecision::Allow => next.run(request).await,
                AdminDecision::Redirect(marker) => {
                    tracing::info!(path = %path, session = marker.as_str(), "Redirecting to admin login");
                    response::redirect(&guard.admin.login_location(marker))
                }
            };
            return (Some(class.as_str()), response);
        }
        RouteClass::Api | RouteClass::Page => {}
    }

    if guard.bypass.matches(request.headers()) {
        tracing::debug!(path = %path, "Bypass key accepted");
        return (Some("bypass"), next.run(request).await);
    }

    // A vote that passed detection is handled like a page: first-time voters
    // get a cookie instead of a rejection.
    let scope = if class == RouteClass::Api && !is_vote {
        Scope::Api
    } else {
        Scope::Page
    };
    let outcome = match guard.session.evaluate(scope, request.headers(), &ip).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(client_ip = %ip, error = %e, "Session gate failed");
            return (Some(class.as_str()), response::internal_error());
        }
    };

    let response = match outcome {
        GateOutcome::Pass => next.run(request).await,
        GateOutcome::Reissue { token } => match guard.session.cookie().set_cookie(&token) {
            Ok(cookie) => {
                let mut response = next.run(request).await;
                response.headers_mut().append(SET_COOKIE, cookie);
                response
            }
            Err(e) => {
                tracing::error!(error = %e, "Issued token is not a valid header value");
                response::internal_error()
            }
        },
        GateOutcome::Reject { error, token } => match guard.session.cookie().set_cookie(&token) {
            Ok(cookie) => {
                tracing::info!(client_ip = %ip, path = %path, error, "API request rejected");
                response::session_rejected(error, cookie)
            }
            Err(e) => {
                tracing::error!(error = %e, "Issued token is not a valid header value");
                response::internal_error()
            }
        },
    };
    (Some(class.as_str()), response)
}
