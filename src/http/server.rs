//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding handler
//! - Wire up middleware (guard, timeout, request ID, tracing)
//! - Bind server to listener with connect info
//! - Forward allowed requests to the upstream application

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Uri, Version,
    },
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::future::Future;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GuardConfig;
use crate::http::middleware::{guard_middleware, GuardInitError, GuardState};
use crate::http::response;
use crate::observability::metrics;

/// State of the forwarding handler.
#[derive(Clone)]
pub struct UpstreamState {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    timeout: Duration,
}

impl UpstreamState {
    pub fn new(address: &str, timeout: Duration) -> Result<Self, axum::http::uri::InvalidUri> {
        Ok(Self {
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            authority: Authority::from_str(address)?,
            timeout,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Guard(#[from] GuardInitError),

    #[error("invalid upstream address: {0}")]
    Upstream(#[from] axum::http::uri::InvalidUri),
}

/// HTTP front for the origin application.
pub struct HttpServer {
    router: Router,
    guard: GuardState,
}

impl HttpServer {
    pub fn new(config: &GuardConfig) -> Result<Self, ServerError> {
        let guard = GuardState::from_config(config)?;
        let upstream = UpstreamState::new(
            &config.upstream.address,
            Duration::from_secs(config.timeouts.upstream_secs),
        )?;

        let router = Self::build_router(config, guard.clone(), upstream);
        Ok(Self { router, guard })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &GuardConfig, guard: GuardState, upstream: UpstreamState) -> Router {
        Router::new()
            .fallback(forward_handler)
            .with_state(upstream)
            .layer(middleware::from_fn_with_state(guard, guard_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn guard(&self) -> &GuardState {
        &self.guard
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward an allowed request to the upstream application.
async fn forward_handler(State(state): State<UpstreamState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let (mut parts, body) = request.into_parts();
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.authority.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.version = Version::HTTP_11;
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Could not build upstream URI");
            return response::bad_gateway();
        }
    };

    tracing::debug!(request_id = %request_id, uri = %parts.uri, "Forwarding request");

    match tokio::time::timeout(state.timeout, state.client.request(Request::from_parts(parts, body))).await {
        Ok(Ok(upstream)) => {
            metrics::record_upstream(upstream.status().as_u16(), start);
            let (parts, body) = upstream.into_parts();
            Response::from_parts(parts, Body::new(body)).into_response()
        }
        Ok(Err(e)) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_upstream(502, start);
            response::bad_gateway()
        }
        Err(_) => {
            tracing::error!(request_id = %request_id, timeout = ?state.timeout, "Upstream timed out");
            metrics::record_upstream(504, start);
            response::gateway_timeout()
        }
    }
}
