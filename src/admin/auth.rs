//! Delegated admin authentication.
//!
//! The admin cookie is opaque to the guard. Its validity is decided by the
//! origin's "who am I" endpoint, called with the cookie forwarded verbatim.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::time::timeout;
use url::Url;

use crate::config::{AdminConfig, UpstreamConfig};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum AdminAuthError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("admin check timed out after {0:?}")]
    Timeout(Duration),

    #[error("undecodable response: {0}")]
    Decode(String),

    #[error("invalid admin auth url: {0}")]
    InvalidUrl(String),
}

/// Marker appended to the login redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMarker {
    /// No cookie, or the endpoint rejected it.
    Expired,
    /// The endpoint could not be asked.
    Error,
}

impl SessionMarker {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMarker::Expired => "expired",
            SessionMarker::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminDecision {
    Allow,
    Redirect(SessionMarker),
}

#[derive(Debug, Deserialize)]
struct WhoAmI {
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Clone)]
pub struct AdminVerifier {
    client: reqwest::Client,
    endpoint: Url,
    cookie_name: String,
    login_path: String,
    timeout: Duration,
}

impl AdminVerifier {
    pub fn from_config(
        admin: &AdminConfig,
        upstream: &UpstreamConfig,
        login_path: &str,
    ) -> Result<Self, AdminAuthError> {
        let base = admin
            .auth_base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", upstream.address));
        let endpoint = Url::parse(&base)
            .and_then(|base| base.join(&admin.auth_path))
            .map_err(|e| AdminAuthError::InvalidUrl(format!("{}: {}", base, e)))?;

        let timeout = Duration::from_millis(admin.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AdminAuthError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            cookie_name: admin.cookie_name.clone(),
            login_path: login_path.to_string(),
            timeout,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Ask the admin endpoint whether `token` is a live admin session.
    ///
    /// `Ok(false)` covers non-2xx responses and `success != true`.
    pub async fn verify(&self, token: &str) -> Result<bool, AdminAuthError> {
        let request = async {
            let response = self
                .client
                .get(self.endpoint.clone())
                .header(
                    reqwest::header::COOKIE,
                    format!("{}={}", self.cookie_name, token),
                )
                .send()
                .await
                .map_err(|e| AdminAuthError::Transport(e.to_string()))?;

            if !response.status().is_success() {
                tracing::debug!(status = %response.status(), "Admin endpoint rejected session");
                return Ok(false);
            }

            let body: WhoAmI = response
                .json()
                .await
                .map_err(|e| AdminAuthError::Decode(e.to_string()))?;
            Ok(body.success)
        };

        match timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(AdminAuthError::Timeout(self.timeout)),
        }
    }

    /// Decide an admin UI request from its admin cookie.
    pub async fn check(&self, token: Option<&str>) -> AdminDecision {
        let Some(token) = token else {
            metrics::record_admin_check("missing");
            return AdminDecision::Redirect(SessionMarker::Expired);
        };

        match self.verify(token).await {
            Ok(true) => {
                metrics::record_admin_check("allowed");
                AdminDecision::Allow
            }
            Ok(false) => {
                metrics::record_admin_check("rejected");
                AdminDecision::Redirect(SessionMarker::Expired)
            }
            Err(e) => {
                tracing::error!(error = %e, endpoint = %self.endpoint, "Admin session check failed");
                metrics::record_admin_check("error");
                AdminDecision::Redirect(SessionMarker::Error)
            }
        }
    }

    /// Relative `Location` for a login redirect.
    pub fn login_location(&self, marker: SessionMarker) -> String {
        format!("{}?session={}", self.login_path, marker.as_str())
    }
}
