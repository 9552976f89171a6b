//! Access cookie reading and `Set-Cookie` rendering.

use std::time::Duration;

use axum::http::header::{InvalidHeaderValue, COOKIE};
use axum::http::{HeaderMap, HeaderValue};

use crate::config::{Environment, SessionConfig};

/// Attributes of the outbound access cookie.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    name: String,
    max_age_secs: u64,
    secure: bool,
}

impl CookiePolicy {
    pub fn new(name: impl Into<String>, max_age: Duration, secure: bool) -> Self {
        Self {
            name: name.into(),
            max_age_secs: max_age.as_secs(),
            secure,
        }
    }

    /// `Secure` is set only for production deployments.
    pub fn from_config(session: &SessionConfig, environment: Environment) -> Self {
        Self::new(
            session.cookie_name.clone(),
            Duration::from_secs(session.ttl_secs),
            environment.is_production(),
        )
    }

    /// Render the `Set-Cookie` value carrying `token`.
    pub fn set_cookie(&self, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut value = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Strict",
            self.name, token, self.max_age_secs
        );
        if self.secure {
            value.push_str("; Secure");
        }
        HeaderValue::from_str(&value)
    }

    /// Current value of this cookie on the request, if any.
    pub fn read<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        read_cookie(headers, &self.name)
    }
}

/// Find cookie `name` across every `Cookie` header.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
}
