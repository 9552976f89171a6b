//! External IP reputation lookup.
//!
//! # Responsibilities
//! - Skip internal addresses without a network call
//! - Query the reputation service with each configured credential in turn
//! - Flag proxy and hosting/datacenter addresses
//! - Fail closed when the service cannot be reached with any credential

use std::net::IpAddr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::time::timeout;

use crate::config::ReputationConfig;
use crate::observability::metrics;
use crate::resilience::CredentialChain;
use crate::security::verdict::Verdict;

/// Errors from a single lookup attempt, or from the whole chain.
#[derive(Debug, Error)]
pub enum ReputationError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("service returned HTTP {0}")]
    Status(u16),

    #[error("undecodable response: {0}")]
    Decode(String),

    #[error("service reported failure: {0}")]
    ServiceFailure(String),

    /// Every credential failed.
    #[error("reputation service unavailable after {attempts} attempt(s)")]
    Unavailable { attempts: usize },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Subset of the service response this classifier uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReputationReport {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub proxy: bool,
    #[serde(default)]
    pub hosting: bool,
}

impl ReputationReport {
    fn into_verdict(self, service: &str) -> Verdict {
        if self.proxy {
            Verdict::flagged("Proxy IP detected").with_service(service)
        } else if self.hosting {
            Verdict::flagged("Hosting/Datacenter IP detected").with_service(service)
        } else {
            Verdict::clean()
        }
    }
}

/// How an address string is treated before any lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    /// Loopback, private, link-local or the `unknown`/`localhost` markers.
    Internal,
    /// Routable address worth a lookup.
    Public(IpAddr),
    /// Not an address at all.
    Invalid,
}

pub fn classify_address(ip: &str) -> AddressClass {
    let ip = ip.trim();
    if ip == "unknown" || ip == "localhost" {
        return AddressClass::Internal;
    }
    match ip.parse::<IpAddr>() {
        Ok(addr) if is_internal(addr) => AddressClass::Internal,
        Ok(addr) => AddressClass::Public(addr),
        Err(_) => AddressClass::Invalid,
    }
}

fn is_internal(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_internal(IpAddr::V4(mapped));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00 // unique local
                || (first & 0xffc0) == 0xfe80 // link local
        }
    }
}

/// Reputation classifier backed by an HTTP service.
#[derive(Debug, Clone)]
pub struct ReputationClassifier {
    client: reqwest::Client,
    base_url: String,
    chain: CredentialChain,
    fields: u64,
    timeout: Duration,
    service_name: String,
}

impl ReputationClassifier {
    pub fn from_config(config: &ReputationConfig) -> Result<Self, ReputationError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .user_agent(concat!("vote-guard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReputationError::Client(e.to_string()))?;

        let chain = CredentialChain::new(config.credentials.clone());
        if chain.is_empty() {
            tracing::warn!("No reputation credentials configured; every public vote will be rejected");
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chain,
            fields: config.fields,
            timeout,
            service_name: config.service_name.clone(),
        })
    }

    /// Classify a client address. Never fails: service outages become a
    /// flagged verdict.
    pub async fn classify(&self, ip: &str) -> Verdict {
        let addr = match classify_address(ip) {
            AddressClass::Internal => {
                tracing::debug!(client_ip = %ip, "Skipping reputation lookup for internal address");
                return Verdict::clean();
            }
            AddressClass::Invalid => {
                tracing::warn!(client_ip = %ip, "Client address is not an IP, treating as proxy");
                return Verdict::flagged("unroutable client address").with_service(&self.service_name);
            }
            AddressClass::Public(addr) => addr,
        };

        match self.lookup(addr).await {
            Ok(report) => report.into_verdict(&self.service_name),
            Err(e) => {
                tracing::warn!(client_ip = %ip, error = %e, "Reputation lookup failed, failing closed");
                Verdict::flagged("reputation service unavailable").with_service(&self.service_name)
            }
        }
    }

    /// Query the service, falling back through the credential chain.
    pub async fn lookup(&self, addr: IpAddr) -> Result<ReputationReport, ReputationError> {
        self.chain
            .run(|_, credential| self.query(addr, credential.to_string()))
            .await
            .map_err(|errors| ReputationError::Unavailable {
                attempts: errors.len(),
            })
    }

    async fn query(&self, addr: IpAddr, credential: String) -> Result<ReputationReport, ReputationError> {
        let url = format!("{}/json/{}", self.base_url, addr);
        let fields = self.fields.to_string();

        let request = async {
            let response = self
                .client
                .get(&url)
                .query(&[("fields", fields.as_str()), ("key", credential.as_str())])
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| ReputationError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ReputationError::Status(status.as_u16()));
            }

            response
                .json::<ReputationReport>()
                .await
                .map_err(|e| ReputationError::Decode(e.to_string()))
        };

        let result = match timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(ReputationError::Timeout(self.timeout)),
        };

        let report = match result {
            Ok(report) if report.status.as_deref() == Some("fail") => {
                Err(ReputationError::ServiceFailure(
                    report.message.unwrap_or_else(|| "unspecified".to_string()),
                ))
            }
            other => other,
        };

        metrics::record_reputation_attempt(match &report {
            Ok(_) => "success",
            Err(ReputationError::Timeout(_)) => "timeout",
            Err(_) => "error",
        });
        report
    }
}
