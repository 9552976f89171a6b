//! Combined proxy detection: local heuristics first, reputation lookup second.

use axum::http::HeaderMap;

use crate::observability::metrics;
use crate::security::headers::inspect_headers;
use crate::security::reputation::ReputationClassifier;
use crate::security::verdict::Verdict;

/// Service label for verdicts produced by header inspection.
pub const HEADER_ANALYSIS: &str = "header_analysis";

#[derive(Debug, Clone)]
pub struct ProxyDetector {
    reputation: ReputationClassifier,
}

impl ProxyDetector {
    pub fn new(reputation: ReputationClassifier) -> Self {
        Self { reputation }
    }

    /// Classify a request. The reputation service is consulted only when the
    /// headers look clean.
    pub async fn detect(&self, headers: &HeaderMap, client_ip: &str) -> Verdict {
        let local = inspect_headers(headers);
        let verdict = if local.is_proxy {
            local.with_service(HEADER_ANALYSIS)
        } else {
            self.reputation.classify(client_ip).await
        };

        metrics::record_verdict(verdict.is_proxy, verdict.service.as_deref());
        verdict
    }
}
