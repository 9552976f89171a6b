//! Credential fallback policy.
//!
//! # Responsibilities
//! - Try an operation with each credential in order
//! - Stop at the first success
//! - Report every failure when the list is exhausted
//!
//! # Design Decisions
//! - No backoff between attempts: the next attempt uses a different
//!   credential, not the same one again
//! - The caller decides what exhaustion means (the reputation classifier
//!   turns it into a fail-closed verdict)

use std::fmt::Display;
use std::future::Future;

/// Ordered list of credentials; the first is primary.
#[derive(Debug, Clone, Default)]
pub struct CredentialChain {
    credentials: Vec<String>,
}

impl CredentialChain {
    pub fn new(credentials: Vec<String>) -> Self {
        Self { credentials }
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Run `op` with each credential until one succeeds.
    ///
    /// `op` receives the zero-based attempt index and the credential.
    /// On exhaustion every attempt's error is returned in order; an empty
    /// chain returns an empty list.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, Vec<E>>
    where
        F: FnMut(usize, &str) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut errors = Vec::with_capacity(self.credentials.len());
        for (attempt, credential) in self.credentials.iter().enumerate() {
            match op(attempt, credential).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(attempt = attempt + 1, error = %e, "Attempt failed, trying next credential");
                    errors.push(e);
                }
            }
        }
        Err(errors)
    }
}
