//! Token issuance and validation.
//!
//! Wire form: `base64(salt‖iv‖ciphertext) "." base64(hmac(ciphertext_b64 "." ts))`.

use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};

use crate::config::SessionConfig;
use crate::crypto::{self, TokenSecret};
use crate::observability::metrics;
use crate::token::payload::TokenPayload;
use crate::token::{now_millis, TokenError, TokenResult};

/// Stateless encoder/decoder for access tokens.
///
/// Cheap to clone; holds only the injected secret and parameters.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    secret: TokenSecret,
    ttl_ms: i64,
    iterations: u32,
}

impl TokenCodec {
    pub fn new(secret: TokenSecret, ttl: Duration, iterations: u32) -> Self {
        Self {
            secret,
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            iterations,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            TokenSecret::new(config.token_secret.clone()),
            Duration::from_secs(config.ttl_secs),
            config.kdf_iterations,
        )
    }

    /// Issue a token bound to `ip`.
    pub fn issue(&self, ip: &str) -> TokenResult<String> {
        self.issue_at(ip, now_millis())
    }

    /// Issue a token as if the current time were `now_ms`.
    pub fn issue_at(&self, ip: &str, now_ms: i64) -> TokenResult<String> {
        let payload = TokenPayload::new(ip, now_ms, self.ttl_ms);
        self.seal(&payload)
    }

    /// Encrypt and sign an arbitrary payload.
    pub fn seal(&self, payload: &TokenPayload) -> TokenResult<String> {
        let json = payload.to_json()?;
        let bundle = crypto::encrypt(json.as_bytes(), &self.secret, self.iterations)
            .map_err(TokenError::Encryption)?;
        let ciphertext = general_purpose::STANDARD.encode(bundle);

        let signature = crypto::sign(&signed_data(&ciphertext, &payload.ts), &self.secret);
        Ok(format!("{}.{}", ciphertext, signature))
    }

    /// Fully check a token and return its payload.
    pub fn verify(&self, token: &str, expected_ip: &str) -> TokenResult<TokenPayload> {
        self.verify_at(token, expected_ip, now_millis())
    }

    pub fn verify_at(&self, token: &str, expected_ip: &str, now_ms: i64) -> TokenResult<TokenPayload> {
        let (ciphertext, signature) = token
            .split_once('.')
            .filter(|(c, s)| !c.is_empty() && !s.is_empty())
            .ok_or(TokenError::Malformed)?;

        let bundle = general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|_| TokenError::Decryption)?;
        let plaintext = crypto::decrypt(&bundle, &self.secret, self.iterations)
            .map_err(|_| TokenError::Decryption)?;

        let payload = TokenPayload::from_json(&plaintext)?;

        if !crypto::verify(&signed_data(ciphertext, &payload.ts), signature, &self.secret) {
            return Err(TokenError::SignatureMismatch);
        }
        if payload.is_expired_at(now_ms) {
            return Err(TokenError::Expired { exp: payload.exp });
        }
        if payload.ip != expected_ip {
            return Err(TokenError::IpMismatch);
        }

        Ok(payload)
    }

    /// Boolean view of [`verify`](Self::verify). Never fails.
    pub fn validate(&self, token: &str, expected_ip: &str) -> bool {
        match self.verify(token, expected_ip) {
            Ok(_) => true,
            Err(err) => {
                match err {
                    TokenError::SignatureMismatch | TokenError::Decryption => {
                        tracing::warn!(reason = err.kind(), client_ip = %expected_ip, "Token rejected, possible tampering");
                    }
                    _ => {
                        tracing::debug!(reason = err.kind(), client_ip = %expected_ip, error = %err, "Token rejected");
                    }
                }
                metrics::record_token_rejected(err.kind());
                false
            }
        }
    }

    /// [`issue`](Self::issue) on the blocking pool.
    pub async fn issue_blocking(&self, ip: &str) -> TokenResult<String> {
        let codec = self.clone();
        let ip = ip.to_string();
        let token = tokio::task::spawn_blocking(move || codec.issue(&ip))
            .await
            .map_err(|e| TokenError::Worker(e.to_string()))??;
        metrics::record_token_issued();
        Ok(token)
    }

    /// [`validate`](Self::validate) on the blocking pool.
    pub async fn validate_blocking(&self, token: &str, expected_ip: &str) -> bool {
        let codec = self.clone();
        let token = token.to_string();
        let ip = expected_ip.to_string();
        match tokio::task::spawn_blocking(move || codec.validate(&token, &ip)).await {
            Ok(valid) => valid,
            Err(e) => {
                tracing::error!(error = %e, "Token validation worker failed");
                false
            }
        }
    }
}

fn signed_data(ciphertext: &str, ts: &str) -> String {
    format!("{}.{}", ciphertext, ts)
}
