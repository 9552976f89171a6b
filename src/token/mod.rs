//! Access token subsystem.
//!
//! # Data Flow
//! ```text
//! issue(ip):
//!     TokenPayload { ip, id, exp = now + ttl, ts = now, nonce }
//!     → JSON → crypto::encrypt → base64
//!     → crypto::sign(ciphertext "." ts)
//!     → "ciphertext.signature"
//!
//! verify(token, ip):
//!     split → decrypt → parse payload → check signature → check exp → check ip
//! ```
//!
//! # Design Decisions
//! - Fully stateless: nothing about an issued token is remembered
//! - Signature checks need the decrypted `ts`, so they run after decryption
//! - `validate` collapses every failure to `false`; `verify` keeps the reason

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

pub mod codec;
pub mod payload;

pub use codec::TokenCodec;
pub use payload::TokenPayload;

use crate::crypto::CryptoError;

/// Reasons a token is rejected or could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is not two dot-separated fields")]
    Malformed,

    #[error("token could not be decrypted")]
    Decryption,

    #[error("payload field '{0}' is missing or invalid")]
    MalformedPayload(&'static str),

    #[error("token signature mismatch")]
    SignatureMismatch,

    #[error("token expired at {exp}")]
    Expired { exp: i64 },

    #[error("token is bound to a different address")]
    IpMismatch,

    #[error("token encryption failed: {0}")]
    Encryption(CryptoError),

    #[error("payload serialization failed: {0}")]
    Serialization(String),

    #[error("token worker failed: {0}")]
    Worker(String),
}

impl TokenError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::Decryption => "decryption",
            TokenError::MalformedPayload(_) => "malformed_payload",
            TokenError::SignatureMismatch => "signature_mismatch",
            TokenError::Expired { .. } => "expired",
            TokenError::IpMismatch => "ip_mismatch",
            TokenError::Encryption(_) => "encryption",
            TokenError::Serialization(_) => "serialization",
            TokenError::Worker(_) => "worker",
        }
    }
}

pub type TokenResult<T> = Result<T, TokenError>;

/// Current wall-clock time in unix milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
