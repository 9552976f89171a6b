//! Key derivation and token primitives.
//!
//! # Data Flow
//! ```text
//! TokenSecret (injected at startup)
//!     → cipher.rs (PBKDF2-HMAC-SHA256 → AES-256-GCM, salt‖iv‖ciphertext)
//!     → signature.rs (HMAC-SHA256, base64, constant-time verify)
//! ```
//!
//! # Design Decisions
//! - Fresh salt and IV for every encryption; the key is re-derived per call
//! - The GCM tag is the primary tamper check; the HMAC binds the issue
//!   timestamp to the ciphertext
//! - Everything here is synchronous and CPU-bound; async callers go through
//!   `spawn_blocking` (see `token::codec`)

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub mod cipher;
pub mod signature;

pub use cipher::{decrypt, derive_key, encrypt, DEFAULT_KDF_ITERATIONS};
pub use signature::{sign, verify};

/// Shared secret used for both key derivation and signing.
#[derive(Clone)]
pub struct TokenSecret(Arc<str>);

impl TokenSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Arc::from(secret.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenSecret(<redacted>)")
    }
}

/// Errors from the symmetric primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Bundle is shorter than salt + IV + tag.
    #[error("ciphertext bundle truncated ({0} bytes)")]
    Truncated(usize),

    /// Integrity tag did not verify (tampering or wrong secret).
    #[error("decryption failed")]
    Decryption,

    #[error("encryption failed")]
    Encryption,
}

pub type CryptoResult<T> = Result<T, CryptoError>;
