//! Plaintext token payload.

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::token::{TokenError, TokenResult};

const NONCE_LEN: usize = 13;
const NONCE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Claims carried inside the encrypted token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Client address the token is bound to.
    pub ip: String,
    /// Unique per issuance.
    pub id: Uuid,
    /// Expiry, unix milliseconds.
    pub exp: i64,
    /// Issue time, unix milliseconds rendered as a string. Part of the signed data.
    pub ts: String,
    /// Random filler; only its presence is checked.
    pub nonce: String,
}

impl TokenPayload {
    /// Build a fresh payload issued at `now_ms`.
    pub fn new(ip: impl Into<String>, now_ms: i64, ttl_ms: i64) -> Self {
        Self {
            ip: ip.into(),
            id: Uuid::new_v4(),
            exp: now_ms.saturating_add(ttl_ms),
            ts: now_ms.to_string(),
            nonce: random_nonce(),
        }
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.exp < now_ms
    }

    pub fn to_json(&self) -> TokenResult<String> {
        serde_json::to_string(self).map_err(|e| TokenError::Serialization(e.to_string()))
    }

    /// Parse decrypted bytes, reporting the first missing or empty field.
    pub fn from_json(bytes: &[u8]) -> TokenResult<Self> {
        let raw: RawPayload =
            serde_json::from_slice(bytes).map_err(|_| TokenError::MalformedPayload("json"))?;

        let ip = non_empty(raw.ip).ok_or(TokenError::MalformedPayload("ip"))?;
        let id = non_empty(raw.id)
            .and_then(|id| Uuid::parse_str(&id).ok())
            .ok_or(TokenError::MalformedPayload("id"))?;
        let exp = raw
            .exp
            .filter(|exp| *exp != 0)
            .ok_or(TokenError::MalformedPayload("exp"))?;
        let ts = non_empty(raw.ts).ok_or(TokenError::MalformedPayload("ts"))?;
        let nonce = non_empty(raw.nonce).ok_or(TokenError::MalformedPayload("nonce"))?;

        Ok(Self { ip, id, exp, ts, nonce })
    }
}

/// Lenient mirror of [`TokenPayload`] so absent fields can be named.
#[derive(Deserialize)]
struct RawPayload {
    ip: Option<String>,
    id: Option<String>,
    exp: Option<i64>,
    ts: Option<String>,
    nonce: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn random_nonce() -> String {
    let mut rng = rand::thread_rng();
    (0..NONCE_LEN)
        .map(|_| NONCE_ALPHABET[rng.gen_range(0..NONCE_ALPHABET.len())] as char)
        .collect()
}
