//! HMAC-SHA256 signing with constant-time verification.

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::crypto::TokenSecret;

type HmacSha256 = Hmac<Sha256>;

/// Sign `data` and return the tag as standard base64.
pub fn sign(data: &str, secret: &TokenSecret) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data.as_bytes());
    general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Recompute the signature over `data` and compare in constant time.
pub fn verify(data: &str, signature: &str, secret: &TokenSecret) -> bool {
    let expected = sign(data, secret);
    bool::from(expected.as_bytes().ct_eq(signature.as_bytes()))
}
