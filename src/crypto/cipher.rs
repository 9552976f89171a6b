//! PBKDF2 key derivation and AES-256-GCM sealing.
//!
//! Bundle layout: `salt (16) ‖ iv (12) ‖ ciphertext ‖ tag (16)`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::crypto::{CryptoError, CryptoResult, TokenSecret};

pub const SALT_LEN: usize = 16;
pub const IV_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const KEY_LEN: usize = 32;

pub const DEFAULT_KDF_ITERATIONS: u32 = 100_000;

/// Derive a 256-bit key from the secret with PBKDF2-HMAC-SHA256.
pub fn derive_key(secret: &TokenSecret, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, iterations, &mut key);
    key
}

fn cipher_for(secret: &TokenSecret, salt: &[u8], iterations: u32) -> Aes256Gcm {
    let key = derive_key(secret, salt, iterations);
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key))
}

/// Encrypt `plaintext` under a key derived with a fresh random salt.
pub fn encrypt(plaintext: &[u8], secret: &TokenSecret, iterations: u32) -> CryptoResult<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let sealed = cipher_for(secret, &salt, iterations)
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| CryptoError::Encryption)?;

    let mut bundle = Vec::with_capacity(SALT_LEN + IV_LEN + sealed.len());
    bundle.extend_from_slice(&salt);
    bundle.extend_from_slice(&iv);
    bundle.extend_from_slice(&sealed);
    Ok(bundle)
}

/// Open a bundle produced by [`encrypt`].
pub fn decrypt(bundle: &[u8], secret: &TokenSecret, iterations: u32) -> CryptoResult<Vec<u8>> {
    if bundle.len() < SALT_LEN + IV_LEN + TAG_LEN {
        return Err(CryptoError::Truncated(bundle.len()));
    }

    let (salt, rest) = bundle.split_at(SALT_LEN);
    let (iv, sealed) = rest.split_at(IV_LEN);

    cipher_for(secret, salt, iterations)
        .decrypt(Nonce::from_slice(iv), sealed)
        .map_err(|_| CryptoError::Decryption)
}
