//! Authenticated envelope for private field values, built on XChaCha20-Poly1305.
//! A sealed value is a single standard-base64 token of nonce + ciphertext + tag
//! so it fits on one line of the store file.

use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::Zeroize;

/// Key length required by the cipher.
pub const KEY_LEN: usize = 32;
/// Random nonce prepended to every token.
pub const NONCE_LEN: usize = 24;
/// Poly1305 tag appended by the cipher.
pub const TAG_LEN: usize = 16;
/// Smallest decoded token: an empty plaintext still carries a nonce and a tag.
pub const MIN_TOKEN_LEN: usize = NONCE_LEN + TAG_LEN;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid key length; expected {KEY_LEN} bytes, got {actual}")]
    KeyLength { actual: usize },
    #[error("malformed token: {0}")]
    Format(String),
    #[error("authentication failed; wrong key or tampered token")]
    Authentication,
    #[error("encryption failed: {0}")]
    Encryption(String),
}

/// 32-byte symmetric key supplied by the caller on every store operation.
/// The bytes are wiped when the key is dropped.
#[derive(Clone)]
pub struct SecretKey {
    bytes: [u8; KEY_LEN],
}

impl SecretKey {
    /// Builds a key from raw bytes. Anything other than 32 bytes is rejected.
    pub fn from_bytes(key_bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if key_bytes.len() != KEY_LEN {
            return Err(EnvelopeError::KeyLength {
                actual: key_bytes.len(),
            });
        }
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(key_bytes);
        Ok(Self { bytes })
    }

    pub fn from_array(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(&self.bytes))
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for SecretKey {}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Encrypts `plaintext` under a fresh random nonce and returns the base64 token.
pub fn seal(plaintext: &[u8], key: &SecretKey) -> Result<String, EnvelopeError> {
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext_and_tag = key
        .cipher()
        .encrypt(&nonce, plaintext)
        .map_err(|e| EnvelopeError::Encryption(format!("{e}")))?;

    let mut token = Vec::with_capacity(NONCE_LEN + ciphertext_and_tag.len());
    token.extend_from_slice(&nonce);
    token.extend_from_slice(&ciphertext_and_tag);
    Ok(STANDARD.encode(token))
}

/// Decodes a token produced by [`seal`] and verifies it before returning plaintext.
pub fn open(token: &str, key: &SecretKey) -> Result<Vec<u8>, EnvelopeError> {
    let decoded = STANDARD
        .decode(token.trim().as_bytes())
        .map_err(|e| EnvelopeError::Format(format!("base64 decoding failed: {e}")))?;
    if decoded.len() < MIN_TOKEN_LEN {
        return Err(EnvelopeError::Format(format!(
            "token is {} bytes, shorter than nonce and tag ({MIN_TOKEN_LEN})",
            decoded.len()
        )));
    }

    let (nonce, ciphertext_and_tag) = decoded.split_at(NONCE_LEN);
    key.cipher()
        .decrypt(XNonce::from_slice(nonce), ciphertext_and_tag)
        .map_err(|_| EnvelopeError::Authentication)
}
