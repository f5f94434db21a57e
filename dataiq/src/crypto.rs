//! Sealing of connection secrets stored in `data_connection.secure_config`.
//!
//! Format: base64(12-byte nonce ‖ AES-256-GCM ciphertext+tag) over the JSON bytes.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand_core::{OsRng, RngCore};

const NONCE_LEN: usize = 12;

/// Config keys that are sealed instead of stored in the plain `config` column.
pub const SECRET_FIELDS: &[&str] = &["password"];

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption failed")]
    Seal,
    #[error("decryption failed (wrong key or tampered data)")]
    Open,
    #[error("invalid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("sealed value too short")]
    Truncated,
    #[error("invalid secret payload: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn seal_secrets(secrets: &serde_json::Value, key: &[u8; 32]) -> Result<String, CryptoError> {
    let plaintext = serde_json::to_vec(secrets)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new(key.into());
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_ref())
        .map_err(|_| CryptoError::Seal)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(sealed))
}

pub fn open_secrets(sealed: &str, key: &[u8; 32]) -> Result<serde_json::Value, CryptoError> {
    let data = STANDARD.decode(sealed)?;
    if data.len() < NONCE_LEN {
        return Err(CryptoError::Truncated);
    }
    let (nonce, ciphertext) = data.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new(key.into());
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Open)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Move [`SECRET_FIELDS`] out of a connection config object.
/// Returns `(public, secrets)`; non-object input is returned as-is with no secrets.
pub fn split_secrets(mut config: serde_json::Value) -> (serde_json::Value, serde_json::Value) {
    let mut secrets = serde_json::Map::new();
    if let Some(obj) = config.as_object_mut() {
        for field in SECRET_FIELDS {
            if let Some(v) = obj.remove(*field) {
                secrets.insert(field.to_string(), v);
            }
        }
    }
    (config, serde_json::Value::Object(secrets))
}
