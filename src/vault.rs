//! Provider credential encryption.
//!
//! API keys are sealed with AES-256-GCM and persisted as standard base64 of
//! `nonce || ciphertext`. The 32-byte secret comes from a 64-character hex
//! string supplied once at startup; a missing or malformed secret is only
//! reported when a credential is actually touched.

use crate::error::{Error, Result};
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose};

/// Environment variable holding the hex-encoded secret.
pub const ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";

/// Display value for stored keys that cannot be decrypted.
pub const MASK_ERROR: &str = "***ERROR***";

const NONCE_LEN: usize = 12;
const KEY_HEX_LEN: usize = 64;

enum KeyState {
    Ready(Box<Aes256Gcm>),
    Missing,
    Invalid(String),
}

/// Encrypts and decrypts provider credentials.
pub struct SecretVault {
    state: KeyState,
}

impl std::fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            KeyState::Ready(_) => "ready",
            KeyState::Missing => "missing",
            KeyState::Invalid(_) => "invalid",
        };
        f.debug_struct("SecretVault").field("key", &state).finish()
    }
}

impl SecretVault {
    /// Build a vault from an optional hex secret.
    ///
    /// Never fails: problems with the secret surface as `Encryption` errors
    /// from `encrypt`/`decrypt`.
    #[must_use]
    pub fn new(secret: Option<&str>) -> Self {
        let state = match secret.map(str::trim).filter(|s| !s.is_empty()) {
            None => KeyState::Missing,
            Some(hex_key) => match decode_key(hex_key) {
                Ok(key) => KeyState::Ready(Box::new(Aes256Gcm::new(&key.into()))),
                Err(reason) => KeyState::Invalid(reason),
            },
        };
        Self { state }
    }

    /// Vault with no key material; every credential call fails.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            state: KeyState::Missing,
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, KeyState::Ready(_))
    }

    fn cipher(&self) -> Result<&Aes256Gcm> {
        match &self.state {
            KeyState::Ready(cipher) => Ok(cipher),
            KeyState::Missing => Err(Error::Encryption(format!(
                "{ENCRYPTION_KEY_ENV} is not set"
            ))),
            KeyState::Invalid(reason) => Err(Error::Encryption(format!(
                "{ENCRYPTION_KEY_ENV} is invalid: {reason}"
            ))),
        }
    }

    /// Seal a plaintext credential.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = self.cipher()?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| Error::Encryption(format!("encryption failed: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(sealed))
    }

    /// Open a credential produced by [`SecretVault::encrypt`].
    pub fn decrypt(&self, stored: &str) -> Result<String> {
        let cipher = self.cipher()?;
        let sealed = general_purpose::STANDARD
            .decode(stored)
            .map_err(|e| Error::Encryption(format!("stored key is not base64: {e}")))?;

        if sealed.len() < NONCE_LEN {
            return Err(Error::Encryption("stored key is truncated".to_string()));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| Error::Encryption(format!("decryption failed: {e}")))?;

        String::from_utf8(plaintext)
            .map_err(|e| Error::Encryption(format!("decrypted key is not UTF-8: {e}")))
    }
}

fn decode_key(hex_key: &str) -> std::result::Result<[u8; 32], String> {
    if hex_key.len() != KEY_HEX_LEN {
        return Err(format!(
            "expected {KEY_HEX_LEN} hex characters, got {}",
            hex_key.len()
        ));
    }
    let bytes = hex::decode(hex_key).map_err(|e| e.to_string())?;
    bytes
        .try_into()
        .map_err(|_| "decoded key is not 32 bytes".to_string())
}

/// Generate a fresh 64-character hex secret.
#[must_use]
pub fn generate_key() -> String {
    hex::encode(Aes256Gcm::generate_key(&mut OsRng))
}

/// Display-safe rendering of a plaintext credential.
///
/// Short keys are fully hidden; longer ones keep the first 3 and last 4
/// characters.
#[must_use]
pub fn mask_key(plaintext: &str) -> String {
    let chars: Vec<char> = plaintext.chars().collect();
    if chars.len() <= 8 {
        return "********".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
