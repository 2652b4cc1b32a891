//! Cryptographic envelope for vaultsync.
//!
//! Every path, hash, and content field that crosses the wire is sealed
//! with a key derived from the vault password and salt:
//! - scrypt (N=32768, r=8, p=1) key derivation, 32-byte output
//! - AES-256-GCM with a fresh random 96-bit nonce prepended to each
//!   ciphertext
//! - hex(SHA-256(key)) as the login keyhash
//!
//! Derivation is deliberately expensive, so the key is derived once per
//! session and cached in a [`SessionKey`] rather than re-derived per
//! field. Key material is zeroized on drop.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Nonce size for AES-GCM (96 bits = 12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Derived key size (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// Crypto errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed (wrong key or tampered ciphertext).
    #[error("decryption failed: authentication error")]
    AuthenticationFailed,

    /// A hex-encoded wire field did not decode.
    #[error("hex field did not decode: {0}")]
    Hex(#[from] hex::FromHexError),

    /// A decrypted string field was not valid UTF-8.
    #[error("decrypted value is not valid utf-8")]
    NotUtf8,
}

/// The symmetric key for one session with one vault.
///
/// Derived once from (password, salt); never persisted; zeroized when
/// the session ends.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; KEY_SIZE]);

impl SessionKey {
    /// Derive the session key with scrypt (N=32768, r=8, p=1).
    ///
    /// Deterministic: the same password and salt always yield the same
    /// key.
    pub fn derive(password: &str, salt: &str) -> Result<Self, CryptoError> {
        // log2(32768) = 15
        let params = scrypt::Params::new(15, 8, 1, KEY_SIZE)
            .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
        let mut key = [0u8; KEY_SIZE];
        scrypt::scrypt(password.as_bytes(), salt.as_bytes(), &params, &mut key)
            .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
        Ok(Self(key))
    }

    /// hex(SHA-256(key)), the login credential proof.
    ///
    /// Proves knowledge of the vault password without being reversible
    /// to it.
    pub fn key_hash(&self) -> String {
        hex::encode(Sha256::digest(self.0))
    }

    /// Seal a payload: fresh random nonce prepended to
    /// ciphertext+tag. Nondeterministic for identical input.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::EncryptionFailed("aead encrypt failed".into()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Open a sealed payload.
    ///
    /// Empty input yields empty output: the wire uses an empty field to
    /// mean "no value" (folder hashes, for instance). Tampered data or
    /// a key derived from the wrong password fails with
    /// [`CryptoError::AuthenticationFailed`].
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.is_empty() {
            return Ok(Vec::new());
        }
        if sealed.len() < NONCE_SIZE {
            return Err(CryptoError::AuthenticationFailed);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::AuthenticationFailed)
    }

    /// Open a hex-encoded sealed field (wire `path` and `hash` fields).
    pub fn decrypt_hex(&self, field: &str) -> Result<Vec<u8>, CryptoError> {
        self.decrypt(&hex::decode(field)?)
    }

    /// Open a hex-encoded sealed field and interpret it as UTF-8.
    pub fn decrypt_hex_string(&self, field: &str) -> Result<String, CryptoError> {
        String::from_utf8(self.decrypt_hex(field)?).map_err(|_| CryptoError::NotUtf8)
    }
}

// Keep key bytes out of Debug output.
impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKey([REDACTED])")
    }
}

/// SHA-256 of plaintext content, as carried (encrypted) in push
/// descriptors and verified after pulls.
pub fn content_hash(content: &[u8]) -> Vec<u8> {
    Sha256::digest(content).to_vec()
}
