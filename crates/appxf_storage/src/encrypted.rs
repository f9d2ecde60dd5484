//! Content layers and AES-256-GCM encryption.
//!
//! A [`Layer`] transforms the primary bytes of a storage on their way to
//! and from the base storage. Auxiliary siblings (metadata, sync records)
//! bypass layers and stay readable at the root of the chain.
//!
//! ## Security Model
//!
//! - Each store is encrypted independently with a fresh random nonce
//! - Layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`
//! - Keys are never stored; they must be provided by the application

use crate::error::{StorageError, StorageResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// A reversible transform of primary content.
pub trait Layer: Send + Sync + fmt::Debug {
    /// Storage kind of storages built with this layer.
    fn kind(&self) -> &str;

    /// Transforms plain bytes before they reach the base storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the transform fails.
    fn seal(&self, plain: &[u8]) -> StorageResult<Vec<u8>>;

    /// Reverses [`Layer::seal`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes were not produced by `seal` with the
    /// same configuration, or were modified.
    fn open(&self, sealed: &[u8]) -> StorageResult<Vec<u8>>;
}

/// Encryption key for [`EncryptionLayer`].
///
/// The key is zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Generates a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(StorageError::encryption(format!(
                "invalid key size: expected {KEY_SIZE}, got {}",
                bytes.len()
            )));
        }
        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Returns the key bytes. Don't log or persist the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Layer encrypting primary content with AES-256-GCM.
///
/// # Example
///
/// ```rust
/// use appxf_storage::{EncryptionKey, EncryptionLayer, Layer};
///
/// let layer = EncryptionLayer::new(EncryptionKey::generate());
/// let sealed = layer.seal(b"secret").unwrap();
/// assert_eq!(layer.open(&sealed).unwrap(), b"secret");
/// ```
pub struct EncryptionLayer {
    cipher: Aes256Gcm,
}

impl EncryptionLayer {
    /// Kind of storages built with this layer.
    pub const KIND: &'static str = "EncryptedStorage";

    /// Creates a layer for the given key.
    #[must_use]
    pub fn new(key: EncryptionKey) -> Self {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
        Self { cipher }
    }
}

impl fmt::Debug for EncryptionLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionLayer").finish_non_exhaustive()
    }
}

impl Layer for EncryptionLayer {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn seal(&self, plain: &[u8]) -> StorageResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plain)
            .map_err(|_| StorageError::encryption("encryption failed"))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend(ciphertext);
        Ok(sealed)
    }

    fn open(&self, sealed: &[u8]) -> StorageResult<Vec<u8>> {
        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(StorageError::encryption("ciphertext too short"));
        }
        let nonce = Nonce::from_slice(&sealed[..NONCE_SIZE]);
        self.cipher
            .decrypt(nonce, &sealed[NONCE_SIZE..])
            .map_err(|_| StorageError::encryption("authentication failed"))
    }
}
