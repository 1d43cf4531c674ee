use crate::error::Result;
use std::fmt;

/// Trait for AEAD (Authenticated Encryption with Associated Data) operations
///
/// The associated data is authenticated but not encrypted; decryption fails
/// unless the same bytes are supplied on both sides.
pub trait Aead: Send + Sync + fmt::Debug {
    /// Encrypts data using the provided key, binding the associated data
    fn encrypt(&self, data: &[u8], key: &[u8], associated_data: &[u8]) -> Result<Vec<u8>>;

    /// Decrypts data using the provided key and associated data
    fn decrypt(&self, data: &[u8], key: &[u8], associated_data: &[u8]) -> Result<Vec<u8>>;
}

// Constants for GCM mode
const GCM_BLOCK_SIZE: usize = 16; // AES block size
pub(crate) const GCM_NONCE_SIZE: usize = 12;
pub(crate) const GCM_TAG_SIZE: usize = 16;

// Maximum message size supported by GCM
// ((1 << 32) - 2) * GCM_BLOCK_SIZE
pub(crate) const GCM_MAX_DATA_SIZE: usize = ((1 << 32) - 2) * GCM_BLOCK_SIZE;
