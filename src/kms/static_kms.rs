use crate::crypto::{Aead, Aes256GcmAead};
use crate::error::{Error, Result};
use crate::KmsClient;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// URI prefix served by the static KMS client
pub const FAKE_KMS_PREFIX: &str = "fake-kms://";

/// An in-process key management client for testing and demos
///
/// The master key for a URI is derived from the URI itself, so distinct URIs
/// wrap under distinct keys while repeated resolutions of one URI agree.
/// Nothing leaves the process; do not use this for production key material.
#[derive(Debug, Default)]
pub struct StaticKmsClient {
    /// AEAD implementation used to wrap/unwrap
    aead: Aes256GcmAead,
}

impl StaticKmsClient {
    /// Creates a new StaticKmsClient
    pub fn new() -> Self {
        Self {
            aead: Aes256GcmAead::new(),
        }
    }

    fn master_key_bytes(key_uri: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(key_uri.as_bytes());
        hasher.finalize().into()
    }
}

#[async_trait]
impl KmsClient for StaticKmsClient {
    fn supports(&self, key_uri: &str) -> bool {
        key_uri.starts_with(FAKE_KMS_PREFIX)
    }

    async fn wrap_key(&self, key_uri: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        if !self.supports(key_uri) {
            return Err(Error::KeyResolution(format!(
                "unsupported key URI: {}",
                key_uri
            )));
        }
        let key = Self::master_key_bytes(key_uri);
        self.aead.encrypt(plaintext, &key, b"")
    }

    async fn unwrap_key(&self, key_uri: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if !self.supports(key_uri) {
            return Err(Error::KeyResolution(format!(
                "unsupported key URI: {}",
                key_uri
            )));
        }
        let key = Self::master_key_bytes(key_uri);
        self.aead.decrypt(ciphertext, &key, b"")
    }
}
