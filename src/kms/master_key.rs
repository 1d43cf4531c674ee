use crate::error::{Error, Result};
use crate::timer;
use crate::KmsClient;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on a single KMS round trip
const DEFAULT_KMS_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle to a KMS-resident master key
///
/// The handle carries the key URI and a client reference; the raw master key
/// never enters the process. Wrap and unwrap are delegated to the remote KMS
/// over the client's authenticated channel, bounded by a timeout so a hung
/// KMS cannot stall the whole run. Created once per run and shared; immutable
/// after construction.
#[derive(Clone)]
pub struct MasterKeyHandle {
    /// The key URI naming the KMS-resident key
    key_uri: String,

    /// Client performing the remote wrap/unwrap calls
    client: Arc<dyn KmsClient>,

    /// Per-call deadline for KMS round trips
    timeout: Duration,
}

impl std::fmt::Debug for MasterKeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKeyHandle")
            .field("key_uri", &self.key_uri)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MasterKeyHandle {
    /// Creates a new handle for the given key URI and client
    pub(crate) fn new(key_uri: impl Into<String>, client: Arc<dyn KmsClient>) -> Self {
        Self {
            key_uri: key_uri.into(),
            client,
            timeout: DEFAULT_KMS_TIMEOUT,
        }
    }

    /// Overrides the per-call KMS timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the key URI this handle resolves
    pub fn key_uri(&self) -> &str {
        &self.key_uri
    }

    /// Wraps (encrypts) keyset bytes under the master key
    pub async fn wrap_key(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let _timer = timer!("fieldcrypt.kms.wrap");

        tokio::time::timeout(self.timeout, self.client.wrap_key(&self.key_uri, plaintext))
            .await
            .map_err(|_| {
                Error::KeyResolution(format!(
                    "KMS wrap timed out after {:?} for {}",
                    self.timeout, self.key_uri
                ))
            })?
    }

    /// Unwraps (decrypts) keyset bytes previously wrapped under the master key
    pub async fn unwrap_key(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let _timer = timer!("fieldcrypt.kms.unwrap");

        tokio::time::timeout(self.timeout, self.client.unwrap_key(&self.key_uri, ciphertext))
            .await
            .map_err(|_| {
                Error::KeyResolution(format!(
                    "KMS unwrap timed out after {:?} for {}",
                    self.timeout, self.key_uri
                ))
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Client that never answers, for exercising the deadline
    #[derive(Debug)]
    struct StalledKmsClient;

    #[async_trait]
    impl KmsClient for StalledKmsClient {
        fn supports(&self, _key_uri: &str) -> bool {
            true
        }

        async fn wrap_key(&self, _key_uri: &str, _plaintext: &[u8]) -> Result<Vec<u8>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }

        async fn unwrap_key(&self, _key_uri: &str, _ciphertext: &[u8]) -> Result<Vec<u8>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_hung_kms_call_hits_the_deadline() {
        let handle = MasterKeyHandle::new("fake-kms://stalled", Arc::new(StalledKmsClient))
            .with_timeout(Duration::from_millis(50));

        let err = handle.wrap_key(b"key material").await.unwrap_err();
        assert!(matches!(err, Error::KeyResolution(_)));

        let err = handle.unwrap_key(b"ciphertext").await.unwrap_err();
        assert!(matches!(err, Error::KeyResolution(_)));
    }
}
