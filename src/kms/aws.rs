//! AWS KMS master-key backend
//!
//! Serves `aws-kms://<key arn>` URIs. Credentials come from the ambient AWS
//! credential chain; the key named by the ARN must permit Encrypt and Decrypt
//! for the caller.

use crate::error::{Error, Result};
use crate::KmsClient;
use async_trait::async_trait;
use aws_sdk_kms::types::EncryptionAlgorithmSpec;
use aws_sdk_kms::Client as AwsSdkKmsClient;

/// URI prefix served by the AWS KMS client
pub const AWS_KMS_PREFIX: &str = "aws-kms://";

/// AWS KMS implementation of the KmsClient trait
pub struct AwsKmsClient {
    /// AWS SDK KMS client
    client: AwsSdkKmsClient,
}

impl std::fmt::Debug for AwsKmsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsKmsClient").finish()
    }
}

impl AwsKmsClient {
    /// Creates a client from the ambient AWS configuration
    pub async fn new() -> Result<Self> {
        let config = aws_config::load_from_env().await;
        Ok(Self::from_client(AwsSdkKmsClient::new(&config)))
    }

    /// Creates a client from a preconfigured SDK client
    pub fn from_client(client: AwsSdkKmsClient) -> Self {
        Self { client }
    }

    fn key_arn(key_uri: &str) -> Result<&str> {
        key_uri
            .strip_prefix(AWS_KMS_PREFIX)
            .filter(|arn| !arn.is_empty())
            .ok_or_else(|| Error::KeyResolution(format!("unsupported key URI: {}", key_uri)))
    }
}

#[async_trait]
impl KmsClient for AwsKmsClient {
    fn supports(&self, key_uri: &str) -> bool {
        key_uri.starts_with(AWS_KMS_PREFIX)
    }

    async fn wrap_key(&self, key_uri: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        let arn = Self::key_arn(key_uri)?;

        let result = self
            .client
            .encrypt()
            .key_id(arn)
            .encryption_algorithm(EncryptionAlgorithmSpec::SymmetricDefault)
            .plaintext(aws_sdk_kms::primitives::Blob::new(plaintext.to_vec()))
            .send()
            .await
            .map_err(|e| {
                log::debug!("KMS encrypt failed for {}: {}", arn, e);
                Error::KeyResolution(format!("KMS encrypt error: {}", e))
            })?;

        result
            .ciphertext_blob()
            .map(|b| b.as_ref().to_vec())
            .ok_or_else(|| Error::KeyResolution("No ciphertext blob returned from KMS".into()))
    }

    async fn unwrap_key(&self, key_uri: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let arn = Self::key_arn(key_uri)?;

        let result = self
            .client
            .decrypt()
            .key_id(arn)
            .encryption_algorithm(EncryptionAlgorithmSpec::SymmetricDefault)
            .ciphertext_blob(aws_sdk_kms::primitives::Blob::new(ciphertext.to_vec()))
            .send()
            .await
            .map_err(|e| {
                log::debug!("KMS decrypt failed for {}: {}", arn, e);
                Error::Unwrap(format!("KMS decrypt error: {}", e))
            })?;

        result
            .plaintext()
            .map(|b| b.as_ref().to_vec())
            .ok_or_else(|| Error::Unwrap("No plaintext returned from KMS".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_arn_parsing() {
        let arn = AwsKmsClient::key_arn("aws-kms://arn:aws:kms:us-west-2:123456789012:key/abcd")
            .unwrap();
        assert_eq!(arn, "arn:aws:kms:us-west-2:123456789012:key/abcd");

        assert!(AwsKmsClient::key_arn("aws-kms://").is_err());
        assert!(AwsKmsClient::key_arn("fake-kms://test").is_err());
    }
}
