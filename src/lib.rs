//! # Field-Level Envelope Encryption
//!
//! `fieldcrypt` protects sensitive structured field values (payment card
//! numbers and the like) with envelope encryption: a data-encryption keyset
//! encrypts individual field values, and a remote key management service
//! wraps the keyset itself. Wrapped keyset bytes are written in a stable
//! binary or JSON form so a downstream analytical SQL engine can decrypt
//! independently, given the same key URI and encryption context.
//!
//! Two schemes run behind one contract: hybrid encryption (X25519 public key
//! encrypts, private key decrypts) and symmetric AEAD (AES-256-GCM, one
//! shared keyset). The scheme is selected from the loaded keyset at
//! construction time; callers only see `encrypt_field`/`decrypt_field`.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use fieldcrypt::keyset::store::{self, KeysetFormat, KeysetProtection};
//! use fieldcrypt::{
//!     new_field_cipher, CipherMode, FieldCipherConfig, KeySource, KeysetHandle,
//!     SourceProtection,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Resolve the master key and provision a wrapped symmetric keyset
//! let master_key = fieldcrypt::resolve_master_key("fake-kms://demo-key", None).await?;
//! let keyset = KeysetHandle::generate_symmetric()?;
//! store::save_file(
//!     &keyset,
//!     "keyset-enc",
//!     KeysetFormat::Binary,
//!     KeysetProtection::Wrapped(&master_key),
//! )
//! .await?;
//!
//! // Build the field cipher the record generator calls per field
//! let codec = new_field_cipher(
//!     FieldCipherConfig::new(CipherMode::Symmetric)
//!         .with_master_key_uri("fake-kms://demo-key")
//!         .with_private_key_source(KeySource::new(
//!             "keyset-enc",
//!             KeysetFormat::Binary,
//!             SourceProtection::Wrapped,
//!         )),
//! )
//! .await?;
//!
//! let card_number = codec.encrypt_field("4111111111111111")?;
//! assert_eq!(codec.decrypt_field(&card_number)?, "4111111111111111");
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod keyset;
pub mod kms;
pub mod log;
pub mod metrics;
pub mod util;

// Re-export key types
pub use crate::codec::{
    new_field_cipher, CipherMode, FieldCipherConfig, FieldCodec, KeySource, SourceProtection,
};
pub use crate::engine::EncryptionEngine;
pub use crate::error::{Error, Result};
pub use crate::keyset::store::{KeysetFormat, KeysetProtection};
pub use crate::keyset::{
    KeyMaterial, Keyset, KeysetEntry, KeysetHandle, PrimitiveKind, WrappedKeyset,
};
pub use crate::kms::{register_kms_client, resolve_master_key, MasterKeyHandle, StaticKmsClient};
pub use crate::log::{debug_enabled, set_logger, Logger, StdoutLogger};
pub use crate::metrics::{
    disable_metrics, metrics_enabled, set_metrics_provider, MetricsProvider,
};

/// Size of AES-256 key in bytes
pub const AES256_KEY_SIZE: usize = 32;

use async_trait::async_trait;
use std::fmt;

/// Key management service client interface
///
/// A client serves the key URIs it recognizes and performs wrap/unwrap of
/// keyset bytes against the remote key the URI names. The raw master key
/// never leaves the KMS.
#[async_trait]
pub trait KmsClient: Send + Sync + fmt::Debug {
    /// Returns true if this client serves the given key URI
    fn supports(&self, key_uri: &str) -> bool;

    /// Wraps (encrypts) keyset bytes under the key the URI names
    async fn wrap_key(&self, key_uri: &str, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Unwraps (decrypts) keyset bytes under the key the URI names
    async fn unwrap_key(&self, key_uri: &str, ciphertext: &[u8]) -> Result<Vec<u8>>;
}
