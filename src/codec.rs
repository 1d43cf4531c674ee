//! The field codec: per-value encryption with base64 transport encoding
//!
//! This is the seam the record generator calls once per field. Ciphertext is
//! arbitrary binary, so values destined for text-oriented columns (CSV, SQL
//! literals) are base64 encoded here, not in the engine.

use crate::engine::EncryptionEngine;
use crate::error::{Error, Result};
use crate::keyset::store::{self, KeysetFormat, KeysetProtection};
use crate::keyset::{KeysetHandle, PrimitiveKind};
use crate::kms::{resolve_master_key, MasterKeyHandle};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::PathBuf;

/// Which encryption scheme a field cipher runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    /// Asymmetric: encrypt with public key material, decrypt with private
    Hybrid,
    /// Symmetric AEAD: one shared keyset for both directions
    Symmetric,
}

/// Protection state of a configured key source
///
/// Mirrors [`KeysetProtection`] without borrowing a resolved master key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceProtection {
    /// Wrapped by the configured master key
    Wrapped,
    /// Raw secret bytes (test/demo material only)
    CleartextSecret,
    /// Public components only
    PublicOnly,
}

/// A keyset file plus how to read it
#[derive(Debug, Clone)]
pub struct KeySource {
    /// Path to the keyset file
    pub path: PathBuf,
    /// On-disk encoding
    pub format: KeysetFormat,
    /// Protection state of the file
    pub protection: SourceProtection,
}

impl KeySource {
    /// Creates a key source
    pub fn new(
        path: impl Into<PathBuf>,
        format: KeysetFormat,
        protection: SourceProtection,
    ) -> Self {
        Self {
            path: path.into(),
            format,
            protection,
        }
    }
}

/// Configuration for a field cipher, built once per run
#[derive(Debug, Clone)]
pub struct FieldCipherConfig {
    /// Which scheme to run
    pub mode: CipherMode,
    /// Public keyset source (hybrid encrypt-only deployments)
    pub public_key_source: Option<KeySource>,
    /// Private or symmetric keyset source
    pub private_key_source: Option<KeySource>,
    /// Master key URI, required when any source is wrapped
    pub master_key_uri: Option<String>,
    /// Optional path to an explicit credential bundle (ambient when absent)
    pub credentials: Option<PathBuf>,
    /// Encryption context bound to every field operation
    pub context: Vec<u8>,
}

impl FieldCipherConfig {
    /// Starts a config for the given mode with an empty context
    pub fn new(mode: CipherMode) -> Self {
        Self {
            mode,
            public_key_source: None,
            private_key_source: None,
            master_key_uri: None,
            credentials: None,
            context: Vec::new(),
        }
    }

    /// Sets the public keyset source
    pub fn with_public_key_source(mut self, source: KeySource) -> Self {
        self.public_key_source = Some(source);
        self
    }

    /// Sets the private/symmetric keyset source
    pub fn with_private_key_source(mut self, source: KeySource) -> Self {
        self.private_key_source = Some(source);
        self
    }

    /// Sets the master key URI used to unwrap wrapped sources
    pub fn with_master_key_uri(mut self, uri: impl Into<String>) -> Self {
        self.master_key_uri = Some(uri.into());
        self
    }

    /// Sets the credentials locator
    pub fn with_credentials(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials = Some(path.into());
        self
    }

    /// Sets the encryption context
    pub fn with_context(mut self, context: impl Into<Vec<u8>>) -> Self {
        self.context = context.into();
        self
    }
}

/// Encrypts and decrypts scalar field values as base64 text
///
/// Stateless between calls; no I/O. Safe to share across threads.
#[derive(Debug)]
pub struct FieldCodec {
    engine: EncryptionEngine,
    context: Vec<u8>,
}

impl FieldCodec {
    /// Creates a codec over an engine and a fixed context
    pub fn new(engine: EncryptionEngine, context: impl Into<Vec<u8>>) -> Self {
        Self {
            engine,
            context: context.into(),
        }
    }

    /// Encrypts a field value and base64-encodes the ciphertext
    pub fn encrypt_field(&self, plain: &str) -> Result<String> {
        let ciphertext = self.engine.encrypt(plain.as_bytes(), &self.context)?;
        Ok(STANDARD.encode(ciphertext))
    }

    /// Decodes a base64 field value and decrypts it
    pub fn decrypt_field(&self, encoded: &str) -> Result<String> {
        let ciphertext = STANDARD
            .decode(encoded)
            .map_err(|e| Error::Decode(format!("invalid base64 field value: {}", e)))?;
        let plaintext = self.engine.decrypt(&ciphertext, &self.context)?;
        String::from_utf8(plaintext)
            .map_err(|_| Error::Decode("decrypted field value is not valid UTF-8".into()))
    }
}

/// Builds a field codec from configuration
///
/// Resolves the master key at most once, loads the configured keyset,
/// validates it against the requested mode, and constructs the engine.
pub async fn new_field_cipher(config: FieldCipherConfig) -> Result<FieldCodec> {
    let needs_master_key = [&config.public_key_source, &config.private_key_source]
        .into_iter()
        .flatten()
        .any(|s| s.protection == SourceProtection::Wrapped);

    let master_key: Option<MasterKeyHandle> = if needs_master_key {
        let uri = config.master_key_uri.as_deref().ok_or_else(|| {
            Error::InvalidArgument("a wrapped key source requires master_key_uri".into())
        })?;
        Some(resolve_master_key(uri, config.credentials.as_deref()).await?)
    } else {
        None
    };

    let source = match config.mode {
        // The private source carries the symmetric keyset in symmetric mode
        CipherMode::Symmetric => config.private_key_source.as_ref().ok_or_else(|| {
            Error::InvalidArgument("symmetric mode requires private_key_source".into())
        })?,
        // A process holding both halves prefers the private source; an
        // encrypt-only process configures just the public one
        CipherMode::Hybrid => config
            .private_key_source
            .as_ref()
            .or(config.public_key_source.as_ref())
            .ok_or_else(|| {
                Error::InvalidArgument(
                    "hybrid mode requires public_key_source or private_key_source".into(),
                )
            })?,
    };

    let handle = load_source(source, master_key.as_ref()).await?;

    validate_mode(config.mode, handle.primitive_kind())?;

    Ok(FieldCodec::new(
        EncryptionEngine::new(&handle),
        config.context,
    ))
}

async fn load_source(
    source: &KeySource,
    master_key: Option<&MasterKeyHandle>,
) -> Result<KeysetHandle> {
    let protection = match source.protection {
        SourceProtection::Wrapped => {
            let master_key = master_key.ok_or_else(|| {
                Error::InvalidArgument("a wrapped key source requires master_key_uri".into())
            })?;
            KeysetProtection::Wrapped(master_key)
        }
        SourceProtection::CleartextSecret => KeysetProtection::CleartextSecret,
        SourceProtection::PublicOnly => KeysetProtection::PublicOnly,
    };

    store::load_file(&source.path, source.format, protection).await
}

fn validate_mode(mode: CipherMode, kind: PrimitiveKind) -> Result<()> {
    let compatible = match mode {
        CipherMode::Hybrid => matches!(
            kind,
            PrimitiveKind::HybridPublic | PrimitiveKind::HybridPrivate
        ),
        CipherMode::Symmetric => kind == PrimitiveKind::SymmetricAead,
    };

    if compatible {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "keyset primitive {} does not match {:?} mode",
            kind, mode
        )))
    }
}
