//! Reading and writing keysets
//!
//! Two encodings (binary, JSON) times three protection states (wrapped by a
//! master key, cleartext with secrets, public-only). Encoding choice is
//! explicit and symmetric: bytes saved as binary must be loaded as binary.
//!
//! The bytes under a master-key wrap are always the binary keyset encoding,
//! independent of the outer file format, so one wrapped payload serves both
//! file formats and the downstream keyset-chain contract.

use crate::error::{Error, Result};
use crate::keyset::{Keyset, KeysetHandle, WrappedKeyset};
use crate::kms::MasterKeyHandle;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;
use zeroize::Zeroizing;

/// On-disk encoding of a keyset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeysetFormat {
    /// Compact binary stream
    Binary,
    /// JSON document
    Json,
}

/// Protection state of a keyset at rest
///
/// Production key material goes through `Wrapped`; `CleartextSecret` exists
/// for ephemeral/test material only, and `PublicOnly` is the distribution
/// view with all secrets stripped.
#[derive(Debug, Clone, Copy)]
pub enum KeysetProtection<'a> {
    /// Keyset bytes are wrapped by a KMS-resident master key
    Wrapped(&'a MasterKeyHandle),
    /// Raw secret bytes with no protection (ephemeral/test material only)
    CleartextSecret,
    /// Public components only; sources containing secrets are rejected
    PublicOnly,
}

/// Loads a keyset from a source
pub async fn load<R: Read>(
    source: &mut R,
    format: KeysetFormat,
    protection: KeysetProtection<'_>,
) -> Result<KeysetHandle> {
    let mut bytes = Vec::new();
    source.read_to_end(&mut bytes)?;

    let keyset = match protection {
        KeysetProtection::Wrapped(master_key) => {
            let wrapped: WrappedKeyset = decode(&bytes, format)?;
            let cleartext = master_key
                .unwrap_key(&wrapped.encrypted_keyset)
                .await
                .map_err(|e| match e {
                    Error::KeyResolution(_) | Error::Io(_) => e,
                    other => Error::Unwrap(other.to_string()),
                })?;
            let cleartext = Zeroizing::new(cleartext);
            // The unwrap authenticated these bytes, so a parse failure means
            // the wrap-side encoding disagrees, not that the key was wrong
            bincode::deserialize::<Keyset>(&cleartext).map_err(Error::format)?
        }
        KeysetProtection::CleartextSecret => decode(&bytes, format)?,
        KeysetProtection::PublicOnly => {
            let keyset: Keyset = decode(&bytes, format)?;
            if keyset.entries.iter().any(|e| e.material.has_secret()) {
                return Err(Error::UnexpectedSecretMaterial(
                    "source contains private or symmetric key material".into(),
                ));
            }
            keyset
        }
    };

    KeysetHandle::from_keyset(keyset)
}

/// Saves a keyset to a sink
pub async fn save<W: Write>(
    handle: &KeysetHandle,
    sink: &mut W,
    format: KeysetFormat,
    protection: KeysetProtection<'_>,
) -> Result<()> {
    let bytes = match protection {
        KeysetProtection::Wrapped(master_key) => {
            let cleartext =
                Zeroizing::new(bincode::serialize(handle.keyset()).map_err(Error::format)?);
            let encrypted_keyset = master_key.wrap_key(&cleartext).await?;
            encode(&WrappedKeyset { encrypted_keyset }, format)?
        }
        KeysetProtection::CleartextSecret => encode(handle.keyset(), format)?,
        KeysetProtection::PublicOnly => {
            let public = handle.public_keyset()?;
            encode(public.keyset(), format)?
        }
    };

    sink.write_all(&bytes)?;
    sink.flush()?;
    Ok(())
}

/// Loads a keyset from a file
pub async fn load_file(
    path: impl AsRef<Path>,
    format: KeysetFormat,
    protection: KeysetProtection<'_>,
) -> Result<KeysetHandle> {
    let mut file = std::fs::File::open(path)?;
    load(&mut file, format, protection).await
}

/// Saves a keyset to a file
pub async fn save_file(
    handle: &KeysetHandle,
    path: impl AsRef<Path>,
    format: KeysetFormat,
    protection: KeysetProtection<'_>,
) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    save(handle, &mut file, format, protection).await
}

fn encode<T: Serialize>(value: &T, format: KeysetFormat) -> Result<Vec<u8>> {
    match format {
        KeysetFormat::Binary => bincode::serialize(value).map_err(Error::format),
        KeysetFormat::Json => serde_json::to_vec_pretty(value).map_err(Error::format),
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8], format: KeysetFormat) -> Result<T> {
    match format {
        KeysetFormat::Binary => bincode::deserialize(bytes).map_err(Error::format),
        KeysetFormat::Json => serde_json::from_slice(bytes).map_err(Error::format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kms::resolve_master_key;

    const FORMATS: [KeysetFormat; 2] = [KeysetFormat::Binary, KeysetFormat::Json];

    #[tokio::test]
    async fn test_cleartext_round_trip() {
        for format in FORMATS {
            let handle = KeysetHandle::generate_symmetric().unwrap();

            let mut sink = Vec::new();
            save(&handle, &mut sink, format, KeysetProtection::CleartextSecret)
                .await
                .unwrap();

            let loaded = load(
                &mut sink.as_slice(),
                format,
                KeysetProtection::CleartextSecret,
            )
            .await
            .unwrap();

            assert_eq!(loaded.primary_key_id(), handle.primary_key_id());
            assert_eq!(loaded.primitive_kind(), handle.primitive_kind());
        }
    }

    #[tokio::test]
    async fn test_wrapped_round_trip() {
        let master_key = resolve_master_key("fake-kms://store-test", None)
            .await
            .unwrap();

        for format in FORMATS {
            let handle = KeysetHandle::generate_hybrid().unwrap();

            let mut sink = Vec::new();
            save(
                &handle,
                &mut sink,
                format,
                KeysetProtection::Wrapped(&master_key),
            )
            .await
            .unwrap();

            let loaded = load(
                &mut sink.as_slice(),
                format,
                KeysetProtection::Wrapped(&master_key),
            )
            .await
            .unwrap();

            assert_eq!(loaded.primary_key_id(), handle.primary_key_id());
            assert_eq!(loaded.primitive_kind(), handle.primitive_kind());
        }
    }

    #[tokio::test]
    async fn test_wrong_master_key_fails_unwrap() {
        let master_key = resolve_master_key("fake-kms://store-right-key", None)
            .await
            .unwrap();
        let other_key = resolve_master_key("fake-kms://store-wrong-key", None)
            .await
            .unwrap();

        let handle = KeysetHandle::generate_symmetric().unwrap();
        let mut sink = Vec::new();
        save(
            &handle,
            &mut sink,
            KeysetFormat::Binary,
            KeysetProtection::Wrapped(&master_key),
        )
        .await
        .unwrap();

        let err = load(
            &mut sink.as_slice(),
            KeysetFormat::Binary,
            KeysetProtection::Wrapped(&other_key),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Unwrap(_)));
    }

    #[tokio::test]
    async fn test_corrupted_wrapped_payload_fails_unwrap() {
        let master_key = resolve_master_key("fake-kms://store-corrupt", None)
            .await
            .unwrap();

        let handle = KeysetHandle::generate_symmetric().unwrap();
        let mut sink = Vec::new();
        save(
            &handle,
            &mut sink,
            KeysetFormat::Binary,
            KeysetProtection::Wrapped(&master_key),
        )
        .await
        .unwrap();

        // Flip a byte near the end, inside the encrypted payload
        let last = sink.len() - 1;
        sink[last] ^= 0xff;

        let err = load(
            &mut sink.as_slice(),
            KeysetFormat::Binary,
            KeysetProtection::Wrapped(&master_key),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Unwrap(_)));
    }

    #[tokio::test]
    async fn test_public_only_round_trip() {
        for format in FORMATS {
            let private = KeysetHandle::generate_hybrid().unwrap();

            let mut sink = Vec::new();
            save(&private, &mut sink, format, KeysetProtection::PublicOnly)
                .await
                .unwrap();

            let loaded = load(&mut sink.as_slice(), format, KeysetProtection::PublicOnly)
                .await
                .unwrap();

            assert!(!loaded.has_secret_material());
            assert_eq!(loaded.primary_key_id(), private.primary_key_id());
        }
    }

    #[tokio::test]
    async fn test_public_only_load_rejects_secret_material() {
        for format in FORMATS {
            let private = KeysetHandle::generate_hybrid().unwrap();

            let mut sink = Vec::new();
            save(
                &private,
                &mut sink,
                format,
                KeysetProtection::CleartextSecret,
            )
            .await
            .unwrap();

            let err = load(&mut sink.as_slice(), format, KeysetProtection::PublicOnly)
                .await
                .unwrap_err();

            assert!(matches!(err, Error::UnexpectedSecretMaterial(_)));
        }
    }

    #[tokio::test]
    async fn test_public_only_save_of_symmetric_fails() {
        let handle = KeysetHandle::generate_symmetric().unwrap();
        let mut sink = Vec::new();
        let err = save(
            &handle,
            &mut sink,
            KeysetFormat::Json,
            KeysetProtection::PublicOnly,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::UnexpectedSecretMaterial(_)));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_bytes_fail_with_format_error() {
        for format in FORMATS {
            let garbage = b"not a keyset at all";
            let err = load(
                &mut garbage.as_slice(),
                format,
                KeysetProtection::CleartextSecret,
            )
            .await
            .unwrap_err();
            assert!(matches!(err, Error::Format(_)));
        }
    }

    #[tokio::test]
    async fn test_format_mismatch_fails() {
        let handle = KeysetHandle::generate_symmetric().unwrap();
        let mut sink = Vec::new();
        save(
            &handle,
            &mut sink,
            KeysetFormat::Binary,
            KeysetProtection::CleartextSecret,
        )
        .await
        .unwrap();

        let err = load(
            &mut sink.as_slice(),
            KeysetFormat::Json,
            KeysetProtection::CleartextSecret,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyset.json");

        let handle = KeysetHandle::generate_hybrid().unwrap();
        save_file(
            &handle,
            &path,
            KeysetFormat::Json,
            KeysetProtection::CleartextSecret,
        )
        .await
        .unwrap();

        let loaded = load_file(
            &path,
            KeysetFormat::Json,
            KeysetProtection::CleartextSecret,
        )
        .await
        .unwrap();
        assert_eq!(loaded.primary_key_id(), handle.primary_key_id());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let err = load_file(
            "/nonexistent/keyset.bin",
            KeysetFormat::Binary,
            KeysetProtection::CleartextSecret,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
