//! The encryption engine applied to field values
//!
//! One engine serves one loaded keyset. The engine is a tagged variant —
//! hybrid (public/private) or symmetric AEAD — selected from the keyset's
//! primitive kind at construction; call sites only ever see the
//! `encrypt`/`decrypt` pair, which is what lets one `FieldCodec` serve
//! either scheme.
//!
//! Engines are immutable after construction and safe to share across
//! threads without locking.

use crate::crypto::{hybrid, Aead, Aes256GcmAead};
use crate::error::{Error, Result};
use crate::keyset::{KeyMaterial, KeysetHandle, PrimitiveKind};
use metrics::{counter, histogram};
use std::time::Instant;
use zeroize::Zeroizing;

/// Encrypts and decrypts individual values under a loaded keyset
pub struct EncryptionEngine {
    variant: Variant,
}

enum Variant {
    Hybrid(HybridCipher),
    Symmetric(SymmetricCipher),
}

impl std::fmt::Debug for EncryptionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match &self.variant {
            Variant::Hybrid(_) => "hybrid",
            Variant::Symmetric(_) => "symmetric",
        };
        f.debug_struct("EncryptionEngine")
            .field("variant", &variant)
            .finish()
    }
}

impl EncryptionEngine {
    /// Constructs an engine for the keyset's primitive kind
    pub fn new(handle: &KeysetHandle) -> Self {
        let variant = match handle.primitive_kind() {
            PrimitiveKind::HybridPublic | PrimitiveKind::HybridPrivate => {
                Variant::Hybrid(HybridCipher::new(handle))
            }
            PrimitiveKind::SymmetricAead => Variant::Symmetric(SymmetricCipher::new(handle)),
        };
        Self { variant }
    }

    /// Encrypts a value, binding the context as associated data
    ///
    /// Ciphertext varies across calls even for identical inputs; both
    /// schemes are probabilistic by design.
    pub fn encrypt(&self, plaintext: &[u8], context: &[u8]) -> Result<Vec<u8>> {
        let start = Instant::now();
        counter!("fieldcrypt.engine.encrypt", 1);

        let result = match &self.variant {
            Variant::Hybrid(cipher) => cipher.encrypt(plaintext, context),
            Variant::Symmetric(cipher) => cipher.encrypt(plaintext, context),
        };

        histogram!("fieldcrypt.engine.encrypt.time", start.elapsed());
        result
    }

    /// Decrypts a value, verifying the context
    ///
    /// Fails with [`Error::Authentication`] on context mismatch, tampering,
    /// or a ciphertext produced under a different key, and with
    /// [`Error::Capability`] when the keyset carries no decryption material.
    pub fn decrypt(&self, ciphertext: &[u8], context: &[u8]) -> Result<Vec<u8>> {
        let start = Instant::now();
        counter!("fieldcrypt.engine.decrypt", 1);

        let result = match &self.variant {
            Variant::Hybrid(cipher) => cipher.decrypt(ciphertext, context),
            Variant::Symmetric(cipher) => cipher.decrypt(ciphertext, context),
        };

        histogram!("fieldcrypt.engine.decrypt.time", start.elapsed());
        result
    }
}

/// One hybrid key entry: public half always present, private half optional
struct HybridKey {
    public_key: Vec<u8>,
    private_key: Option<Zeroizing<Vec<u8>>>,
}

/// Hybrid (asymmetric) cipher: encrypt with the primary public key, decrypt
/// by trying each entry that carries private material
struct HybridCipher {
    /// Keys in decryption order: primary first, then keyset order
    keys: Vec<HybridKey>,
}

impl HybridCipher {
    fn new(handle: &KeysetHandle) -> Self {
        let keys = handle
            .entries_primary_first()
            .filter_map(|entry| match &entry.material {
                KeyMaterial::HybridPublic { public_key } => Some(HybridKey {
                    public_key: public_key.clone(),
                    private_key: None,
                }),
                KeyMaterial::HybridPrivate {
                    public_key,
                    private_key,
                } => Some(HybridKey {
                    public_key: public_key.clone(),
                    private_key: Some(Zeroizing::new(private_key.clone())),
                }),
                // Ruled out by keyset validation
                KeyMaterial::SymmetricAead { .. } => None,
            })
            .collect();
        Self { keys }
    }

    fn encrypt(&self, plaintext: &[u8], context: &[u8]) -> Result<Vec<u8>> {
        hybrid::seal(&self.keys[0].public_key, plaintext, context)
    }

    fn decrypt(&self, ciphertext: &[u8], context: &[u8]) -> Result<Vec<u8>> {
        if self.keys.iter().all(|k| k.private_key.is_none()) {
            return Err(Error::Capability(
                "keyset holds no private key material; decryption requires the private keyset"
                    .into(),
            ));
        }

        for key in &self.keys {
            if let Some(private_key) = &key.private_key {
                match hybrid::open(private_key, ciphertext, context) {
                    Ok(plaintext) => return Ok(plaintext),
                    Err(Error::Authentication(_)) => continue,
                    Err(other) => return Err(other),
                }
            }
        }

        Err(Error::Authentication(
            "no keyset entry decrypted the ciphertext".into(),
        ))
    }
}

/// Symmetric AEAD cipher: one keyset serves both directions
struct SymmetricCipher {
    /// Keys in decryption order: primary first, then keyset order
    keys: Vec<Zeroizing<Vec<u8>>>,
    aead: Aes256GcmAead,
}

impl SymmetricCipher {
    fn new(handle: &KeysetHandle) -> Self {
        let keys = handle
            .entries_primary_first()
            .filter_map(|entry| match &entry.material {
                KeyMaterial::SymmetricAead { key } => Some(Zeroizing::new(key.clone())),
                // Ruled out by keyset validation
                _ => None,
            })
            .collect();
        Self {
            keys,
            aead: Aes256GcmAead::new(),
        }
    }

    fn encrypt(&self, plaintext: &[u8], context: &[u8]) -> Result<Vec<u8>> {
        self.aead.encrypt(plaintext, &self.keys[0], context)
    }

    fn decrypt(&self, ciphertext: &[u8], context: &[u8]) -> Result<Vec<u8>> {
        for key in &self.keys {
            match self.aead.decrypt(ciphertext, key, context) {
                Ok(plaintext) => return Ok(plaintext),
                Err(Error::Authentication(_)) => continue,
                Err(other) => return Err(other),
            }
        }

        Err(Error::Authentication(
            "no keyset entry decrypted the ciphertext".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyset::{Keyset, KeysetEntry};
    use crate::util::get_rand_bytes;

    fn symmetric_entry(key_id: u32, key: Vec<u8>) -> KeysetEntry {
        KeysetEntry {
            key_id,
            material: KeyMaterial::SymmetricAead { key },
        }
    }

    #[test]
    fn test_symmetric_round_trip() {
        let handle = KeysetHandle::generate_symmetric().unwrap();
        let engine = EncryptionEngine::new(&handle);

        let ciphertext = engine.encrypt(b"4111111111111111", b"").unwrap();
        let plaintext = engine.decrypt(&ciphertext, b"").unwrap();

        assert_eq!(plaintext, b"4111111111111111");
    }

    #[test]
    fn test_hybrid_round_trip() {
        let handle = KeysetHandle::generate_hybrid().unwrap();
        let engine = EncryptionEngine::new(&handle);

        let ciphertext = engine.encrypt(b"sensitive", b"export-batch-12").unwrap();
        let plaintext = engine.decrypt(&ciphertext, b"export-batch-12").unwrap();

        assert_eq!(plaintext, b"sensitive");
    }

    #[test]
    fn test_public_encrypts_private_decrypts() {
        let private = KeysetHandle::generate_hybrid().unwrap();
        let public = private.public_keyset().unwrap();

        let encryptor = EncryptionEngine::new(&public);
        let decryptor = EncryptionEngine::new(&private);

        let ciphertext = encryptor.encrypt(b"sensitive", b"").unwrap();
        let plaintext = decryptor.decrypt(&ciphertext, b"").unwrap();

        assert_eq!(plaintext, b"sensitive");
    }

    #[test]
    fn test_public_only_cannot_decrypt() {
        let private = KeysetHandle::generate_hybrid().unwrap();
        let public = private.public_keyset().unwrap();

        let engine = EncryptionEngine::new(&public);
        let ciphertext = engine.encrypt(b"sensitive", b"").unwrap();
        let err = engine.decrypt(&ciphertext, b"").unwrap_err();

        assert!(matches!(err, Error::Capability(_)));
    }

    #[test]
    fn test_context_mismatch() {
        for handle in [
            KeysetHandle::generate_symmetric().unwrap(),
            KeysetHandle::generate_hybrid().unwrap(),
        ] {
            let engine = EncryptionEngine::new(&handle);
            let ciphertext = engine.encrypt(b"value", b"context-1").unwrap();
            let err = engine.decrypt(&ciphertext, b"context-2").unwrap_err();
            assert!(matches!(err, Error::Authentication(_)));
        }
    }

    #[test]
    fn test_tamper_detection() {
        for handle in [
            KeysetHandle::generate_symmetric().unwrap(),
            KeysetHandle::generate_hybrid().unwrap(),
        ] {
            let engine = EncryptionEngine::new(&handle);
            let ciphertext = engine.encrypt(b"value", b"").unwrap();

            let mut tampered = ciphertext.clone();
            tampered[ciphertext.len() / 2] ^= 0x01;
            let err = engine.decrypt(&tampered, b"").unwrap_err();
            assert!(matches!(err, Error::Authentication(_)));
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let engine_a = EncryptionEngine::new(&KeysetHandle::generate_symmetric().unwrap());
        let engine_b = EncryptionEngine::new(&KeysetHandle::generate_symmetric().unwrap());

        let ciphertext = engine_a.encrypt(b"value", b"").unwrap();
        let err = engine_b.decrypt(&ciphertext, b"").unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn test_non_primary_entry_still_decrypts() {
        let old_key = get_rand_bytes(32);
        let old_keyset = KeysetHandle::from_keyset(Keyset {
            primary_key_id: 1,
            entries: vec![symmetric_entry(1, old_key.clone())],
        })
        .unwrap();

        // The same key kept as a non-primary entry after a new primary landed
        let rotated = KeysetHandle::from_keyset(Keyset {
            primary_key_id: 2,
            entries: vec![
                symmetric_entry(2, get_rand_bytes(32)),
                symmetric_entry(1, old_key),
            ],
        })
        .unwrap();

        let old_engine = EncryptionEngine::new(&old_keyset);
        let new_engine = EncryptionEngine::new(&rotated);

        let ciphertext = old_engine.encrypt(b"value", b"").unwrap();
        let plaintext = new_engine.decrypt(&ciphertext, b"").unwrap();
        assert_eq!(plaintext, b"value");
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EncryptionEngine>();
    }
}
