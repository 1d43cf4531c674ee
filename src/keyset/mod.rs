//! Keyset model for the fieldcrypt library
//!
//! A keyset is an ordered set of key entries sharing one primitive type. The
//! serde representation is the wire schema for both the binary and the JSON
//! at-rest formats, so the bytes written here are the bytes the downstream
//! SQL engine's keyset functions consume.

pub mod store;

use crate::crypto::hybrid;
use crate::error::{Error, Result};
use crate::util::{get_rand_bytes, get_rand_key_id};
use crate::AES256_KEY_SIZE;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// The primitive a keyset serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// Hybrid encryption, public half only (encrypt capability)
    HybridPublic,
    /// Hybrid encryption, private half (encrypt and decrypt capabilities)
    HybridPrivate,
    /// Symmetric AEAD (one key for both directions)
    SymmetricAead,
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PrimitiveKind::HybridPublic => "hybrid-public",
            PrimitiveKind::HybridPrivate => "hybrid-private",
            PrimitiveKind::SymmetricAead => "symmetric-aead",
        };
        f.write_str(name)
    }
}

/// Key material carried by a keyset entry
#[derive(Clone, Serialize, Deserialize)]
pub enum KeyMaterial {
    /// X25519 public key (no secrets)
    HybridPublic {
        #[serde(rename = "PublicKey")]
        public_key: Vec<u8>,
    },
    /// X25519 private key with its public counterpart
    HybridPrivate {
        #[serde(rename = "PublicKey")]
        public_key: Vec<u8>,
        #[serde(rename = "PrivateKey")]
        private_key: Vec<u8>,
    },
    /// AES-256 key
    SymmetricAead {
        #[serde(rename = "Key")]
        key: Vec<u8>,
    },
}

impl KeyMaterial {
    /// Returns the primitive this material serves
    pub fn primitive_kind(&self) -> PrimitiveKind {
        match self {
            KeyMaterial::HybridPublic { .. } => PrimitiveKind::HybridPublic,
            KeyMaterial::HybridPrivate { .. } => PrimitiveKind::HybridPrivate,
            KeyMaterial::SymmetricAead { .. } => PrimitiveKind::SymmetricAead,
        }
    }

    /// Returns true if this material contains private or symmetric bytes
    pub fn has_secret(&self) -> bool {
        !matches!(self, KeyMaterial::HybridPublic { .. })
    }

    fn validate(&self) -> Result<()> {
        match self {
            KeyMaterial::HybridPublic { public_key } => {
                expect_len("public key", public_key, hybrid::X25519_KEY_SIZE)
            }
            KeyMaterial::HybridPrivate {
                public_key,
                private_key,
            } => {
                expect_len("public key", public_key, hybrid::X25519_KEY_SIZE)?;
                expect_len("private key", private_key, hybrid::X25519_KEY_SIZE)
            }
            KeyMaterial::SymmetricAead { key } => expect_len("symmetric key", key, AES256_KEY_SIZE),
        }
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyMaterial::HybridPublic { .. } => f
                .debug_struct("HybridPublic")
                .field("public_key", &"<32 bytes>")
                .finish(),
            KeyMaterial::HybridPrivate { .. } => f
                .debug_struct("HybridPrivate")
                .field("public_key", &"<32 bytes>")
                .field("private_key", &"<hidden>")
                .finish(),
            KeyMaterial::SymmetricAead { .. } => f
                .debug_struct("SymmetricAead")
                .field("key", &"<hidden>")
                .finish(),
        }
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        match self {
            KeyMaterial::HybridPrivate { private_key, .. } => private_key.zeroize(),
            KeyMaterial::SymmetricAead { key } => key.zeroize(),
            KeyMaterial::HybridPublic { .. } => {}
        }
    }
}

fn expect_len(what: &str, bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() == expected {
        Ok(())
    } else {
        Err(Error::Format(format!(
            "invalid {} length: expected {}, got {}",
            what,
            expected,
            bytes.len()
        )))
    }
}

/// One entry of a keyset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysetEntry {
    #[serde(rename = "KeyId")]
    pub key_id: u32,
    #[serde(rename = "Material")]
    pub material: KeyMaterial,
}

/// An ordered set of key entries sharing one primitive type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyset {
    #[serde(rename = "PrimaryKeyId")]
    pub primary_key_id: u32,
    #[serde(rename = "Keys")]
    pub entries: Vec<KeysetEntry>,
}

/// A keyset wrapped by a master key
///
/// `encrypted_keyset` holds the binary keyset encoding encrypted by the KMS.
/// These bytes, unmodified, are the keyset-chain argument expected by the
/// downstream SQL engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrappedKeyset {
    #[serde(rename = "EncryptedKeyset")]
    pub encrypted_keyset: Vec<u8>,
}

/// The validated, in-memory, ready-to-use form of a keyset
///
/// A handle is self-describing: it declares which primitive its entries
/// serve, which lets engine construction validate compatibility before any
/// data is touched. Handles are immutable after construction and safe to
/// share across threads.
#[derive(Debug, Clone)]
pub struct KeysetHandle {
    keyset: Keyset,
    primitive: PrimitiveKind,
}

impl KeysetHandle {
    /// Validates a keyset and produces a usable handle
    pub fn from_keyset(keyset: Keyset) -> Result<Self> {
        if keyset.entries.is_empty() {
            return Err(Error::Format("keyset has no key entries".into()));
        }

        let primitive = keyset.entries[0].material.primitive_kind();
        for entry in &keyset.entries {
            if entry.key_id == 0 {
                return Err(Error::Format("keyset entry has key id 0".into()));
            }
            if entry.material.primitive_kind() != primitive {
                return Err(Error::Format(format!(
                    "keyset mixes primitive types: {} and {}",
                    primitive,
                    entry.material.primitive_kind()
                )));
            }
            entry.material.validate()?;
        }

        let mut ids: Vec<u32> = keyset.entries.iter().map(|e| e.key_id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != keyset.entries.len() {
            return Err(Error::Format("keyset contains duplicate key ids".into()));
        }

        if !keyset
            .entries
            .iter()
            .any(|e| e.key_id == keyset.primary_key_id)
        {
            return Err(Error::Format(format!(
                "primary key id {} not present in keyset",
                keyset.primary_key_id
            )));
        }

        Ok(Self { keyset, primitive })
    }

    /// Generates a fresh single-entry symmetric AEAD keyset
    pub fn generate_symmetric() -> Result<Self> {
        let key_id = get_rand_key_id();
        Self::from_keyset(Keyset {
            primary_key_id: key_id,
            entries: vec![KeysetEntry {
                key_id,
                material: KeyMaterial::SymmetricAead {
                    key: get_rand_bytes(AES256_KEY_SIZE),
                },
            }],
        })
    }

    /// Generates a fresh single-entry hybrid private keyset
    pub fn generate_hybrid() -> Result<Self> {
        let (public_key, private_key) = hybrid::generate_keypair();
        let key_id = get_rand_key_id();
        Self::from_keyset(Keyset {
            primary_key_id: key_id,
            entries: vec![KeysetEntry {
                key_id,
                material: KeyMaterial::HybridPrivate {
                    public_key,
                    private_key: private_key.to_vec(),
                },
            }],
        })
    }

    /// Derives the no-secrets public view of this keyset
    ///
    /// Fails for symmetric keysets, which have no public components to
    /// distribute.
    pub fn public_keyset(&self) -> Result<KeysetHandle> {
        let entries = self
            .keyset
            .entries
            .iter()
            .map(|entry| match &entry.material {
                KeyMaterial::HybridPublic { public_key }
                | KeyMaterial::HybridPrivate { public_key, .. } => Ok(KeysetEntry {
                    key_id: entry.key_id,
                    material: KeyMaterial::HybridPublic {
                        public_key: public_key.clone(),
                    },
                }),
                KeyMaterial::SymmetricAead { .. } => Err(Error::UnexpectedSecretMaterial(
                    "symmetric keyset has no public form to distribute".into(),
                )),
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_keyset(Keyset {
            primary_key_id: self.keyset.primary_key_id,
            entries,
        })
    }

    /// Returns the primitive this handle's entries serve
    pub fn primitive_kind(&self) -> PrimitiveKind {
        self.primitive
    }

    /// Returns true if any entry carries private or symmetric bytes
    pub fn has_secret_material(&self) -> bool {
        self.keyset.entries.iter().any(|e| e.material.has_secret())
    }

    /// Returns the id of the primary entry
    pub fn primary_key_id(&self) -> u32 {
        self.keyset.primary_key_id
    }

    pub(crate) fn keyset(&self) -> &Keyset {
        &self.keyset
    }

    /// Entries ordered for decryption: primary first, then keyset order
    pub(crate) fn entries_primary_first(&self) -> impl Iterator<Item = &KeysetEntry> {
        let primary_id = self.keyset.primary_key_id;
        self.keyset
            .entries
            .iter()
            .filter(move |e| e.key_id == primary_id)
            .chain(
                self.keyset
                    .entries
                    .iter()
                    .filter(move |e| e.key_id != primary_id),
            )
    }
}
