//! Cryptographic primitives for the fieldcrypt library
//!
//! Field data and keysets are protected with AES-256-GCM; the hybrid
//! (public/private) scheme adds an X25519 key agreement in front of the
//! same AEAD.

pub mod aead;
pub mod aes256gcm;
pub mod hybrid;

pub use aead::Aead;
pub use aes256gcm::Aes256GcmAead;
