//! ECIES hybrid encryption: X25519 key agreement, HKDF-SHA256 key
//! derivation, AES-256-GCM data encapsulation.
//!
//! Wire format: `[ephemeral_pubkey:32][nonce:12][ciphertext][tag:16]`.
//! The encryption context rides as GCM associated data, so a context
//! mismatch fails authentication the same way tampering does.

use crate::crypto::aead::{Aead, GCM_NONCE_SIZE, GCM_TAG_SIZE};
use crate::crypto::Aes256GcmAead;
use crate::error::{Error, Result};
use crate::AES256_KEY_SIZE;
use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// X25519 key size (32 bytes)
pub const X25519_KEY_SIZE: usize = 32;

/// Minimum length of a valid hybrid ciphertext
pub const MIN_CIPHERTEXT_LEN: usize = X25519_KEY_SIZE + GCM_NONCE_SIZE + GCM_TAG_SIZE;

// Domain separation for the derived data-encapsulation key
const KDF_DOMAIN: &[u8] = b"fieldcrypt-hybrid-v1";

/// Generates a fresh X25519 keypair as (public, private) bytes
pub fn generate_keypair() -> (Vec<u8>, Zeroizing<Vec<u8>>) {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);
    (
        public.as_bytes().to_vec(),
        Zeroizing::new(secret.to_bytes().to_vec()),
    )
}

/// Derives the public key bytes for an X25519 private key
pub fn public_key_of(private_key: &[u8]) -> Result<Vec<u8>> {
    let secret = StaticSecret::from(to_key_array(private_key)?);
    Ok(PublicKey::from(&secret).as_bytes().to_vec())
}

/// Encrypts with the recipient's public key
///
/// Probabilistic by design: a fresh ephemeral keypair is used per call.
pub fn seal(recipient_public: &[u8], plaintext: &[u8], context: &[u8]) -> Result<Vec<u8>> {
    let recipient = PublicKey::from(to_key_array(recipient_public)?);

    let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral_secret);
    let shared = ephemeral_secret.diffie_hellman(&recipient);

    let key = derive_key(
        shared.as_bytes(),
        ephemeral_public.as_bytes(),
        recipient.as_bytes(),
    )?;

    let sealed = Aes256GcmAead::new().encrypt(plaintext, &key, context)?;

    let mut out = Vec::with_capacity(X25519_KEY_SIZE + sealed.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Decrypts with the recipient's private key
pub fn open(recipient_private: &[u8], ciphertext: &[u8], context: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < MIN_CIPHERTEXT_LEN {
        return Err(Error::Authentication(
            "hybrid ciphertext too short".into(),
        ));
    }

    let ephemeral_public = PublicKey::from(to_key_array(&ciphertext[..X25519_KEY_SIZE])?);
    let secret = StaticSecret::from(to_key_array(recipient_private)?);
    let our_public = PublicKey::from(&secret);
    let shared = secret.diffie_hellman(&ephemeral_public);

    let key = derive_key(
        shared.as_bytes(),
        ephemeral_public.as_bytes(),
        our_public.as_bytes(),
    )?;

    Aes256GcmAead::new().decrypt(&ciphertext[X25519_KEY_SIZE..], &key, context)
}

/// HKDF-SHA256 over the ECDH shared secret, bound to both public keys
fn derive_key(
    shared_secret: &[u8],
    ephemeral_public: &[u8],
    recipient_public: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);

    let mut info = Vec::with_capacity(KDF_DOMAIN.len() + 2 * X25519_KEY_SIZE);
    info.extend_from_slice(KDF_DOMAIN);
    info.extend_from_slice(ephemeral_public);
    info.extend_from_slice(recipient_public);

    let mut okm = Zeroizing::new(vec![0_u8; AES256_KEY_SIZE]);
    hk.expand(&info, okm.as_mut_slice())
        .map_err(|e| Error::Crypto(format!("HKDF expand failed: {}", e)))?;
    Ok(okm)
}

fn to_key_array(bytes: &[u8]) -> Result<[u8; X25519_KEY_SIZE]> {
    bytes.try_into().map_err(|_| {
        Error::Format(format!(
            "Invalid X25519 key length: expected {}, got {}",
            X25519_KEY_SIZE,
            bytes.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let (public, private) = generate_keypair();

        let ciphertext = seal(&public, b"4111111111111111", b"").unwrap();
        let plaintext = open(&private, &ciphertext, b"").unwrap();

        assert_eq!(plaintext, b"4111111111111111");
    }

    #[test]
    fn test_round_trip_with_context() {
        let (public, private) = generate_keypair();

        let ciphertext = seal(&public, b"secret", b"billing-export").unwrap();
        let plaintext = open(&private, &ciphertext, b"billing-export").unwrap();

        assert_eq!(plaintext, b"secret");
    }

    #[test]
    fn test_context_mismatch_fails() {
        let (public, private) = generate_keypair();

        let ciphertext = seal(&public, b"secret", b"context-1").unwrap();
        let err = open(&private, &ciphertext, b"context-2").unwrap_err();

        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let (public, _private) = generate_keypair();
        let (_other_public, other_private) = generate_keypair();

        let ciphertext = seal(&public, b"secret", b"").unwrap();
        let err = open(&other_private, &ciphertext, b"").unwrap_err();

        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn test_tamper_detection() {
        let (public, private) = generate_keypair();
        let ciphertext = seal(&public, b"secret", b"").unwrap();

        for i in 0..ciphertext.len() {
            let mut tampered = ciphertext.clone();
            tampered[i] ^= 0x01;
            let err = open(&private, &tampered, b"").unwrap_err();
            assert!(matches!(err, Error::Authentication(_)));
        }
    }

    #[test]
    fn test_ciphertext_varies_per_call() {
        let (public, _private) = generate_keypair();

        let c1 = seal(&public, b"same", b"").unwrap();
        let c2 = seal(&public, b"same", b"").unwrap();
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_short_ciphertext_rejected() {
        let (_public, private) = generate_keypair();
        let err = open(&private, &[0_u8; MIN_CIPHERTEXT_LEN - 1], b"").unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn test_public_key_of_matches_keypair() {
        let (public, private) = generate_keypair();
        assert_eq!(public_key_of(&private).unwrap(), public);
    }

    #[test]
    fn test_invalid_key_length_rejected() {
        let err = seal(&[0_u8; 16], b"data", b"").unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }
}
