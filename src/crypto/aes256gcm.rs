use crate::crypto::aead::Aead;
use crate::error::{Error, Result};
use crate::util::fill_random;
use aes_gcm::{
    aead::{Aead as AeadTrait, KeyInit, Payload},
    Aes256Gcm, Key as AesKey, Nonce,
};

use super::aead::{GCM_MAX_DATA_SIZE, GCM_NONCE_SIZE, GCM_TAG_SIZE};

/// AES-256-GCM implementation of AEAD
///
/// Output layout: random nonce followed by ciphertext and tag.
#[derive(Default, Debug, Clone)]
pub struct Aes256GcmAead;

impl Aes256GcmAead {
    /// Creates a new instance of the AES-256-GCM AEAD implementation
    pub fn new() -> Self {
        Self
    }
}

impl Aead for Aes256GcmAead {
    fn encrypt(&self, data: &[u8], key: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        if data.len() > GCM_MAX_DATA_SIZE {
            return Err(Error::Crypto("Data too large for GCM".into()));
        }
        if key.len() != crate::AES256_KEY_SIZE {
            return Err(Error::Crypto(format!(
                "Invalid AES-256 key length: {}",
                key.len()
            )));
        }

        let cipher_key = AesKey::<Aes256Gcm>::from_slice(key);
        let cipher = Aes256Gcm::new(cipher_key);

        let size = GCM_NONCE_SIZE + data.len() + GCM_TAG_SIZE;
        let mut nonce_and_cipher = vec![0_u8; size];

        // Fill the nonce area with random bytes
        fill_random(&mut nonce_and_cipher[..GCM_NONCE_SIZE]);
        let nonce = Nonce::from_slice(&nonce_and_cipher[..GCM_NONCE_SIZE]);

        let ciphertext = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: data,
                    aad: associated_data,
                },
            )
            .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

        // Copy the ciphertext (which includes the tag) after the nonce
        nonce_and_cipher[GCM_NONCE_SIZE..].copy_from_slice(&ciphertext);

        Ok(nonce_and_cipher)
    }

    fn decrypt(&self, data: &[u8], key: &[u8], associated_data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < GCM_NONCE_SIZE + GCM_TAG_SIZE {
            // Must have at least nonce and tag
            return Err(Error::Authentication(
                "Data length is too short for GCM (nonce + tag)".into(),
            ));
        }
        if key.len() != crate::AES256_KEY_SIZE {
            return Err(Error::Crypto(format!(
                "Invalid AES-256 key length: {}",
                key.len()
            )));
        }

        let cipher_key = AesKey::<Aes256Gcm>::from_slice(key);
        let cipher = Aes256Gcm::new(cipher_key);

        // Extract the nonce from the beginning
        let nonce = Nonce::from_slice(&data[..GCM_NONCE_SIZE]);

        // GCM reports one opaque failure for tag, key, and AAD mismatches
        let plaintext = cipher
            .decrypt(
                nonce,
                Payload {
                    msg: &data[GCM_NONCE_SIZE..],
                    aad: associated_data,
                },
            )
            .map_err(|_| Error::Authentication("ciphertext or context mismatch".into()))?;

        Ok(plaintext)
    }
}
