//! Utility functions for the fieldcrypt library

use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

/// Fills a buffer with cryptographically secure random bytes
pub fn fill_random(buf: &mut [u8]) {
    OsRng.fill_bytes(buf);
}

/// Generates a random byte array of the specified size
pub fn get_rand_bytes(size: usize) -> Vec<u8> {
    let mut bytes = vec![0_u8; size];
    fill_random(&mut bytes);
    bytes
}

/// Generates a random non-zero key id
pub fn get_rand_key_id() -> u32 {
    loop {
        let id = OsRng.next_u32();
        if id != 0 {
            return id;
        }
    }
}

/// Securely wipes a byte slice
pub fn mem_clear(bytes: &mut [u8]) {
    bytes.zeroize();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_rand_bytes_size_and_entropy() {
        let a = get_rand_bytes(32);
        let b = get_rand_bytes(32);
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_mem_clear() {
        let mut bytes = get_rand_bytes(16);
        mem_clear(&mut bytes);
        assert!(bytes.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_key_id_nonzero() {
        for _ in 0..64 {
            assert_ne!(get_rand_key_id(), 0);
        }
    }
}
