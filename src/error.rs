use thiserror::Error;

/// Result type for fieldcrypt operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the fieldcrypt library
#[derive(Error, Debug)]
pub enum Error {
    /// Errors resolving a master key from a KMS (malformed URI, bad
    /// credentials, inaccessible remote key)
    #[error("key resolution error: {0}")]
    KeyResolution(String),

    /// Errors unwrapping a wrapped keyset (wrong master key or corrupted
    /// ciphertext)
    #[error("unwrap error: {0}")]
    Unwrap(String),

    /// Errors related to malformed keyset bytes
    #[error("keyset format error: {0}")]
    Format(String),

    /// Secret key material found where only public material was expected
    #[error("unexpected secret material: {0}")]
    UnexpectedSecretMaterial(String),

    /// Errors related to I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ciphertext or context mismatch, or tampering detected on decrypt
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Invalid encoding at the field boundary (not valid base64, or
    /// decrypted bytes are not valid UTF-8)
    #[error("decode error: {0}")]
    Decode(String),

    /// The operation requires key material the handle does not carry
    /// (e.g. decrypting with a public-only keyset)
    #[error("missing capability: {0}")]
    Capability(String),

    /// Invalid argument error
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Errors related to cryptographic operations other than
    /// authentication failures
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl Error {
    /// Folds a serialization error into the keyset format taxonomy.
    pub(crate) fn format(err: impl std::fmt::Display) -> Self {
        Error::Format(err.to_string())
    }
}
