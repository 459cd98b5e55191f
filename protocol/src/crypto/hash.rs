//! # Hashing Utilities
//!
//! The protocol uses exactly one hash function: SHA-256. It derives the
//! network ID from a passphrase and the signable digest from a signature
//! payload. There is no reason to add another here.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use stellar_hsm_protocol::crypto::sha256;
///
/// let hash = sha256(b"Test SDF Network ; September 2015");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Vec<u8> {
    sha256_array(data).to_vec()
}

/// Compute the SHA-256 hash and return a fixed-size array.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
