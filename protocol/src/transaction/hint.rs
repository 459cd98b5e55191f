//! Signature hints.
//!
//! A hint is the last four bytes of the signing key. Verifiers use it to
//! pick the candidate key for each decorated signature instead of trying
//! every signer on the account. Get it wrong and the signature is still
//! well-formed, still 64 valid bytes, and never matched to its key: the
//! ledger rejects the transaction with no indication why. That is why this
//! function is tiny and tested directly.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::config::{HINT_LENGTH, PUBLIC_KEY_LENGTH};
use crate::crypto::RawPublicKey;
use crate::error::SigningError;

/// Four-byte key hint carried in every decorated signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureHint([u8; HINT_LENGTH]);

impl SignatureHint {
    pub const fn from_bytes(bytes: [u8; HINT_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HINT_LENGTH] {
        &self.0
    }

    /// Whether this hint selects `key`.
    pub fn matches(&self, key: &RawPublicKey) -> bool {
        *self == hint(key)
    }
}

impl fmt::Debug for SignatureHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureHint({})", hex::encode(self.0))
    }
}

impl fmt::Display for SignatureHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for SignatureHint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

/// The hint for a raw public key: its trailing four bytes.
pub fn hint(public_key: &RawPublicKey) -> SignatureHint {
    let bytes = public_key.as_bytes();
    let mut out = [0u8; HINT_LENGTH];
    out.copy_from_slice(&bytes[PUBLIC_KEY_LENGTH - HINT_LENGTH..]);
    SignatureHint(out)
}

/// [`hint`] for an unchecked slice.
///
/// # Errors
///
/// [`SigningError::InvalidPublicKeyLength`] unless the slice is 32 bytes.
pub fn hint_from_slice(public_key: &[u8]) -> Result<SignatureHint, SigningError> {
    Ok(hint(&RawPublicKey::from_slice(public_key)?))
}
