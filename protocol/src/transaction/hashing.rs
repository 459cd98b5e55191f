//! Signable digest extraction.
//!
//! The bytes an external signer signs are not the envelope. They are
//!
//! ```text
//! SHA-256( network_id ‖ ENVELOPE_TYPE_TX ‖ xdr(transaction) )
//! ```
//!
//! where `network_id = SHA-256(passphrase)`. Signatures and the envelope
//! wrapper are excluded, so adding a signature never changes the digest and
//! every signer of a transaction signs the same 32 bytes.
//!
//! The network is an explicit argument. The same transaction hashed for two
//! networks yields two unrelated digests, and a signature over one is
//! useless (or worse, valid) on the other.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Serialize, Serializer};
use std::fmt;

use super::envelope::{Transaction, TransactionEnvelope, ENVELOPE_TYPE_TX};
use crate::config::{Network, DIGEST_LENGTH};
use crate::crypto::hash::sha256_array;
use crate::error::SigningError;
use crate::xdr::{WriteXdr, XdrWriter};

/// Exactly 32 bytes to be signed by the external signer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignableDigest([u8; DIGEST_LENGTH]);

impl SignableDigest {
    pub const fn from_bytes(bytes: [u8; DIGEST_LENGTH]) -> Self {
        Self(bytes)
    }

    /// # Errors
    ///
    /// [`SigningError::InvalidDigestLength`] unless exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SigningError> {
        let arr: [u8; DIGEST_LENGTH] = bytes
            .try_into()
            .map_err(|_| SigningError::InvalidDigestLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Parses the base64 form used by API callers.
    pub fn from_base64(encoded: &str) -> Result<Self, SigningError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| SigningError::serialization(format!("digest is not base64: {e}")))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for SignableDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignableDigest({})", self.to_hex())
    }
}

impl Serialize for SignableDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

/// The XDR `TransactionSignaturePayload` for `tx` on `network`.
pub fn signature_payload(tx: &Transaction, network: &Network) -> Vec<u8> {
    let mut w = XdrWriter::new();
    w.write_fixed_opaque(&network.network_id());
    w.write_i32(ENVELOPE_TYPE_TX);
    tx.write_xdr(&mut w);
    w.into_bytes()
}

/// Computes the signable digest of `envelope` under `network`.
///
/// Deterministic: the same envelope and network always give the same
/// 32 bytes. Existing signatures on the envelope do not participate.
///
/// # Errors
///
/// [`SigningError::SerializationError`] if the envelope violates a
/// structural invariant. Composed and parsed envelopes are validated on
/// construction; the check is repeated here because this is the last stop
/// before bytes go to the signer.
pub fn digest(
    envelope: &TransactionEnvelope,
    network: &Network,
) -> Result<SignableDigest, SigningError> {
    envelope.validate()?;
    let digest = SignableDigest(sha256_array(&signature_payload(envelope.tx(), network)));
    tracing::debug!(
        network = %network,
        digest = %digest.to_hex(),
        "computed signable digest"
    );
    Ok(digest)
}
