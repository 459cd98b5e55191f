//! Signature verification for assembled envelopes.
//!
//! The signing path never verifies; an HSM that returns garbage produces an
//! envelope that the ledger rejects. Operators and tests that want to catch
//! that earlier call [`verify_signature`] with the key they expect.

use thiserror::Error;

use super::envelope::TransactionEnvelope;
use super::hashing;
use crate::config::Network;
use crate::crypto::signatures::SignatureError;
use crate::crypto::{verify_raw, RawPublicKey};
use crate::error::SigningError;

/// Why an envelope's signature by a given key did not check out.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// The envelope could not be hashed.
    #[error(transparent)]
    Digest(#[from] SigningError),

    /// No decorated signature carries this key's hint.
    #[error("no signature with hint {hint} on envelope")]
    NoMatchingSignature { hint: String },

    /// A signature with the right hint exists but does not verify.
    #[error("signature with hint {hint} does not verify: {source}")]
    InvalidSignature {
        hint: String,
        #[source]
        source: SignatureError,
    },
}

/// Checks that `envelope` carries a valid signature by `public_key` over its
/// digest under `network`.
///
/// Every signature whose hint matches the key is tried; one passing is
/// enough. Hints are four bytes, so unrelated keys can collide.
pub fn verify_signature(
    envelope: &TransactionEnvelope,
    network: &Network,
    public_key: &RawPublicKey,
) -> Result<(), VerificationError> {
    let digest = hashing::digest(envelope, network)?;
    let expected = super::hint::hint(public_key);

    let mut last_failure = None;
    for decorated in envelope.signatures().iter().filter(|s| s.hint == expected) {
        match verify_raw(public_key, digest.as_bytes(), &decorated.signature) {
            Ok(()) => return Ok(()),
            Err(e) => last_failure = Some(e),
        }
    }

    match last_failure {
        Some(source) => Err(VerificationError::InvalidSignature {
            hint: expected.to_string(),
            source,
        }),
        None => Err(VerificationError::NoMatchingSignature {
            hint: expected.to_string(),
        }),
    }
}
