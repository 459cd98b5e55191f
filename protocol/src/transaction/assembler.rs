//! Signature assembly.
//!
//! Turns the 64 raw bytes an external signer returned into a
//! [`DecoratedSignature`] and appends it to an envelope. Assembly is purely
//! structural: it does not check that the signature verifies. Use
//! [`verify_signature`](super::verification::verify_signature) for that.

use super::envelope::{DecoratedSignature, TransactionEnvelope};
use super::hint::hint;
use crate::crypto::{RawPublicKey, RawSignature};
use crate::error::SigningError;

/// Appends `signature` by `public_key` to a copy of `envelope`.
///
/// Lengths are checked signature first, then key, before anything is built.
/// The input envelope is left as it was; the result has exactly one more
/// signature, at the end, with existing signatures in their original order.
///
/// # Errors
///
/// - [`SigningError::InvalidSignatureLength`] unless `signature` is 64 bytes.
/// - [`SigningError::InvalidPublicKeyLength`] unless `public_key` is 32 bytes.
/// - [`SigningError::SerializationError`] if the envelope is already full.
pub fn assemble(
    envelope: &TransactionEnvelope,
    public_key: &[u8],
    signature: &[u8],
) -> Result<TransactionEnvelope, SigningError> {
    let signature = RawSignature::from_slice(signature)?;
    let public_key = RawPublicKey::from_slice(public_key)?;
    assemble_raw(envelope, &public_key, &signature)
}

/// [`assemble`] for already length-checked inputs.
pub fn assemble_raw(
    envelope: &TransactionEnvelope,
    public_key: &RawPublicKey,
    signature: &RawSignature,
) -> Result<TransactionEnvelope, SigningError> {
    let decorated = DecoratedSignature {
        hint: hint(public_key),
        signature: *signature,
    };
    let signed = envelope.with_signature(decorated)?;
    tracing::debug!(
        hint = %decorated.hint,
        signatures = signed.signatures().len(),
        "appended decorated signature"
    );
    Ok(signed)
}
