//! # Signature Verification
//!
//! Ed25519 verification for the *consumer* side of the protocol. The
//! assembler never calls this; it is here for tests, operator tooling, and
//! anyone who wants to prove a signed envelope is what it claims before
//! submitting it.
//!
//! We use `ed25519-dalek`'s strict verification. The ledger does too, so a
//! signature that only passes lenient verification is worthless anyway.

use ed25519_dalek::{Signature as DalekSignature, VerifyingKey};
use thiserror::Error;

use super::keys::{RawPublicKey, RawSignature};

/// Errors during signature verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("invalid public key: not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// Verify a raw signature over `message` with a raw public key.
pub fn verify_raw(
    public_key: &RawPublicKey,
    message: &[u8],
    signature: &RawSignature,
) -> Result<(), SignatureError> {
    let verifying_key = VerifyingKey::from_bytes(public_key.as_bytes())
        .map_err(|_| SignatureError::InvalidPublicKey)?;

    let signature = DalekSignature::from_bytes(signature.as_bytes());

    verifying_key
        .verify_strict(message, &signature)
        .map_err(|_| SignatureError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    fn fixture() -> (SigningKey, RawPublicKey) {
        let sk = SigningKey::generate(&mut OsRng);
        let pk = RawPublicKey::from_bytes(sk.verifying_key().to_bytes());
        (sk, pk)
    }

    #[test]
    fn valid_signature_verifies() {
        let (sk, pk) = fixture();
        let msg = [0x11u8; 32];
        let sig = RawSignature::from_bytes(sk.sign(&msg).to_bytes());
        assert_eq!(verify_raw(&pk, &msg, &sig), Ok(()));
    }

    #[test]
    fn wrong_message_fails() {
        let (sk, pk) = fixture();
        let sig = RawSignature::from_bytes(sk.sign(b"one").to_bytes());
        assert_eq!(
            verify_raw(&pk, b"two", &sig),
            Err(SignatureError::VerificationFailed)
        );
    }

    #[test]
    fn wrong_key_fails() {
        let (sk, _) = fixture();
        let (_, other) = fixture();
        let sig = RawSignature::from_bytes(sk.sign(b"msg").to_bytes());
        assert!(verify_raw(&other, b"msg", &sig).is_err());
    }
}
