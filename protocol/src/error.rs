//! Error types for the signing protocol.
//!
//! Every operation in this crate that can fail returns a [`SigningError`].
//! Callers that need to branch (an HTTP layer picking a status code, a job
//! runner deciding whether to retry) should match on [`SigningError::kind`]
//! and never on the rendered message.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors produced anywhere between composition and assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// An account reference failed StrKey validation.
    #[error("invalid account reference {input:?}: {reason}")]
    InvalidAccountReference {
        /// The rejected text (truncated by the caller if needed).
        input: String,
        /// Which check failed.
        reason: String,
    },

    /// The payment amount is not a positive 7-decimal fixed-point value.
    #[error("invalid amount {input:?}: {reason}")]
    InvalidAmount { input: String, reason: String },

    /// The fee could not be parsed or does not fit the wire field.
    #[error("invalid fee {input:?}: {reason}")]
    InvalidFee { input: String, reason: String },

    /// The fee is below the network minimum per operation.
    #[error("fee {fee} is below the minimum base fee of {minimum} stroops")]
    InsufficientFee { fee: u64, minimum: u32 },

    /// Text memo exceeds the 28-byte wire limit.
    #[error("memo is {length} bytes, maximum is {max}")]
    MemoTooLong { length: usize, max: usize },

    /// The source sequence number is negative or cannot be advanced.
    #[error("invalid sequence number {0}")]
    InvalidSequence(i64),

    /// The network passphrase is empty.
    #[error("network identifier must not be empty")]
    InvalidNetworkIdentifier,

    /// A digest handed to the signing boundary is not 32 bytes.
    #[error("digest must be 32 bytes, got {0}")]
    InvalidDigestLength(usize),

    /// A public key is not 32 bytes (or not an Ed25519 SPKI wrapper of one).
    #[error("public key must be 32 bytes, got {0}")]
    InvalidPublicKeyLength(usize),

    /// A raw signature is not 64 bytes.
    #[error("signature must be 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    /// The external signer could not be reached or the transport failed.
    #[error("signer unavailable: {0}")]
    SignerUnavailable(String),

    /// The key identifier is unknown to the signer or registry.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The signer refused the request (policy, algorithm mismatch).
    #[error("signer rejected the request: {0}")]
    SignerRejected(String),

    /// An envelope arriving from outside failed to decode or violates a
    /// structural invariant.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Stable, machine-readable identifier for each [`SigningError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidAccountReference,
    InvalidAmount,
    InvalidFee,
    InsufficientFee,
    MemoTooLong,
    InvalidSequence,
    InvalidNetworkIdentifier,
    InvalidDigestLength,
    InvalidPublicKeyLength,
    InvalidSignatureLength,
    SignerUnavailable,
    KeyNotFound,
    SignerRejected,
    SerializationError,
}

/// The three failure classes a caller needs to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad input, detected locally before any external call.
    Validation,
    /// Reported by (or on the way to) the external signer.
    Signer,
    /// An externally supplied envelope is corrupt.
    Corruption,
}

impl SigningError {
    /// The stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAccountReference { .. } => ErrorKind::InvalidAccountReference,
            Self::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            Self::InvalidFee { .. } => ErrorKind::InvalidFee,
            Self::InsufficientFee { .. } => ErrorKind::InsufficientFee,
            Self::MemoTooLong { .. } => ErrorKind::MemoTooLong,
            Self::InvalidSequence(_) => ErrorKind::InvalidSequence,
            Self::InvalidNetworkIdentifier => ErrorKind::InvalidNetworkIdentifier,
            Self::InvalidDigestLength(_) => ErrorKind::InvalidDigestLength,
            Self::InvalidPublicKeyLength(_) => ErrorKind::InvalidPublicKeyLength,
            Self::InvalidSignatureLength(_) => ErrorKind::InvalidSignatureLength,
            Self::SignerUnavailable(_) => ErrorKind::SignerUnavailable,
            Self::KeyNotFound(_) => ErrorKind::KeyNotFound,
            Self::SignerRejected(_) => ErrorKind::SignerRejected,
            Self::SerializationError(_) => ErrorKind::SerializationError,
        }
    }

    pub(crate) fn serialization(reason: impl Into<String>) -> Self {
        Self::SerializationError(reason.into())
    }
}

impl ErrorKind {
    /// Snake-case identifier, safe to put in API responses and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidAccountReference => "invalid_account_reference",
            Self::InvalidAmount => "invalid_amount",
            Self::InvalidFee => "invalid_fee",
            Self::InsufficientFee => "insufficient_fee",
            Self::MemoTooLong => "memo_too_long",
            Self::InvalidSequence => "invalid_sequence",
            Self::InvalidNetworkIdentifier => "invalid_network_identifier",
            Self::InvalidDigestLength => "invalid_digest_length",
            Self::InvalidPublicKeyLength => "invalid_public_key_length",
            Self::InvalidSignatureLength => "invalid_signature_length",
            Self::SignerUnavailable => "signer_unavailable",
            Self::KeyNotFound => "key_not_found",
            Self::SignerRejected => "signer_rejected",
            Self::SerializationError => "serialization_error",
        }
    }

    /// Which taxonomy class the kind belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SignerUnavailable | Self::KeyNotFound | Self::SignerRejected => {
                ErrorCategory::Signer
            }
            Self::SerializationError => ErrorCategory::Corruption,
            _ => ErrorCategory::Validation,
        }
    }

    /// Whether a caller *may* reasonably retry. Only transport failures
    /// qualify; this crate itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SignerUnavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
