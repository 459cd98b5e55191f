//! # External Signer Boundary
//!
//! The only I/O in the signing protocol. Private keys live in an HSM (or a
//! signing service fronting one) that exposes a single capability: sign these
//! 32 bytes with key K. This module defines that capability and the checks
//! that run on our side of it.
//!
//! ## Layout
//!
//! - [`ExternalSigner`]: the capability itself, object-safe so a pipeline can
//!   hold `Arc<dyn ExternalSigner>`.
//! - [`sign_digest`]: the boundary call. Validates the request before the
//!   signer sees it and the response before the caller does.
//! - [`scoped`]: connect, sign once, disconnect. No pooling.
//! - [`registry`]: key administration and the key-id → public-key lookup.
//! - [`wire`] and `remote`: a Unix-socket client for an out-of-process
//!   signer daemon.
//!
//! Nothing here retries. A signer failure goes straight back to the caller
//! with a stable [`ErrorKind`](crate::error::ErrorKind) so that a rejected
//! request from the HSM is never papered over.

pub mod registry;
#[cfg(unix)]
pub mod remote;
pub mod scoped;
pub mod wire;

use async_trait::async_trait;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::RawSignature;
use crate::error::SigningError;
use crate::transaction::hashing::SignableDigest;

pub use registry::{
    provision_key, InMemoryKeyRegistry, KeyAdministration, KeyAlgorithm, KeyRegistry, KeySpec,
    PublicKeyFormat,
};
pub use scoped::{ScopedSigner, SignerConnector, SignerSession};

/// Identifier of a key held by the external signer.
///
/// Always supplied explicitly. There is no default key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh readable identifier: `prefix_` followed by 12 random hex
    /// characters.
    pub fn generate(prefix: &str) -> Self {
        let mut bytes = [0u8; 6];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(format!("{prefix}_{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Something that can produce a raw Ed25519 signature over a digest using a
/// key it holds and never reveals.
///
/// Implementations return the signer's bytes unchanged. Length checking is
/// [`sign_digest`]'s job so every implementation gets it for free.
#[async_trait]
pub trait ExternalSigner: Send + Sync {
    /// Signs `digest` with `key_id`.
    ///
    /// # Errors
    ///
    /// `SignerUnavailable` for transport failures, `KeyNotFound` for unknown
    /// identifiers, `SignerRejected` for policy or algorithm refusals.
    async fn sign(&self, key_id: &KeyId, digest: &SignableDigest) -> Result<Vec<u8>, SigningError>;
}

/// Asks `signer` to sign `digest` with `key_id`.
///
/// Before any signer call: the digest must be exactly 32 bytes
/// (`InvalidDigestLength`) and the key id non-empty (`KeyNotFound`). After:
/// the signer must have returned exactly 64 bytes (`InvalidSignatureLength`).
pub async fn sign_digest<S>(
    signer: &S,
    key_id: &KeyId,
    digest: &[u8],
) -> Result<RawSignature, SigningError>
where
    S: ExternalSigner + ?Sized,
{
    let digest = SignableDigest::from_slice(digest)?;
    if key_id.is_empty() {
        return Err(SigningError::KeyNotFound("empty key identifier".to_string()));
    }

    tracing::debug!(key_id = %key_id, digest = %digest.to_hex(), "requesting external signature");
    let raw = signer.sign(key_id, &digest).await?;
    RawSignature::from_slice(&raw)
}
