//! Key administration and the key registry.
//!
//! Two collaborators feed the signing protocol its inputs:
//!
//! - [`KeyAdministration`] talks to the signer backend: create a key, export
//!   its public half.
//! - [`KeyRegistry`] remembers which public key belongs to which key id, so
//!   the pipeline can compute a hint without a round trip to the HSM.
//!
//! Storage and access control are the registry implementation's business.
//! [`InMemoryKeyRegistry`] is enough for tests and the CLI.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::KeyId;
use crate::config::PUBLIC_KEY_LENGTH;
use crate::crypto::RawPublicKey;
use crate::error::SigningError;

/// DER prefix of an Ed25519 `SubjectPublicKeyInfo` (RFC 8410). The raw key
/// follows immediately.
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

// ---------------------------------------------------------------------------
// Key specification
// ---------------------------------------------------------------------------

/// Key algorithm requested from the backend.
///
/// Only [`KeyAlgorithm::Ed25519`] keys can sign ledger transactions. Other
/// names are passed through untouched for backends that manage more.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAlgorithm {
    Ed25519,
    Other(String),
}

impl KeyAlgorithm {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ed25519 => "ed25519",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for a new key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    pub name: KeyId,
    pub algorithm: KeyAlgorithm,
    /// Whether the backend allows exporting the public half. Must be true
    /// for a key the registry is going to learn about.
    pub exportable: bool,
    /// Session-scoped key the backend discards on disconnect.
    pub temporary: bool,
}

impl KeySpec {
    /// An exportable, persistent Ed25519 key.
    pub fn ed25519(name: KeyId) -> Self {
        Self {
            name,
            algorithm: KeyAlgorithm::Ed25519,
            exportable: true,
            temporary: false,
        }
    }
}

/// Encoding of an exported public key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicKeyFormat {
    /// The bare 32-byte key.
    #[default]
    Raw,
    /// DER `SubjectPublicKeyInfo`.
    X509,
}

/// Reduces an exported public key to the 32 raw bytes the protocol uses.
///
/// # Errors
///
/// [`SigningError::InvalidPublicKeyLength`] if `Raw` bytes are not 32 long,
/// or `X509` bytes are not an Ed25519 SPKI wrapper of 32 bytes.
pub fn public_key_from_export(
    bytes: &[u8],
    format: PublicKeyFormat,
) -> Result<RawPublicKey, SigningError> {
    match format {
        PublicKeyFormat::Raw => RawPublicKey::from_slice(bytes),
        PublicKeyFormat::X509 => match bytes.strip_prefix(&ED25519_SPKI_PREFIX[..]) {
            Some(key) if key.len() == PUBLIC_KEY_LENGTH => RawPublicKey::from_slice(key),
            _ => Err(SigningError::InvalidPublicKeyLength(bytes.len())),
        },
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Key lifecycle operations offered by the signer backend.
#[async_trait]
pub trait KeyAdministration: Send + Sync {
    /// Creates a key and returns its identifier.
    async fn create_key(&self, spec: &KeySpec) -> Result<KeyId, SigningError>;

    /// Exports the public half of `key_id`, reduced to raw bytes.
    async fn export_public_key(
        &self,
        key_id: &KeyId,
        format: PublicKeyFormat,
    ) -> Result<RawPublicKey, SigningError>;
}

/// Read side of the key-id → public-key mapping.
pub trait KeyRegistry: Send + Sync {
    /// # Errors
    ///
    /// [`SigningError::KeyNotFound`] if `key_id` was never recorded.
    fn public_key(&self, key_id: &KeyId) -> Result<RawPublicKey, SigningError>;

    /// Records `public_key` for `key_id` unless one is already recorded.
    /// Returns whether it was inserted.
    fn record_public_key(&self, key_id: KeyId, public_key: RawPublicKey) -> bool;
}

/// Creates a key, exports its raw public key and records it.
pub async fn provision_key<A, R>(
    admin: &A,
    registry: &R,
    spec: &KeySpec,
) -> Result<(KeyId, RawPublicKey), SigningError>
where
    A: KeyAdministration + ?Sized,
    R: KeyRegistry + ?Sized,
{
    let key_id = admin.create_key(spec).await?;
    let public_key = admin
        .export_public_key(&key_id, PublicKeyFormat::Raw)
        .await?;

    if !registry.record_public_key(key_id.clone(), public_key) {
        tracing::warn!(key_id = %key_id, "key id already registered, keeping existing public key");
    }
    tracing::info!(
        key_id = %key_id,
        algorithm = %spec.algorithm,
        account = %public_key.account_id(),
        "provisioned signing key"
    );
    Ok((key_id, public_key))
}

// ---------------------------------------------------------------------------
// InMemoryKeyRegistry
// ---------------------------------------------------------------------------

/// A [`KeyRegistry`] held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryKeyRegistry {
    keys: RwLock<HashMap<KeyId, RawPublicKey>>,
}

impl InMemoryKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

impl FromIterator<(KeyId, RawPublicKey)> for InMemoryKeyRegistry {
    fn from_iter<I: IntoIterator<Item = (KeyId, RawPublicKey)>>(iter: I) -> Self {
        Self {
            keys: RwLock::new(iter.into_iter().collect()),
        }
    }
}

impl KeyRegistry for InMemoryKeyRegistry {
    fn public_key(&self, key_id: &KeyId) -> Result<RawPublicKey, SigningError> {
        self.keys
            .read()
            .get(key_id)
            .copied()
            .ok_or_else(|| SigningError::KeyNotFound(key_id.to_string()))
    }

    fn record_public_key(&self, key_id: KeyId, public_key: RawPublicKey) -> bool {
        let mut keys = self.keys.write();
        if keys.contains_key(&key_id) {
            return false;
        }
        keys.insert(key_id, public_key);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, Ordering};

    #[test]
    fn raw_export_must_be_32_bytes() {
        assert!(public_key_from_export(&[1; 32], PublicKeyFormat::Raw).is_ok());
        assert_eq!(
            public_key_from_export(&[1; 33], PublicKeyFormat::Raw).unwrap_err(),
            SigningError::InvalidPublicKeyLength(33)
        );
    }

    #[test]
    fn x509_export_is_unwrapped() {
        let mut der = ED25519_SPKI_PREFIX.to_vec();
        der.extend_from_slice(&[0x5A; 32]);
        let key = public_key_from_export(&der, PublicKeyFormat::X509).unwrap();
        assert_eq!(key.as_bytes(), &[0x5A; 32]);
    }

    #[test]
    fn x509_export_rejects_foreign_prefix() {
        let mut der = vec![0u8; 12];
        der.extend_from_slice(&[0x5A; 32]);
        assert_eq!(
            public_key_from_export(&der, PublicKeyFormat::X509).unwrap_err(),
            SigningError::InvalidPublicKeyLength(44)
        );
        // A bare raw key handed over as X509 is not silently accepted.
        assert!(public_key_from_export(&[0x5A; 32], PublicKeyFormat::X509).is_err());
    }

    #[test]
    fn registry_records_only_once() {
        let reg = InMemoryKeyRegistry::new();
        let id = KeyId::new("k1");
        assert!(reg.record_public_key(id.clone(), RawPublicKey::from_bytes([1; 32])));
        assert!(!reg.record_public_key(id.clone(), RawPublicKey::from_bytes([2; 32])));
        assert_eq!(reg.public_key(&id).unwrap().as_bytes(), &[1; 32]);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unknown_key_is_key_not_found() {
        let reg = InMemoryKeyRegistry::new();
        assert_eq!(
            reg.public_key(&KeyId::new("missing")).unwrap_err(),
            SigningError::KeyNotFound("missing".into())
        );
    }

    struct SequentialAdmin {
        next: AtomicU8,
    }

    #[async_trait]
    impl KeyAdministration for SequentialAdmin {
        async fn create_key(&self, spec: &KeySpec) -> Result<KeyId, SigningError> {
            Ok(spec.name.clone())
        }

        async fn export_public_key(
            &self,
            _: &KeyId,
            format: PublicKeyFormat,
        ) -> Result<RawPublicKey, SigningError> {
            assert_eq!(format, PublicKeyFormat::Raw);
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            Ok(RawPublicKey::from_bytes([n; 32]))
        }
    }

    #[tokio::test]
    async fn provision_creates_exports_and_records() {
        let admin = SequentialAdmin {
            next: AtomicU8::new(7),
        };
        let reg = InMemoryKeyRegistry::new();
        let spec = KeySpec::ed25519(KeyId::new("treasury"));

        let (id, pk) = provision_key(&admin, &reg, &spec).await.unwrap();
        assert_eq!(id.as_str(), "treasury");
        assert_eq!(pk.as_bytes(), &[7; 32]);
        assert_eq!(reg.public_key(&id).unwrap(), pk);

        // Second provisioning under the same id keeps the first key.
        provision_key(&admin, &reg, &spec).await.unwrap();
        assert_eq!(reg.public_key(&id).unwrap().as_bytes(), &[7; 32]);
    }
}
