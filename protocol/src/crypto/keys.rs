//! # Key & Signature Types
//!
//! Fixed-size wrappers for the byte strings that cross the signer boundary.
//!
//! - [`RawPublicKey`]: 32 raw Ed25519 public key bytes, as exported by the
//!   hardware signer.
//! - [`AccountId`]: the same key viewed as a ledger account; always renders
//!   as its checksummed "G..." form.
//! - [`RawSignature`]: 64 opaque bytes returned by the external signer.
//!
//! Lengths are enforced at construction, so code holding one of these never
//! re-checks. All three serialize as text (base64 or StrKey) because the
//! only thing that consumes them outside this crate is a JSON API.
//!
//! There is deliberately no private key type in this crate.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::strkey;
use crate::config::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use crate::error::SigningError;

// ---------------------------------------------------------------------------
// RawPublicKey
// ---------------------------------------------------------------------------

/// A raw 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawPublicKey([u8; PUBLIC_KEY_LENGTH]);

impl RawPublicKey {
    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Builds a key from an arbitrary slice.
    ///
    /// # Errors
    ///
    /// [`SigningError::InvalidPublicKeyLength`] unless the slice is exactly
    /// 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SigningError> {
        let arr: [u8; PUBLIC_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| SigningError::InvalidPublicKeyLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Parses the base64 form produced by key export.
    pub fn from_base64(encoded: &str) -> Result<Self, SigningError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| SigningError::serialization(format!("public key is not base64: {e}")))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The ledger account controlled by this key.
    pub fn account_id(&self) -> AccountId {
        AccountId(*self)
    }
}

impl fmt::Debug for RawPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawPublicKey({})", self.to_hex())
    }
}

impl Serialize for RawPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for RawPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// A ledger account reference.
///
/// Holds the raw key; the "G..." text is derived on demand, so the two
/// representations cannot drift apart. Parsing text always goes through
/// full StrKey validation.
///
/// ```
/// use stellar_hsm_protocol::crypto::AccountId;
///
/// let zero: AccountId = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF"
///     .parse()
///     .unwrap();
/// assert_eq!(zero.public_key().as_bytes(), &[0u8; 32]);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId(RawPublicKey);

impl AccountId {
    pub fn from_public_key(key: RawPublicKey) -> Self {
        Self(key)
    }

    pub fn public_key(&self) -> &RawPublicKey {
        &self.0
    }

    /// The checksummed "G..." form.
    pub fn to_strkey(&self) -> String {
        strkey::encode_ed25519_public_key(self.0.as_bytes())
    }
}

impl FromStr for AccountId {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = strkey::decode_ed25519_public_key(s)?;
        Ok(Self(RawPublicKey(raw)))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_strkey())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_strkey())
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_strkey())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// RawSignature
// ---------------------------------------------------------------------------

/// A raw 64-byte signature, exactly as the external signer returned it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawSignature([u8; SIGNATURE_LENGTH]);

impl RawSignature {
    pub const fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// # Errors
    ///
    /// [`SigningError::InvalidSignatureLength`] unless exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SigningError> {
        let arr: [u8; SIGNATURE_LENGTH] = bytes
            .try_into()
            .map_err(|_| SigningError::InvalidSignatureLength(bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn from_base64(encoded: &str) -> Result<Self, SigningError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| SigningError::serialization(format!("signature is not base64: {e}")))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }
}

impl fmt::Debug for RawSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawSignature({}…)", hex::encode(&self.0[..8]))
    }
}

impl Serialize for RawSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for RawSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(serde::de::Error::custom)
    }
}
