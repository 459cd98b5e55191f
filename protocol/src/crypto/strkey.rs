//! # StrKey Account Encoding
//!
//! The textual "G..." form of an account is
//! `base32(version ‖ key ‖ crc16_le(version ‖ key))`:
//!
//! ```text
//!  1 byte   version   6 << 3 (renders as a leading 'G')
//! 32 bytes  payload   raw Ed25519 public key
//!  2 bytes  checksum  CRC16-XModem over the first 33 bytes, little-endian
//! ```
//!
//! 35 bytes encode to exactly 56 base32 characters with no padding, so any
//! other length is rejected before we even try to decode. Validation is
//! entirely local; no network call is needed to know a reference is
//! well-formed.

use data_encoding::BASE32;

use crate::error::SigningError;

/// Version byte for Ed25519 account IDs.
pub const VERSION_ACCOUNT_ID: u8 = 6 << 3;

/// Encoded length of an account ID.
pub const ENCODED_ACCOUNT_ID_LENGTH: usize = 56;

const DECODED_LENGTH: usize = 1 + 32 + 2;

/// Encodes a raw Ed25519 public key as a "G..." account ID.
pub fn encode_ed25519_public_key(key: &[u8; 32]) -> String {
    let mut payload = Vec::with_capacity(DECODED_LENGTH);
    payload.push(VERSION_ACCOUNT_ID);
    payload.extend_from_slice(key);
    let checksum = crc16_xmodem(&payload);
    payload.extend_from_slice(&checksum.to_le_bytes());
    BASE32.encode(&payload)
}

/// Decodes and validates a "G..." account ID into its raw public key.
///
/// # Errors
///
/// [`SigningError::InvalidAccountReference`] naming the failed check:
/// length, alphabet, version byte, or checksum.
pub fn decode_ed25519_public_key(encoded: &str) -> Result<[u8; 32], SigningError> {
    let reject = |reason: &str| SigningError::InvalidAccountReference {
        input: encoded
            .chars()
            .take(ENCODED_ACCOUNT_ID_LENGTH + 8)
            .collect(),
        reason: reason.to_string(),
    };

    if encoded.len() != ENCODED_ACCOUNT_ID_LENGTH {
        return Err(reject("must be 56 characters"));
    }

    let decoded = BASE32
        .decode(encoded.as_bytes())
        .map_err(|_| reject("not valid base32"))?;
    if decoded.len() != DECODED_LENGTH {
        return Err(reject("must be 56 characters"));
    }

    if decoded[0] != VERSION_ACCOUNT_ID {
        return Err(reject("not an ed25519 account id"));
    }

    let (body, checksum) = decoded.split_at(1 + 32);
    let expected = crc16_xmodem(body).to_le_bytes();
    if checksum != expected {
        return Err(reject("checksum mismatch"));
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&body[1..]);
    Ok(key)
}

/// Returns `true` if `encoded` is a well-formed account ID.
pub fn is_valid_ed25519_public_key(encoded: &str) -> bool {
    decode_ed25519_public_key(encoded).is_ok()
}

/// CRC16-XModem (poly 0x1021, init 0, no reflection).
fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}
