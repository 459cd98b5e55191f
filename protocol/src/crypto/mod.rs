//! # Cryptographic Primitives
//!
//! Everything byte-exact that the signing protocol leans on: SHA-256 for
//! network IDs and digests, the StrKey account encoding, fixed-size key and
//! signature wrappers, and Ed25519 verification for consumers that want to
//! check an assembled envelope.
//!
//! Nothing in here ever *produces* a signature. Private keys live in the
//! external signer and nowhere else.

pub mod hash;
pub mod keys;
pub mod signatures;
pub mod strkey;

pub use hash::{sha256, sha256_array};
pub use keys::{AccountId, RawPublicKey, RawSignature};
pub use signatures::verify_raw;
