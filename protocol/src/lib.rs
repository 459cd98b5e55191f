// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Stellar HSM Protocol: Core Library
//!
//! External-key signing for Stellar payments. The private key lives in a
//! hardware signer that can do exactly one thing for us: sign 32 bytes with
//! a named key. Everything else (building the transaction, working out which
//! 32 bytes, turning 64 bytes of signature back into a submittable envelope)
//! happens here.
//!
//! ## Architecture
//!
//! - **config**: ledger constants and the explicit [`Network`] value.
//! - **crypto**: SHA-256, StrKey account IDs, raw key/signature wrappers,
//!   Ed25519 verification.
//! - **xdr**: the strict RFC 4506 codec envelopes are encoded with.
//! - **transaction**: compose, digest, hint, assemble, verify, and the
//!   [`SigningPipeline`] that chains them.
//! - **signer**: the [`ExternalSigner`] boundary, per-call scoped sessions,
//!   the key registry, and a Unix-socket client for a signer daemon.
//! - **error**: one [`SigningError`] with a stable [`ErrorKind`] per variant.
//!
//! ## Flow
//!
//! ```text
//! PaymentRequest ──compose──▶ TransactionEnvelope ──digest──▶ 32 bytes
//!                                                               │
//!                                              ExternalSigner::sign
//!                                                               │
//! signed TransactionEnvelope ◀──assemble(public key)── 64 bytes ┘
//! ```
//!
//! ## Ground Rules
//!
//! 1. The network is always an explicit argument. No process-wide state.
//! 2. Inputs are validated before the signer is contacted.
//! 3. Signer failures are surfaced as-is. No retries, no default keys.
//! 4. Envelopes are immutable; signing returns a new one.

pub mod config;
pub mod crypto;
pub mod error;
pub mod signer;
pub mod transaction;
pub mod xdr;

pub use config::Network;
pub use crypto::{AccountId, RawPublicKey, RawSignature};
pub use error::{ErrorCategory, ErrorKind, SigningError};
pub use signer::{sign_digest, ExternalSigner, KeyId, KeyRegistry};
pub use transaction::{
    assemble, compose, digest, hint, ComposedPayment, PaymentRequest, SignableDigest,
    SignedPayment, SigningPipeline, TransactionEnvelope,
};
