//! # Transaction Module
//!
//! Composition, hashing, assembly and verification of payment transaction
//! envelopes.
//!
//! ## Architecture
//!
//! ```text
//! types.rs        Amount, Memo, time bounds, the payment Operation
//! envelope.rs     Transaction, DecoratedSignature, TransactionEnvelope (XDR)
//! builder.rs      PaymentRequest builder: inputs → unsigned envelope
//! hashing.rs      network-bound signable digest
//! hint.rs         4-byte signature hints
//! assembler.rs    raw signature + public key → signed envelope
//! signing.rs      SigningPipeline: compose → digest → sign → assemble
//! verification.rs Ed25519 check of an assembled envelope
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Compose**: [`PaymentRequest::compose`] validates inputs and returns a
//!    [`ComposedPayment`] bound to its network.
//! 2. **Digest**: [`digest`] hashes the transaction under that network.
//! 3. **Sign**: an [`ExternalSigner`](crate::signer::ExternalSigner) signs
//!    the 32 bytes.
//! 4. **Assemble**: [`assemble`] appends the decorated signature to a new
//!    envelope.
//!
//! Steps 1, 2 and 4 are pure. Envelopes are never mutated; every stage hands
//! a fresh value forward.

pub mod assembler;
pub mod builder;
pub mod envelope;
pub mod hashing;
pub mod hint;
pub mod signing;
pub mod types;
pub mod verification;

pub use assembler::{assemble, assemble_raw};
pub use builder::{compose, ComposedPayment, PaymentRequest};
pub use envelope::{DecoratedSignature, Transaction, TransactionEnvelope};
pub use hashing::{digest, signature_payload, SignableDigest};
pub use hint::{hint, hint_from_slice, SignatureHint};
pub use signing::{SignedPayment, SigningPipeline};
pub use types::{Amount, Memo, Operation, PaymentOp, Preconditions, TimeBounds};
pub use verification::{verify_signature, VerificationError};
