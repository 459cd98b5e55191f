//! Transaction envelopes: the unit that gets hashed, signed, and submitted.
//!
//! A [`TransactionEnvelope`] is a [`Transaction`] plus an ordered list of
//! [`DecoratedSignature`]s. Freshly composed envelopes carry no signatures;
//! every call to the assembler returns a *new* envelope with one more. There
//! is no `&mut` API here on purpose: once an envelope exists it never
//! changes, so a digest computed from it stays valid for as long as you hold
//! it.
//!
//! # Wire Format
//!
//! Envelopes encode as a v1 `TransactionEnvelope` (`ENVELOPE_TYPE_TX`) in
//! XDR and print as standard base64. [`TransactionEnvelope::from_base64`] is
//! the entry point for envelopes arriving from outside; it applies the same
//! structural checks as the composer, so anything it returns is safe to hash.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;

use super::hint::SignatureHint;
use super::types::{Memo, Operation, Preconditions};
use crate::config::{HINT_LENGTH, MAX_OPERATIONS, MAX_SIGNATURES, MIN_BASE_FEE, SIGNATURE_LENGTH};
use crate::crypto::{AccountId, RawSignature};
use crate::error::SigningError;
use crate::xdr::{ReadXdr, WriteXdr, XdrReader, XdrWriter};

/// `EnvelopeType` discriminant for v1 transaction envelopes.
pub(crate) const ENVELOPE_TYPE_TX: i32 = 2;

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// The signed-over body of an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub(crate) source_account: AccountId,
    pub(crate) fee: u32,
    pub(crate) seq_num: i64,
    pub(crate) cond: Preconditions,
    pub(crate) memo: Memo,
    pub(crate) operations: Vec<Operation>,
}

impl Transaction {
    pub fn source_account(&self) -> &AccountId {
        &self.source_account
    }

    /// Total fee in stroops (base fee × operation count).
    pub fn fee(&self) -> u32 {
        self.fee
    }

    /// Sequence number this transaction consumes.
    pub fn seq_num(&self) -> i64 {
        self.seq_num
    }

    pub fn preconditions(&self) -> &Preconditions {
        &self.cond
    }

    pub fn memo(&self) -> &Memo {
        &self.memo
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Checks the invariants every envelope this crate hashes must satisfy:
    /// exactly one payment, a fee covering the minimum, a non-negative
    /// sequence, and a sane time window.
    pub fn validate(&self) -> Result<(), SigningError> {
        if self.operations.len() != 1 {
            return Err(SigningError::serialization(format!(
                "expected exactly one operation, found {}",
                self.operations.len()
            )));
        }
        let min_fee = MIN_BASE_FEE as u64 * self.operations.len() as u64;
        if (self.fee as u64) < min_fee {
            return Err(SigningError::serialization(format!(
                "fee {} below minimum {}",
                self.fee, min_fee
            )));
        }
        if self.seq_num < 0 {
            return Err(SigningError::serialization(format!(
                "negative sequence number {}",
                self.seq_num
            )));
        }
        if let Some(tb) = self.cond.time_bounds() {
            if tb.max_time != 0 && tb.max_time < tb.min_time {
                return Err(SigningError::serialization(format!(
                    "time bounds inverted: min {} > max {}",
                    tb.min_time, tb.max_time
                )));
            }
        }
        Ok(())
    }
}

impl WriteXdr for Transaction {
    fn write_xdr(&self, w: &mut XdrWriter) {
        self.source_account.write_xdr(w);
        w.write_u32(self.fee);
        w.write_i64(self.seq_num);
        self.cond.write_xdr(w);
        self.memo.write_xdr(w);
        w.write_len(self.operations.len(), MAX_OPERATIONS);
        for op in &self.operations {
            op.write_xdr(w);
        }
        // ext: v0
        w.write_i32(0);
    }
}

impl ReadXdr for Transaction {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, SigningError> {
        let source_account = AccountId::read_xdr(r)?;
        let fee = r.read_u32()?;
        let seq_num = r.read_i64()?;
        let cond = Preconditions::read_xdr(r)?;
        let memo = Memo::read_xdr(r)?;

        let count = r.read_len(MAX_OPERATIONS)?;
        let mut operations = Vec::with_capacity(count);
        for _ in 0..count {
            operations.push(Operation::read_xdr(r)?);
        }

        match r.read_i32()? {
            0 => {}
            other => {
                return Err(SigningError::serialization(format!(
                    "unsupported transaction extension {other}"
                )))
            }
        }

        Ok(Self {
            source_account,
            fee,
            seq_num,
            cond,
            memo,
            operations,
        })
    }
}

// ---------------------------------------------------------------------------
// DecoratedSignature
// ---------------------------------------------------------------------------

/// A raw signature paired with the hint of the key that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecoratedSignature {
    pub hint: SignatureHint,
    pub signature: RawSignature,
}

impl WriteXdr for DecoratedSignature {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_fixed_opaque(self.hint.as_bytes());
        w.write_var_opaque(self.signature.as_bytes(), SIGNATURE_LENGTH);
    }
}

impl ReadXdr for DecoratedSignature {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, SigningError> {
        let hint = SignatureHint::from_bytes(r.read_fixed_opaque::<HINT_LENGTH>()?);
        let raw = r.read_var_opaque(SIGNATURE_LENGTH)?;
        let signature = RawSignature::from_slice(&raw).map_err(|_| {
            SigningError::serialization(format!(
                "decorated signature is {} bytes, expected {}",
                raw.len(),
                SIGNATURE_LENGTH
            ))
        })?;
        Ok(Self { hint, signature })
    }
}

// ---------------------------------------------------------------------------
// TransactionEnvelope
// ---------------------------------------------------------------------------

/// A transaction and the signatures collected for it so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionEnvelope {
    tx: Transaction,
    signatures: Vec<DecoratedSignature>,
}

impl TransactionEnvelope {
    /// Wraps a validated transaction with no signatures.
    pub fn unsigned(tx: Transaction) -> Result<Self, SigningError> {
        tx.validate()?;
        Ok(Self {
            tx,
            signatures: Vec::new(),
        })
    }

    pub fn tx(&self) -> &Transaction {
        &self.tx
    }

    /// Signatures in the order they were appended.
    pub fn signatures(&self) -> &[DecoratedSignature] {
        &self.signatures
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    /// Returns a copy of this envelope with `signature` appended at the end.
    ///
    /// # Errors
    ///
    /// [`SigningError::SerializationError`] if the envelope already carries
    /// the maximum of 20 signatures; one more could not be encoded.
    pub fn with_signature(&self, signature: DecoratedSignature) -> Result<Self, SigningError> {
        self.ensure_signature_room()?;
        let mut signatures = Vec::with_capacity(self.signatures.len() + 1);
        signatures.extend_from_slice(&self.signatures);
        signatures.push(signature);
        Ok(Self {
            tx: self.tx.clone(),
            signatures,
        })
    }

    /// Fails when the signature list is already full.
    pub fn ensure_signature_room(&self) -> Result<(), SigningError> {
        if self.signatures.len() >= MAX_SIGNATURES {
            return Err(SigningError::serialization(format!(
                "envelope already carries {MAX_SIGNATURES} signatures"
            )));
        }
        Ok(())
    }

    /// Structural checks for envelopes of unknown provenance.
    pub fn validate(&self) -> Result<(), SigningError> {
        self.tx.validate()?;
        if self.signatures.len() > MAX_SIGNATURES {
            return Err(SigningError::serialization(format!(
                "{} signatures exceeds maximum {MAX_SIGNATURES}",
                self.signatures.len()
            )));
        }
        Ok(())
    }

    /// Standard (padded) base64 of the XDR encoding.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_xdr())
    }

    /// Parses and validates an envelope from base64 XDR.
    pub fn from_base64(encoded: &str) -> Result<Self, SigningError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| SigningError::serialization(format!("envelope is not base64: {e}")))?;
        Self::from_xdr(&bytes)
    }
}

impl WriteXdr for TransactionEnvelope {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_i32(ENVELOPE_TYPE_TX);
        self.tx.write_xdr(w);
        w.write_len(self.signatures.len(), MAX_SIGNATURES);
        for sig in &self.signatures {
            sig.write_xdr(w);
        }
    }
}

impl ReadXdr for TransactionEnvelope {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, SigningError> {
        match r.read_i32()? {
            ENVELOPE_TYPE_TX => {}
            other => {
                return Err(SigningError::serialization(format!(
                    "unsupported envelope type {other}"
                )))
            }
        }

        let tx = Transaction::read_xdr(r)?;
        let count = r.read_len(MAX_SIGNATURES)?;
        let mut signatures = Vec::with_capacity(count);
        for _ in 0..count {
            signatures.push(DecoratedSignature::read_xdr(r)?);
        }

        let envelope = Self { tx, signatures };
        envelope.validate()?;
        Ok(envelope)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
