//! Core value types for payment transactions.
//!
//! These are the pieces an envelope is made of: the native-asset
//! [`Amount`], the optional [`Memo`], the validity window, and the single
//! payment [`Operation`]. Each type owns its own XDR encoding so the envelope
//! code only has to stitch them together.

use serde::Serialize;
use std::fmt;

use crate::config::{AMOUNT_DECIMALS, MAX_MEMO_TEXT_LENGTH, STROOPS_PER_UNIT};
use crate::crypto::{AccountId, RawPublicKey};
use crate::error::SigningError;
use crate::xdr::{ReadXdr, WriteXdr, XdrReader, XdrWriter};

// XDR discriminants used in this module.
const KEY_TYPE_ED25519: i32 = 0;
const KEY_TYPE_MUXED_ED25519: i32 = 0x100;
const ASSET_TYPE_NATIVE: i32 = 0;
const OPERATION_TYPE_PAYMENT: i32 = 1;
const MEMO_NONE: i32 = 0;
const MEMO_TEXT: i32 = 1;
const MEMO_ID: i32 = 2;
const MEMO_HASH: i32 = 3;
const MEMO_RETURN: i32 = 4;
const PRECOND_NONE: i32 = 0;
const PRECOND_TIME: i32 = 1;

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// A native-asset amount in stroops (10^-7 of a unit).
///
/// `value` is always an integer. `"10.0000000"` parses to `100_000_000`.
/// Parsing is strict: plain digits, optionally a dot and 1–7 fractional
/// digits. No signs, no exponents, no whitespace.
///
/// ```
/// use stellar_hsm_protocol::transaction::types::Amount;
///
/// let ten = Amount::parse("10.0000000").unwrap();
/// assert_eq!(ten.stroops(), 100_000_000);
/// assert_eq!(ten.to_string(), "10.0000000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Amount(i64);

impl Amount {
    /// Parses a positive fixed-point decimal string.
    ///
    /// # Errors
    ///
    /// [`SigningError::InvalidAmount`] for malformed text, more than seven
    /// fractional digits, zero, or a value above `i64::MAX` stroops.
    pub fn parse(input: &str) -> Result<Self, SigningError> {
        let reject = |reason: &str| SigningError::InvalidAmount {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (whole, frac) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(reject("expected a decimal number"));
        }
        if input.contains('.') && frac.is_empty() {
            return Err(reject("expected digits after the decimal point"));
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(reject("expected a decimal number"));
        }
        if frac.len() > AMOUNT_DECIMALS {
            return Err(reject("more than 7 fractional digits"));
        }

        let whole: i64 = whole
            .parse()
            .map_err(|_| reject("exceeds the maximum amount"))?;
        let frac_padded = format!("{:0<width$}", frac, width = AMOUNT_DECIMALS);
        let frac: i64 = frac_padded
            .parse()
            .map_err(|_| reject("expected a decimal number"))?;

        let stroops = whole
            .checked_mul(STROOPS_PER_UNIT)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(|| reject("exceeds the maximum amount"))?;

        Self::from_stroops(stroops).map_err(|_| reject("must be greater than zero"))
    }

    /// Wraps a raw stroop count, which must be positive.
    pub fn from_stroops(stroops: i64) -> Result<Self, SigningError> {
        if stroops <= 0 {
            return Err(SigningError::InvalidAmount {
                input: stroops.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(Self(stroops))
    }

    pub fn stroops(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / STROOPS_PER_UNIT;
        let frac = self.0 % STROOPS_PER_UNIT;
        write!(f, "{}.{:0>width$}", whole, frac, width = AMOUNT_DECIMALS)
    }
}

// ---------------------------------------------------------------------------
// Memo
// ---------------------------------------------------------------------------

/// Optional transaction memo.
///
/// Composition only ever produces [`Memo::None`] or [`Memo::Text`]; the other
/// variants exist so envelopes built elsewhere still decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Memo {
    None,
    Text(String),
    Id(u64),
    Hash(#[serde(with = "hex_bytes")] [u8; 32]),
    Return(#[serde(with = "hex_bytes")] [u8; 32]),
}

impl Memo {
    /// A text memo, at most 28 bytes once UTF-8 encoded.
    pub fn text(text: impl Into<String>) -> Result<Self, SigningError> {
        let text = text.into();
        if text.len() > MAX_MEMO_TEXT_LENGTH {
            return Err(SigningError::MemoTooLong {
                length: text.len(),
                max: MAX_MEMO_TEXT_LENGTH,
            });
        }
        Ok(Self::Text(text))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl WriteXdr for Memo {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match self {
            Self::None => w.write_i32(MEMO_NONE),
            Self::Text(text) => {
                w.write_i32(MEMO_TEXT);
                w.write_string(text, MAX_MEMO_TEXT_LENGTH);
            }
            Self::Id(id) => {
                w.write_i32(MEMO_ID);
                w.write_u64(*id);
            }
            Self::Hash(hash) => {
                w.write_i32(MEMO_HASH);
                w.write_fixed_opaque(hash);
            }
            Self::Return(hash) => {
                w.write_i32(MEMO_RETURN);
                w.write_fixed_opaque(hash);
            }
        }
    }
}

impl ReadXdr for Memo {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, SigningError> {
        match r.read_i32()? {
            MEMO_NONE => Ok(Self::None),
            MEMO_TEXT => Ok(Self::Text(r.read_string(MAX_MEMO_TEXT_LENGTH)?)),
            MEMO_ID => Ok(Self::Id(r.read_u64()?)),
            MEMO_HASH => Ok(Self::Hash(r.read_fixed_opaque::<32>()?)),
            MEMO_RETURN => Ok(Self::Return(r.read_fixed_opaque::<32>()?)),
            other => Err(SigningError::serialization(format!(
                "unknown memo type {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// TimeBounds / Preconditions
// ---------------------------------------------------------------------------

/// Closed validity window in Unix seconds. `max_time == 0` means no upper
/// bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeBounds {
    pub min_time: u64,
    pub max_time: u64,
}

/// Transaction preconditions. Only the time-bound form is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Preconditions {
    None,
    Time(TimeBounds),
}

impl Preconditions {
    pub fn time_bounds(&self) -> Option<&TimeBounds> {
        match self {
            Self::None => None,
            Self::Time(tb) => Some(tb),
        }
    }
}

impl WriteXdr for Preconditions {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match self {
            Self::None => w.write_i32(PRECOND_NONE),
            Self::Time(tb) => {
                w.write_i32(PRECOND_TIME);
                w.write_u64(tb.min_time);
                w.write_u64(tb.max_time);
            }
        }
    }
}

impl ReadXdr for Preconditions {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, SigningError> {
        match r.read_i32()? {
            PRECOND_NONE => Ok(Self::None),
            PRECOND_TIME => Ok(Self::Time(TimeBounds {
                min_time: r.read_u64()?,
                max_time: r.read_u64()?,
            })),
            other => Err(SigningError::serialization(format!(
                "unsupported precondition type {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Accounts on the wire
// ---------------------------------------------------------------------------

/// `MuxedAccount` restricted to its plain Ed25519 arm.
impl WriteXdr for AccountId {
    fn write_xdr(&self, w: &mut XdrWriter) {
        w.write_i32(KEY_TYPE_ED25519);
        w.write_fixed_opaque(self.public_key().as_bytes());
    }
}

impl ReadXdr for AccountId {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, SigningError> {
        match r.read_i32()? {
            KEY_TYPE_ED25519 => {
                let raw = r.read_fixed_opaque::<32>()?;
                Ok(RawPublicKey::from_bytes(raw).account_id())
            }
            KEY_TYPE_MUXED_ED25519 => Err(SigningError::serialization(
                "muxed accounts are not supported",
            )),
            other => Err(SigningError::serialization(format!(
                "unknown account key type {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// The asset being paid. This protocol moves the native currency only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    Native,
}

impl WriteXdr for Asset {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match self {
            Self::Native => w.write_i32(ASSET_TYPE_NATIVE),
        }
    }
}

impl ReadXdr for Asset {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, SigningError> {
        match r.read_i32()? {
            ASSET_TYPE_NATIVE => Ok(Self::Native),
            other => Err(SigningError::serialization(format!(
                "unsupported asset type {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A payment of `amount` of `asset` to `destination`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentOp {
    pub destination: AccountId,
    pub asset: Asset,
    pub amount: Amount,
}

/// Operation body. Payments are the only kind this protocol composes or
/// accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationBody {
    Payment(PaymentOp),
}

/// A single operation, with an optional per-operation source override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub source_account: Option<AccountId>,
    pub body: OperationBody,
}

impl Operation {
    pub fn payment(destination: AccountId, amount: Amount) -> Self {
        Self {
            source_account: None,
            body: OperationBody::Payment(PaymentOp {
                destination,
                asset: Asset::Native,
                amount,
            }),
        }
    }

    /// The payment carried by this operation.
    pub fn as_payment(&self) -> &PaymentOp {
        match &self.body {
            OperationBody::Payment(op) => op,
        }
    }
}

impl WriteXdr for Operation {
    fn write_xdr(&self, w: &mut XdrWriter) {
        match &self.source_account {
            Some(account) => {
                w.write_bool(true);
                account.write_xdr(w);
            }
            None => w.write_bool(false),
        }
        match &self.body {
            OperationBody::Payment(op) => {
                w.write_i32(OPERATION_TYPE_PAYMENT);
                op.destination.write_xdr(w);
                op.asset.write_xdr(w);
                w.write_i64(op.amount.stroops());
            }
        }
    }
}

impl ReadXdr for Operation {
    fn read_xdr(r: &mut XdrReader<'_>) -> Result<Self, SigningError> {
        let source_account = if r.read_bool()? {
            Some(AccountId::read_xdr(r)?)
        } else {
            None
        };

        let body = match r.read_i32()? {
            OPERATION_TYPE_PAYMENT => {
                let destination = AccountId::read_xdr(r)?;
                let asset = Asset::read_xdr(r)?;
                let stroops = r.read_i64()?;
                let amount = Amount::from_stroops(stroops).map_err(|_| {
                    SigningError::serialization(format!("non-positive payment amount {stroops}"))
                })?;
                OperationBody::Payment(PaymentOp {
                    destination,
                    asset,
                    amount,
                })
            }
            other => {
                return Err(SigningError::serialization(format!(
                    "unsupported operation type {other}"
                )))
            }
        };

        Ok(Self {
            source_account,
            body,
        })
    }
}

mod hex_bytes {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
