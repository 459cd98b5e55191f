//! Payment composition via the builder pattern.
//!
//! [`PaymentRequest`] collects the caller's raw inputs (account strings,
//! decimal amount, fee string, optional memo) and `.compose(&network)`
//! validates all of them before producing anything. Either every input is
//! good and you get a [`ComposedPayment`], or you get the first
//! [`SigningError`] and no envelope at all.
//!
//! Composition never signs and never talks to the network. The sequence
//! number is whatever the caller last saw for the source account; if it is
//! stale the ledger will say so at submission time.
//!
//! The validity window is the one impure input: by default the upper time
//! bound is wall-clock now plus [`DEFAULT_TX_TIMEOUT`]. Pin the instant with
//! [`PaymentRequest::composed_at`] when you need byte-identical output.

use chrono::Utc;
use std::time::Duration;

use super::envelope::{Transaction, TransactionEnvelope};
use super::hashing::{self, SignableDigest};
use super::types::{Amount, Memo, Operation, Preconditions, TimeBounds};
use crate::config::{Network, DEFAULT_BASE_FEE, DEFAULT_TX_TIMEOUT, MIN_BASE_FEE};
use crate::crypto::AccountId;
use crate::error::SigningError;

// ---------------------------------------------------------------------------
// ComposedPayment
// ---------------------------------------------------------------------------

/// An unsigned envelope together with the network it was composed for.
///
/// Keeping the two side by side means the digest is always taken under the
/// same network the caller composed with. There is no second place to pick
/// up a different passphrase from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPayment {
    envelope: TransactionEnvelope,
    network: Network,
}

impl ComposedPayment {
    pub fn envelope(&self) -> &TransactionEnvelope {
        &self.envelope
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn into_envelope(self) -> TransactionEnvelope {
        self.envelope
    }

    /// The signable digest under the composing network.
    pub fn digest(&self) -> Result<SignableDigest, SigningError> {
        hashing::digest(&self.envelope, &self.network)
    }
}

// ---------------------------------------------------------------------------
// PaymentRequest
// ---------------------------------------------------------------------------

/// Fluent builder for a single native-asset payment.
///
/// ```
/// use stellar_hsm_protocol::config::Network;
/// use stellar_hsm_protocol::transaction::PaymentRequest;
///
/// let zero = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF";
/// let composed = PaymentRequest::new(zero, zero, "1.5")
///     .sequence(42)
///     .memo("rent")
///     .compose(&Network::testnet())
///     .unwrap();
///
/// assert_eq!(composed.envelope().tx().seq_num(), 43);
/// ```
///
/// Defaults: sequence `0`, fee `"100"`, no memo, 60-second timeout,
/// composition instant taken from the system clock.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    source: String,
    destination: String,
    amount: String,
    sequence: i64,
    fee: String,
    memo: Option<String>,
    timeout: Duration,
    composed_at: Option<u64>,
}

impl PaymentRequest {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            amount: amount.into(),
            sequence: 0,
            fee: DEFAULT_BASE_FEE.to_string(),
            memo: None,
            timeout: DEFAULT_TX_TIMEOUT,
            composed_at: None,
        }
    }

    /// The source account's current (last consumed) sequence number. The
    /// composed transaction uses the next one.
    pub fn sequence(mut self, sequence: i64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Base fee per operation, in stroops, as a decimal string.
    pub fn fee(mut self, fee: impl Into<String>) -> Self {
        self.fee = fee.into();
        self
    }

    /// Text memo, at most 28 bytes.
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Like [`memo`](Self::memo), for callers holding an `Option`.
    pub fn maybe_memo(mut self, memo: Option<String>) -> Self {
        self.memo = memo;
        self
    }

    /// Validity window. Zero means no upper time bound.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pins the composition instant (Unix seconds) instead of reading the
    /// clock.
    pub fn composed_at(mut self, unix_secs: u64) -> Self {
        self.composed_at = Some(unix_secs);
        self
    }

    /// Validates every input and builds the unsigned envelope.
    ///
    /// # Errors
    ///
    /// In check order: `InvalidAccountReference` (source, then
    /// destination), `InvalidAmount`, `InvalidFee` / `InsufficientFee`,
    /// `MemoTooLong`, `InvalidSequence`.
    pub fn compose(&self, network: &Network) -> Result<ComposedPayment, SigningError> {
        let source: AccountId = self.source.parse()?;
        let destination: AccountId = self.destination.parse()?;
        let amount = Amount::parse(&self.amount)?;
        let fee = parse_base_fee(&self.fee)?;
        let memo = match &self.memo {
            Some(text) => Memo::text(text.as_str())?,
            None => Memo::None,
        };
        let seq_num = next_sequence(self.sequence)?;

        let now = self
            .composed_at
            .unwrap_or_else(|| Utc::now().timestamp().max(0) as u64);
        let max_time = if self.timeout.is_zero() {
            0
        } else {
            now.saturating_add(self.timeout.as_secs())
        };

        let operations = vec![Operation::payment(destination, amount)];
        let tx = Transaction {
            source_account: source,
            fee: fee * operations.len() as u32,
            seq_num,
            cond: Preconditions::Time(TimeBounds {
                min_time: 0,
                max_time,
            }),
            memo,
            operations,
        };

        let envelope = TransactionEnvelope::unsigned(tx)?;
        tracing::debug!(
            source = %source,
            destination = %destination,
            amount = %amount,
            seq_num,
            max_time,
            network = %network,
            "composed payment"
        );

        Ok(ComposedPayment {
            envelope,
            network: network.clone(),
        })
    }
}

/// Positional form of [`PaymentRequest`] for callers that already hold every
/// field.
#[allow(clippy::too_many_arguments)]
pub fn compose(
    source_account_id: &str,
    source_sequence: i64,
    destination_account_id: &str,
    amount: &str,
    fee: &str,
    memo: Option<&str>,
    network: &Network,
) -> Result<ComposedPayment, SigningError> {
    PaymentRequest::new(source_account_id, destination_account_id, amount)
        .sequence(source_sequence)
        .fee(fee)
        .maybe_memo(memo.map(str::to_string))
        .compose(network)
}

fn parse_base_fee(input: &str) -> Result<u32, SigningError> {
    let reject = |reason: &str| SigningError::InvalidFee {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(reject("expected a whole number of stroops"));
    }
    let fee: u64 = input.parse().map_err(|_| reject("fee is too large"))?;
    if fee < MIN_BASE_FEE as u64 {
        return Err(SigningError::InsufficientFee {
            fee,
            minimum: MIN_BASE_FEE,
        });
    }
    u32::try_from(fee).map_err(|_| reject("fee is too large"))
}

fn next_sequence(current: i64) -> Result<i64, SigningError> {
    if current < 0 {
        return Err(SigningError::InvalidSequence(current));
    }
    current
        .checked_add(1)
        .ok_or(SigningError::InvalidSequence(current))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::RawPublicKey;
    use crate::error::ErrorKind;

    fn accounts() -> (String, String) {
        (
            RawPublicKey::from_bytes([0x11; 32]).account_id().to_string(),
            RawPublicKey::from_bytes([0x22; 32]).account_id().to_string(),
        )
    }

    fn sample() -> PaymentRequest {
        let (a, b) = accounts();
        PaymentRequest::new(a, b, "10.0000000")
            .sequence(42)
            .composed_at(1_700_000_000)
    }

    #[test]
    fn composes_single_payment() {
        let composed = sample().compose(&Network::testnet()).unwrap();
        let tx = composed.envelope().tx();
        assert_eq!(tx.operations().len(), 1);
        assert_eq!(tx.fee(), 100);
        assert_eq!(tx.seq_num(), 43);
        assert!(tx.memo().is_none());
        let pay = tx.operations()[0].as_payment();
        assert_eq!(pay.amount.stroops(), 100_000_000);
        assert_eq!(pay.destination.public_key().as_bytes(), &[0x22; 32]);
        assert!(!composed.envelope().is_signed());
    }

    #[test]
    fn time_bound_is_composition_instant_plus_timeout() {
        let composed = sample().compose(&Network::testnet()).unwrap();
        let tb = composed
            .envelope()
            .tx()
            .preconditions()
            .time_bounds()
            .copied();
        assert_eq!(
            tb,
            Some(TimeBounds {
                min_time: 0,
                max_time: 1_700_000_060,
            })
        );
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        let composed = sample()
            .timeout(Duration::ZERO)
            .compose(&Network::testnet())
            .unwrap();
        let tb = composed
            .envelope()
            .tx()
            .preconditions()
            .time_bounds()
            .copied();
        assert_eq!(tb.map(|t| t.max_time), Some(0));
    }

    #[test]
    fn clock_is_used_when_not_pinned() {
        let (a, b) = accounts();
        let before = Utc::now().timestamp() as u64;
        let composed = PaymentRequest::new(a, b, "1")
            .compose(&Network::testnet())
            .unwrap();
        let after = Utc::now().timestamp() as u64;
        let max = composed
            .envelope()
            .tx()
            .preconditions()
            .time_bounds()
            .unwrap()
            .max_time;
        assert!(max >= before + 60 && max <= after + 60);
    }

    #[test]
    fn pinned_instant_is_reproducible() {
        let net = Network::testnet();
        let one = sample().compose(&net).unwrap();
        let two = sample().compose(&net).unwrap();
        assert_eq!(one, two);
        assert_eq!(one.digest().unwrap(), two.digest().unwrap());
    }

    #[test]
    fn memo_is_attached() {
        let composed = sample()
            .memo("invoice 7")
            .compose(&Network::testnet())
            .unwrap();
        assert_eq!(
            composed.envelope().tx().memo(),
            &Memo::Text("invoice 7".to_string())
        );
    }

    #[test]
    fn rejects_oversized_memo() {
        let err = sample()
            .memo("x".repeat(29))
            .compose(&Network::testnet())
            .unwrap_err();
        assert_eq!(
            err,
            SigningError::MemoTooLong {
                length: 29,
                max: 28,
            }
        );
    }

    #[test]
    fn rejects_bad_accounts() {
        let (a, _) = accounts();
        let err = PaymentRequest::new("GBAD", a.clone(), "1")
            .compose(&Network::testnet())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAccountReference);

        let err = PaymentRequest::new(a, "GBAD", "1")
            .compose(&Network::testnet())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAccountReference);
    }

    #[test]
    fn rejects_bad_amount() {
        let (a, b) = accounts();
        let err = PaymentRequest::new(a, b, "1.12345678")
            .compose(&Network::testnet())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);
    }

    #[test]
    fn fee_rules() {
        let net = Network::testnet();
        assert_eq!(
            sample().fee("99").compose(&net).unwrap_err(),
            SigningError::InsufficientFee {
                fee: 99,
                minimum: 100,
            }
        );
        for bad in ["", "abc", "+100", "1.5", "-100", "4294967296"] {
            let err = sample().fee(bad).compose(&net).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidFee, "fee {bad:?}");
        }
        let composed = sample().fee("4294967295").compose(&net).unwrap();
        assert_eq!(composed.envelope().tx().fee(), u32::MAX);
    }

    #[test]
    fn sequence_rules() {
        let net = Network::testnet();
        assert_eq!(
            sample().sequence(-1).compose(&net).unwrap_err(),
            SigningError::InvalidSequence(-1)
        );
        assert_eq!(
            sample().sequence(i64::MAX).compose(&net).unwrap_err(),
            SigningError::InvalidSequence(i64::MAX)
        );
        let composed = sample().sequence(0).compose(&net).unwrap();
        assert_eq!(composed.envelope().tx().seq_num(), 1);
    }

    #[test]
    fn positional_compose_matches_builder() {
        let (a, b) = accounts();
        let net = Network::testnet();
        let positional = compose(&a, 42, &b, "10.0000000", "100", None, &net).unwrap();
        let built = PaymentRequest::new(a, b, "10.0000000")
            .sequence(42)
            .compose(&net)
            .unwrap();
        // Time bounds may differ by a clock tick; everything else must agree.
        assert_eq!(
            positional.envelope().tx().operations(),
            built.envelope().tx().operations()
        );
        assert_eq!(
            positional.envelope().tx().seq_num(),
            built.envelope().tx().seq_num()
        );
    }
}
