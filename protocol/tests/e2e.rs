//! End-to-end tests for the external-key signing flow.
//!
//! Each test composes, hashes, signs through a stub HSM and assembles, then
//! checks the result the way a validator would. The stub holds ordinary
//! `ed25519-dalek` keys so signatures can be verified for real.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use proptest::prelude::*;
use rand::rngs::OsRng;

use stellar_hsm_protocol::error::{ErrorCategory, ErrorKind};
use stellar_hsm_protocol::signer::{
    sign_digest, ExternalSigner, InMemoryKeyRegistry, KeyId, KeyRegistry, ScopedSigner,
    SignerConnector, SignerSession,
};
use stellar_hsm_protocol::transaction::{
    assemble, digest, verify_signature, PaymentRequest, SignableDigest, SigningPipeline,
    TransactionEnvelope,
};
use stellar_hsm_protocol::{Network, RawPublicKey, SigningError};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// A single in-memory key standing in for the HSM.
struct StubSigner {
    key: SigningKey,
    calls: AtomicUsize,
}

impl StubSigner {
    fn new() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
            calls: AtomicUsize::new(0),
        }
    }

    fn public_key(&self) -> RawPublicKey {
        RawPublicKey::from_bytes(self.key.verifying_key().to_bytes())
    }
}

#[async_trait]
impl ExternalSigner for StubSigner {
    async fn sign(&self, _: &KeyId, digest: &SignableDigest) -> Result<Vec<u8>, SigningError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.key.sign(digest.as_bytes()).to_bytes().to_vec())
    }
}

fn test_network() -> Network {
    Network::new("test-network").unwrap()
}

fn random_account() -> RawPublicKey {
    RawPublicKey::from_bytes(SigningKey::generate(&mut OsRng).verifying_key().to_bytes())
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn happy_path_single_signature_with_source_hint() {
    let network = test_network();
    let signer = StubSigner::new();
    let a = signer.public_key();
    let b = random_account();

    let composed = PaymentRequest::new(
        a.account_id().to_string(),
        b.account_id().to_string(),
        "10.0000000",
    )
    .sequence(42)
    .fee("100")
    .compose(&network)
    .unwrap();
    let unsigned = composed.envelope();
    let d = composed.digest().unwrap();
    assert_eq!(d.as_bytes().len(), 32);
    assert_eq!(d, digest(unsigned, &network).unwrap());

    let sig = sign_digest(&signer, &KeyId::new("a"), d.as_bytes()).await.unwrap();
    let signed = assemble(unsigned, a.as_bytes(), sig.as_bytes()).unwrap();

    assert_eq!(signed.signatures().len(), 1);
    assert_eq!(signed.signatures()[0].hint.as_bytes()[..], a.as_bytes()[28..]);
    assert_eq!(signed.tx().seq_num(), 43);
    assert_eq!(signed.tx().fee(), 100);
    assert_eq!(signed.tx().operations()[0].as_payment().amount.stroops(), 100_000_000);
    assert!(verify_signature(&signed, &network, &a).is_ok());
}

#[tokio::test]
async fn short_digest_is_rejected_without_calling_signer() {
    let signer = StubSigner::new();
    let err = sign_digest(&signer, &KeyId::new("a"), &[0u8; 31])
        .await
        .unwrap_err();

    assert_eq!(err, SigningError::InvalidDigestLength(31));
    assert_eq!(err.kind().category(), ErrorCategory::Validation);
    assert_eq!(signer.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn oversized_memo_produces_no_envelope() {
    let a = random_account().account_id().to_string();
    let b = random_account().account_id().to_string();
    let memo = "a".repeat(29);

    let result = PaymentRequest::new(a, b, "1").memo(memo).compose(&test_network());
    match result {
        Err(SigningError::MemoTooLong { length, max }) => {
            assert_eq!(length, 29);
            assert_eq!(max, 28);
        }
        other => panic!("expected MemoTooLong, got {other:?}"),
    }
}

/// Connector whose sessions always fail mid-request.
struct BrokenTransport {
    releases: Arc<AtomicUsize>,
}

struct BrokenSession {
    releases: Arc<AtomicUsize>,
}

#[async_trait]
impl SignerConnector for BrokenTransport {
    type Session = BrokenSession;

    async fn connect(&self) -> Result<BrokenSession, SigningError> {
        Ok(BrokenSession {
            releases: Arc::clone(&self.releases),
        })
    }
}

#[async_trait]
impl SignerSession for BrokenSession {
    async fn sign(&mut self, _: &KeyId, _: &SignableDigest) -> Result<Vec<u8>, SigningError> {
        Err(SigningError::SignerUnavailable("connection reset by peer".into()))
    }

    async fn disconnect(&mut self) -> Result<(), SigningError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn signer_unavailable_is_surfaced_and_connection_released_once() {
    let releases = Arc::new(AtomicUsize::new(0));
    let signer = ScopedSigner::new(BrokenTransport {
        releases: Arc::clone(&releases),
    });

    let source = random_account();
    let registry = InMemoryKeyRegistry::new();
    registry.record_public_key(KeyId::new("hsm-key"), source);

    let pipeline = SigningPipeline::new(test_network(), Arc::new(signer), Arc::new(registry));
    let request = PaymentRequest::new(
        source.account_id().to_string(),
        random_account().account_id().to_string(),
        "10.0000000",
    )
    .sequence(42);

    let err = pipeline
        .sign_payment(&request, &KeyId::new("hsm-key"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SigningError::SignerUnavailable("connection reset by peer".into())
    );
    assert_eq!(err.kind(), ErrorKind::SignerUnavailable);
    assert!(err.kind().is_retryable());
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn signed_envelope_round_trips_through_base64() {
    let network = Network::testnet();
    let signer = Arc::new(StubSigner::new());
    let a = signer.public_key();

    let registry = InMemoryKeyRegistry::new();
    registry.record_public_key(KeyId::new("a"), a);
    let pipeline = SigningPipeline::new(network.clone(), signer.clone(), Arc::new(registry));

    let request = PaymentRequest::new(
        a.account_id().to_string(),
        random_account().account_id().to_string(),
        "0.0000001",
    )
    .sequence(0)
    .memo("round trip");
    let signed = pipeline.sign_payment(&request, &KeyId::new("a")).await.unwrap();

    let parsed = TransactionEnvelope::from_base64(&signed.envelope.to_base64()).unwrap();
    assert_eq!(parsed.signatures(), signed.envelope.signatures());
    assert_eq!(parsed.tx().operations(), signed.envelope.tx().operations());
    assert_eq!(parsed.tx().memo(), signed.envelope.tx().memo());
    assert_eq!(digest(&parsed, &network).unwrap(), signed.digest);
    assert!(verify_signature(&parsed, &network, &a).is_ok());
}

#[tokio::test]
async fn concurrent_requests_are_independent() {
    let network = test_network();
    let signer = Arc::new(StubSigner::new());
    let a = signer.public_key();
    let registry = InMemoryKeyRegistry::new();
    registry.record_public_key(KeyId::new("a"), a);
    let pipeline = SigningPipeline::new(network.clone(), signer.clone(), Arc::new(registry));

    let mut handles = Vec::new();
    for seq in 0..8 {
        let pipeline = pipeline.clone();
        let request = PaymentRequest::new(
            a.account_id().to_string(),
            random_account().account_id().to_string(),
            "1",
        )
        .sequence(seq);
        handles.push(tokio::spawn(async move {
            pipeline.sign_payment(&request, &KeyId::new("a")).await
        }));
    }

    for handle in handles {
        let signed = handle.await.unwrap().unwrap();
        assert!(verify_signature(&signed.envelope, &network, &a).is_ok());
    }
    assert_eq!(signer.calls.load(Ordering::SeqCst), 8);
}

#[test]
fn error_kinds_are_stable_identifiers() {
    let cases = [
        (SigningError::InvalidDigestLength(31), "invalid_digest_length"),
        (SigningError::SignerRejected("x".into()), "signer_rejected"),
        (SigningError::SerializationError("x".into()), "serialization_error"),
    ];
    for (err, id) in cases {
        assert_eq!(err.kind().as_str(), id);
        assert_eq!(serde_json::to_value(err.kind()).unwrap(), id);
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn digest_is_deterministic_for_any_payment(
        seq in 0i64..i64::MAX,
        stroops in 1i64..1_000_000_000_000,
        fee in 100u32..10_000,
        at in 0u64..4_000_000_000,
        src in proptest::array::uniform32(any::<u8>()),
        dst in proptest::array::uniform32(any::<u8>()),
    ) {
        let network = test_network();
        let amount = format!("{}.{:07}", stroops / 10_000_000, stroops % 10_000_000);
        let request = PaymentRequest::new(
            RawPublicKey::from_bytes(src).account_id().to_string(),
            RawPublicKey::from_bytes(dst).account_id().to_string(),
            amount,
        )
        .sequence(seq)
        .fee(fee.to_string())
        .composed_at(at);

        let one = request.compose(&network).unwrap();
        let two = request.compose(&network).unwrap();
        prop_assert_eq!(one.digest().unwrap(), two.digest().unwrap());
        prop_assert_eq!(one.envelope().to_base64(), two.envelope().to_base64());
    }

    #[test]
    fn assemble_appends_exactly_one(
        existing in 0usize..19,
        key in proptest::array::uniform32(any::<u8>()),
    ) {
        let a = RawPublicKey::from_bytes([7u8; 32]).account_id().to_string();
        let mut env = PaymentRequest::new(a.clone(), a, "1")
            .composed_at(1)
            .compose(&test_network())
            .unwrap()
            .into_envelope();
        for i in 0..existing {
            env = assemble(&env, &[i as u8; 32], &[i as u8; 64]).unwrap();
        }

        let next = assemble(&env, &key, &[0xEE; 64]).unwrap();
        prop_assert_eq!(next.signatures().len(), existing + 1);
        prop_assert_eq!(&next.signatures()[..existing], env.signatures());
        prop_assert_eq!(&next.signatures()[existing].hint.as_bytes()[..], &key[28..]);
    }

    #[test]
    fn base64_round_trip_for_any_envelope(
        src in proptest::array::uniform32(any::<u8>()),
        dst in proptest::array::uniform32(any::<u8>()),
        stroops in 1i64..i64::MAX,
        memo in proptest::option::of("[a-zA-Z0-9 ]{1,28}"),
        signatures in proptest::collection::vec(
            (proptest::array::uniform32(any::<u8>()), proptest::collection::vec(any::<u8>(), 64)),
            0..=20,
        ),
    ) {
        let amount = format!("{}.{:07}", stroops / 10_000_000, stroops % 10_000_000);
        let mut env = PaymentRequest::new(
            RawPublicKey::from_bytes(src).account_id().to_string(),
            RawPublicKey::from_bytes(dst).account_id().to_string(),
            amount,
        )
        .maybe_memo(memo)
        .composed_at(1_700_000_000)
        .compose(&test_network())
        .unwrap()
        .into_envelope();
        for (key, sig) in &signatures {
            env = assemble(&env, key, sig).unwrap();
        }

        let decoded = TransactionEnvelope::from_base64(&env.to_base64()).unwrap();
        prop_assert_eq!(decoded.signatures().len(), signatures.len());
        prop_assert_eq!(decoded, env);
    }
}
