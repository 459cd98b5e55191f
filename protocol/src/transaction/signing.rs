//! End-to-end signing with an external signer.
//!
//! Signing is a separate step from composition because the key never leaves
//! the HSM. [`SigningPipeline`] runs the fixed sequence
//!
//! ```text
//! compose → digest → external sign → assemble
//! ```
//!
//! with exactly one suspension point, the signer call. Every intermediate
//! value is immutable and owned by the call, so concurrent requests share
//! nothing but the signer and the (read-only) registry.

use serde::Serialize;
use std::sync::Arc;

use super::assembler::assemble_raw;
use super::builder::PaymentRequest;
use super::envelope::TransactionEnvelope;
use super::hashing::{self, SignableDigest};
use crate::config::Network;
use crate::crypto::{AccountId, RawSignature};
use crate::error::SigningError;
use crate::signer::{sign_digest, ExternalSigner, KeyId, KeyRegistry};

/// Everything produced by one signing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedPayment {
    /// The envelope with the new signature appended.
    #[serde(serialize_with = "envelope_base64")]
    pub envelope: TransactionEnvelope,
    /// The digest that was signed.
    pub digest: SignableDigest,
    /// The signer's raw output.
    pub signature: RawSignature,
    /// Account of the key that signed.
    pub account: AccountId,
}

fn envelope_base64<S: serde::Serializer>(
    envelope: &TransactionEnvelope,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&envelope.to_base64())
}

/// Composes, hashes, signs and assembles under a fixed network.
#[derive(Clone)]
pub struct SigningPipeline {
    network: Network,
    signer: Arc<dyn ExternalSigner>,
    registry: Arc<dyn KeyRegistry>,
}

impl SigningPipeline {
    pub fn new(
        network: Network,
        signer: Arc<dyn ExternalSigner>,
        registry: Arc<dyn KeyRegistry>,
    ) -> Self {
        Self {
            network,
            signer,
            registry,
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Composes `request` and signs it with `key_id`.
    ///
    /// Validation errors are returned before the signer is contacted.
    pub async fn sign_payment(
        &self,
        request: &PaymentRequest,
        key_id: &KeyId,
    ) -> Result<SignedPayment, SigningError> {
        let composed = request.compose(&self.network)?;
        self.sign_envelope(composed.envelope(), key_id).await
    }

    /// Signs an existing envelope (freshly composed or parsed from base64)
    /// with `key_id`, appending to whatever signatures it already carries.
    pub async fn sign_envelope(
        &self,
        envelope: &TransactionEnvelope,
        key_id: &KeyId,
    ) -> Result<SignedPayment, SigningError> {
        envelope.ensure_signature_room()?;
        let public_key = self.registry.public_key(key_id)?;
        let account = public_key.account_id();

        let source = envelope.tx().source_account();
        if *source != account {
            tracing::warn!(
                key_id = %key_id,
                signer_account = %account,
                source_account = %source,
                "signing key does not belong to the transaction source"
            );
        }

        let digest = hashing::digest(envelope, &self.network)?;
        let signature = sign_digest(self.signer.as_ref(), key_id, digest.as_bytes()).await?;
        let signed = assemble_raw(envelope, &public_key, &signature)?;

        tracing::info!(
            key_id = %key_id,
            account = %account,
            network = %self.network,
            digest = %digest.to_hex(),
            signatures = signed.signatures().len(),
            "transaction signed"
        );

        Ok(SignedPayment {
            envelope: signed,
            digest,
            signature,
            account,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_SIGNATURES;
    use crate::crypto::RawPublicKey;
    use crate::error::ErrorKind;
    use crate::signer::InMemoryKeyRegistry;
    use crate::transaction::assembler::assemble;
    use crate::transaction::verification::verify_signature;
    use async_trait::async_trait;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Holds test keys in memory and signs like an HSM would.
    struct SoftHsm {
        keys: Vec<(KeyId, SigningKey)>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExternalSigner for SoftHsm {
        async fn sign(
            &self,
            key_id: &KeyId,
            digest: &SignableDigest,
        ) -> Result<Vec<u8>, SigningError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (_, key) = self
                .keys
                .iter()
                .find(|(id, _)| id == key_id)
                .ok_or_else(|| SigningError::KeyNotFound(key_id.to_string()))?;
            Ok(key.sign(digest.as_bytes()).to_bytes().to_vec())
        }
    }

    struct Fixture {
        pipeline: SigningPipeline,
        hsm: Arc<SoftHsm>,
        alice: RawPublicKey,
        bob: RawPublicKey,
    }

    fn fixture() -> Fixture {
        let alice_sk = SigningKey::generate(&mut OsRng);
        let bob_sk = SigningKey::generate(&mut OsRng);
        let alice = RawPublicKey::from_bytes(alice_sk.verifying_key().to_bytes());
        let bob = RawPublicKey::from_bytes(bob_sk.verifying_key().to_bytes());

        let registry: InMemoryKeyRegistry = [
            (KeyId::new("alice"), alice),
            (KeyId::new("bob"), bob),
        ]
        .into_iter()
        .collect();
        let hsm = Arc::new(SoftHsm {
            keys: vec![(KeyId::new("alice"), alice_sk), (KeyId::new("bob"), bob_sk)],
            calls: AtomicUsize::new(0),
        });

        Fixture {
            pipeline: SigningPipeline::new(Network::testnet(), hsm.clone(), Arc::new(registry)),
            hsm,
            alice,
            bob,
        }
    }

    fn request(f: &Fixture) -> PaymentRequest {
        PaymentRequest::new(
            f.alice.account_id().to_string(),
            f.bob.account_id().to_string(),
            "25.5",
        )
        .sequence(100)
        .composed_at(1_700_000_000)
    }

    #[tokio::test]
    async fn signs_payment_end_to_end() {
        let f = fixture();
        let signed = f
            .pipeline
            .sign_payment(&request(&f), &KeyId::new("alice"))
            .await
            .unwrap();

        assert_eq!(signed.account, f.alice.account_id());
        assert_eq!(signed.envelope.signatures().len(), 1);
        assert!(signed.envelope.signatures()[0].hint.matches(&f.alice));
        assert_eq!(verify_signature(&signed.envelope, &Network::testnet(), &f.alice), Ok(()));
    }

    #[tokio::test]
    async fn co_signing_appends() {
        let f = fixture();
        let first = f
            .pipeline
            .sign_payment(&request(&f), &KeyId::new("alice"))
            .await
            .unwrap();
        let second = f
            .pipeline
            .sign_envelope(&first.envelope, &KeyId::new("bob"))
            .await
            .unwrap();

        assert_eq!(second.digest, first.digest);
        assert_eq!(second.envelope.signatures().len(), 2);
        assert_eq!(second.envelope.signatures()[0], first.envelope.signatures()[0]);
        assert!(verify_signature(&second.envelope, &Network::testnet(), &f.bob).is_ok());
    }

    #[tokio::test]
    async fn unknown_key_fails_before_signer() {
        let f = fixture();
        let err = f
            .pipeline
            .sign_payment(&request(&f), &KeyId::new("mallory"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyNotFound);
        assert_eq!(f.hsm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_request_fails_before_signer() {
        let f = fixture();
        let err = f
            .pipeline
            .sign_payment(&request(&f).memo("m".repeat(29)), &KeyId::new("alice"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MemoTooLong);
        assert_eq!(f.hsm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn full_envelope_fails_before_signer() {
        let f = fixture();
        let mut env = request(&f)
            .compose(&Network::testnet())
            .unwrap()
            .into_envelope();
        for i in 0..MAX_SIGNATURES {
            env = assemble(&env, &[i as u8; 32], &[i as u8; 64]).unwrap();
        }

        let err = f
            .pipeline
            .sign_envelope(&env, &KeyId::new("alice"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SerializationError);
        assert_eq!(f.hsm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn serializes_for_api_callers() {
        let f = fixture();
        let signed = f
            .pipeline
            .sign_payment(&request(&f), &KeyId::new("alice"))
            .await
            .unwrap();
        let json = serde_json::to_value(&signed).unwrap();
        assert_eq!(json["envelope"], signed.envelope.to_base64());
        assert_eq!(json["digest"], signed.digest.to_base64());
        assert_eq!(json["account"], f.alice.account_id().to_string());
    }
}
