//! Per-call signer sessions.
//!
//! HSM connections are stateful and scarce. Every signature opens one,
//! performs exactly one operation, and closes it again: on success, on a
//! signer-reported error, and on transport failure. A connection that
//! failed to open has nothing to close.
//!
//! The session runs on its own tokio task. If the caller drops the future
//! (a request timeout, a client going away), the HSM operation still runs to
//! completion and the connection is still released. Cancellation is not
//! propagated into the signer.
//!
//! A panicking session is the one exit that skips `disconnect`. The session
//! value is still dropped while the task unwinds, so implementations that
//! close their transport on `Drop` stay safe.

use async_trait::async_trait;
use std::sync::Arc;

use super::{ExternalSigner, KeyId};
use crate::error::SigningError;
use crate::transaction::hashing::SignableDigest;

/// Opens sessions to a signer.
#[async_trait]
pub trait SignerConnector: Send + Sync + 'static {
    type Session: SignerSession;

    /// # Errors
    ///
    /// `SignerUnavailable` when the signer cannot be reached.
    async fn connect(&self) -> Result<Self::Session, SigningError>;
}

/// One open connection to a signer.
#[async_trait]
pub trait SignerSession: Send + 'static {
    async fn sign(
        &mut self,
        key_id: &KeyId,
        digest: &SignableDigest,
    ) -> Result<Vec<u8>, SigningError>;

    /// Releases the connection. Called exactly once per successful
    /// `connect`.
    async fn disconnect(&mut self) -> Result<(), SigningError>;
}

/// An [`ExternalSigner`] that connects for every call.
pub struct ScopedSigner<C> {
    connector: Arc<C>,
}

impl<C: SignerConnector> ScopedSigner<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}

impl<C> Clone for ScopedSigner<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
        }
    }
}

#[async_trait]
impl<C: SignerConnector> ExternalSigner for ScopedSigner<C> {
    async fn sign(
        &self,
        key_id: &KeyId,
        digest: &SignableDigest,
    ) -> Result<Vec<u8>, SigningError> {
        let connector = Arc::clone(&self.connector);
        let key_id = key_id.clone();
        let digest = *digest;

        let task = tokio::spawn(async move {
            sign_once(connector.as_ref(), &key_id, &digest).await
        });

        task.await.map_err(|e| {
            tracing::error!(error = %e, "signer session task did not complete");
            SigningError::SignerUnavailable(format!("signer session aborted: {e}"))
        })?
    }
}

async fn sign_once<C: SignerConnector>(
    connector: &C,
    key_id: &KeyId,
    digest: &SignableDigest,
) -> Result<Vec<u8>, SigningError> {
    let mut session = connector.connect().await?;
    let result = session.sign(key_id, digest).await;

    if let Err(e) = session.disconnect().await {
        // The signature (or the signer's error) is what the caller asked
        // for; a failed release does not override it.
        tracing::warn!(key_id = %key_id, error = %e, "signer disconnect failed");
    }

    if let Err(e) = &result {
        tracing::debug!(key_id = %key_id, kind = e.kind().as_str(), "signer returned an error");
    }
    result
}
