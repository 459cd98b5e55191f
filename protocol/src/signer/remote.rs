//! Client for an out-of-process signer daemon on a Unix socket.
//!
//! The daemon owns the HSM connection and the key material. We connect per
//! request, send one [`Request`], read one [`Response`] and shut the socket
//! down. Wrap a [`UnixSocketConnector`] in a
//! [`ScopedSigner`](super::ScopedSigner) to get an
//! [`ExternalSigner`](super::ExternalSigner).

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

use super::registry::{public_key_from_export, KeyAdministration, KeySpec, PublicKeyFormat};
use super::scoped::{SignerConnector, SignerSession};
use super::wire::{read_frame, write_frame, Request, Response};
use super::KeyId;
use crate::crypto::RawPublicKey;
use crate::error::SigningError;
use crate::transaction::hashing::SignableDigest;

/// Opens connections to the daemon at a fixed socket path.
#[derive(Debug, Clone)]
pub struct UnixSocketConnector {
    path: PathBuf,
}

impl UnixSocketConnector {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<RemoteSession, SigningError> {
        let stream = UnixStream::connect(&self.path).await.map_err(|e| {
            SigningError::SignerUnavailable(format!("connect {}: {e}", self.path.display()))
        })?;
        tracing::debug!(socket = %self.path.display(), "connected to signer daemon");
        Ok(RemoteSession { stream })
    }

    /// Sends a single request on a fresh connection.
    async fn request(&self, request: &Request) -> Result<Response, SigningError> {
        let mut session = self.open().await?;
        let result = session.call(request).await;
        if let Err(e) = session.disconnect().await {
            tracing::warn!(error = %e, "signer disconnect failed");
        }
        result
    }

    /// Checks the daemon is up and answering.
    pub async fn ping(&self) -> Result<(), SigningError> {
        match self.request(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(unexpected(&other)),
        }
    }
}

#[async_trait]
impl SignerConnector for UnixSocketConnector {
    type Session = RemoteSession;

    async fn connect(&self) -> Result<RemoteSession, SigningError> {
        self.open().await
    }
}

/// One open daemon connection.
pub struct RemoteSession {
    stream: UnixStream,
}

impl RemoteSession {
    async fn call(&mut self, request: &Request) -> Result<Response, SigningError> {
        write_frame(&mut self.stream, request).await?;
        let response: Response = read_frame(&mut self.stream).await?;
        response.into_result()
    }
}

#[async_trait]
impl SignerSession for RemoteSession {
    async fn sign(
        &mut self,
        key_id: &KeyId,
        digest: &SignableDigest,
    ) -> Result<Vec<u8>, SigningError> {
        let request = Request::Sign {
            key_id: key_id.as_str().to_string(),
            digest: *digest.as_bytes(),
        };
        match self.call(&request).await? {
            Response::Signature(bytes) => Ok(bytes),
            other => Err(unexpected(&other)),
        }
    }

    async fn disconnect(&mut self) -> Result<(), SigningError> {
        self.stream
            .shutdown()
            .await
            .map_err(|e| SigningError::SignerUnavailable(format!("shutdown: {e}")))
    }
}

fn unexpected(response: &Response) -> SigningError {
    SigningError::SignerUnavailable(format!("unexpected response from signer: {response:?}"))
}

/// [`KeyAdministration`] backed by the daemon.
#[derive(Debug, Clone)]
pub struct RemoteKeyAdministration {
    connector: UnixSocketConnector,
}

impl RemoteKeyAdministration {
    pub fn new(connector: UnixSocketConnector) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl KeyAdministration for RemoteKeyAdministration {
    async fn create_key(&self, spec: &KeySpec) -> Result<KeyId, SigningError> {
        match self.connector.request(&Request::CreateKey(spec.clone())).await? {
            Response::KeyCreated(id) => Ok(KeyId::new(id)),
            other => Err(unexpected(&other)),
        }
    }

    async fn export_public_key(
        &self,
        key_id: &KeyId,
        format: PublicKeyFormat,
    ) -> Result<RawPublicKey, SigningError> {
        let request = Request::ExportPublicKey {
            key_id: key_id.as_str().to_string(),
            format,
        };
        match self.connector.request(&request).await? {
            Response::PublicKey(bytes) => public_key_from_export(&bytes, format),
            other => Err(unexpected(&other)),
        }
    }
}
