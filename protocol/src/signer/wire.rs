//! Wire protocol for the remote signer daemon.
//!
//! One request, one response, per connection. Each message is a bincode
//! payload preceded by its length as a little-endian `u32`. Frames above
//! [`MAX_REMOTE_FRAME_LENGTH`] are refused on both read and write.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::registry::{KeySpec, PublicKeyFormat};
use crate::config::{DIGEST_LENGTH, MAX_REMOTE_FRAME_LENGTH};
use crate::error::SigningError;

/// Client → daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    Sign {
        key_id: String,
        digest: [u8; DIGEST_LENGTH],
    },
    ExportPublicKey {
        key_id: String,
        format: PublicKeyFormat,
    },
    CreateKey(KeySpec),
    Ping,
}

/// Daemon → client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Signature(Vec<u8>),
    PublicKey(Vec<u8>),
    KeyCreated(String),
    Pong,
    /// The daemon refused the request (policy, algorithm).
    Rejected(String),
    KeyNotFound(String),
    /// The daemon or its HSM failed internally.
    Error(String),
}

impl Response {
    /// Maps the failure responses onto the error taxonomy. Success
    /// responses come back as `Ok(self)`.
    pub fn into_result(self) -> Result<Self, SigningError> {
        match self {
            Self::Rejected(reason) => Err(SigningError::SignerRejected(reason)),
            Self::KeyNotFound(key_id) => Err(SigningError::KeyNotFound(key_id)),
            Self::Error(message) => Err(SigningError::SignerUnavailable(message)),
            other => Ok(other),
        }
    }
}

fn transport(context: &str, e: impl std::fmt::Display) -> SigningError {
    SigningError::SignerUnavailable(format!("{context}: {e}"))
}

/// Writes one length-prefixed frame.
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), SigningError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = bincode::serialize(message).map_err(|e| transport("encode frame", e))?;
    if payload.len() > MAX_REMOTE_FRAME_LENGTH {
        return Err(transport(
            "encode frame",
            format!("{} bytes exceeds {MAX_REMOTE_FRAME_LENGTH}", payload.len()),
        ));
    }

    writer
        .write_all(&(payload.len() as u32).to_le_bytes())
        .await
        .map_err(|e| transport("write frame", e))?;
    writer
        .write_all(&payload)
        .await
        .map_err(|e| transport("write frame", e))?;
    writer.flush().await.map_err(|e| transport("write frame", e))
}

/// Reads one length-prefixed frame.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T, SigningError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| transport("read frame", e))?;

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_REMOTE_FRAME_LENGTH {
        return Err(transport(
            "read frame",
            format!("{len} bytes exceeds {MAX_REMOTE_FRAME_LENGTH}"),
        ));
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| transport("read frame", e))?;
    bincode::deserialize(&payload).map_err(|e| transport("decode frame", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::signer::KeyId;

    #[tokio::test]
    async fn frames_roundtrip_over_a_pipe() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let req = Request::Sign {
            key_id: "k".into(),
            digest: [3; 32],
        };
        write_frame(&mut a, &req).await.unwrap();
        let got: Request = read_frame(&mut b).await.unwrap();
        assert_eq!(got, req);

        let create = Request::CreateKey(KeySpec::ed25519(KeyId::new("n")));
        write_frame(&mut a, &create).await.unwrap();
        assert_eq!(read_frame::<_, Request>(&mut b).await.unwrap(), create);
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_refused() {
        let (mut a, mut b) = tokio::io::duplex(64);
        let len = (MAX_REMOTE_FRAME_LENGTH as u32 + 1).to_le_bytes();
        a.write_all(&len).await.unwrap();
        let err = read_frame::<_, Response>(&mut b).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SignerUnavailable);
        assert!(err.to_string().contains("exceeds"));
    }

    #[tokio::test]
    async fn closed_stream_is_unavailable() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);
        let err = read_frame::<_, Response>(&mut b).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SignerUnavailable);
    }

    #[test]
    fn failure_responses_map_to_error_kinds() {
        let cases = [
            (Response::Rejected("no".into()), ErrorKind::SignerRejected),
            (Response::KeyNotFound("k".into()), ErrorKind::KeyNotFound),
            (Response::Error("hsm down".into()), ErrorKind::SignerUnavailable),
        ];
        for (resp, kind) in cases {
            assert_eq!(resp.into_result().unwrap_err().kind(), kind);
        }
        assert_eq!(Response::Pong.into_result().unwrap(), Response::Pong);
    }
}
