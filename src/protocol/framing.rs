//! Length-prefixed framing over an async byte stream.
//!
//! Wire format:
//! ```text
//! ┌──────────┬─────────────┐
//! │ Length   │ Payload     │
//! │ 4 bytes  │ N bytes     │
//! │ uint32 BE│             │
//! └──────────┴─────────────┘
//! ```
//!
//! Reads are exact: a frame is either delivered whole or not at all. A peer
//! that disappears mid-prefix counts as a clean close; a peer that
//! disappears mid-body does not.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, RpcError};

/// Size of the length prefix in bytes (fixed, exactly 4).
pub const LEN_PREFIX_SIZE: usize = 4;

/// Default maximum frame length, shared by both directions.
pub const DEFAULT_MAX_FRAME_LEN: u32 = 1000;

/// Read one frame from the stream.
///
/// Blocks until a complete frame arrives. Returns `Ok(None)` when the peer
/// closes the connection at a frame boundary (EOF on the length prefix,
/// complete or partial). A declared length above `max_len` is rejected
/// before any body byte is read.
///
/// # Errors
///
/// - [`RpcError::FrameTooLong`] if the declared length exceeds `max_len`
/// - [`RpcError::ConnectionClosed`] if the peer closes mid-body
/// - [`RpcError::Io`] for any other transport failure
pub async fn read_frame<R>(reader: &mut R, max_len: u32) -> Result<Option<Bytes>>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LEN_PREFIX_SIZE];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(RpcError::Io(e)),
    }

    let len = u32::from_be_bytes(prefix);
    if len > max_len {
        return Err(RpcError::FrameTooLong { len, max: max_len });
    }

    let mut payload = vec![0u8; len as usize];
    match reader.read_exact(&mut payload).await {
        Ok(_) => Ok(Some(Bytes::from(payload))),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(RpcError::ConnectionClosed)
        }
        Err(e) => Err(RpcError::Io(e)),
    }
}

/// Write one frame to the stream: length prefix, payload, flush.
///
/// The configured maximum applies to writes as well, so a response can
/// never be longer than a request is allowed to be.
///
/// # Errors
///
/// - [`RpcError::FrameTooLong`] if the payload exceeds `max_len`
/// - [`RpcError::Io`] for transport failures
pub async fn write_frame<W>(writer: &mut W, payload: &[u8], max_len: u32) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len()).map_err(|_| RpcError::FrameTooLong {
        len: u32::MAX,
        max: max_len,
    })?;
    if len > max_len {
        return Err(RpcError::FrameTooLong { len, max: max_len });
    }

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        write_frame(&mut client, b"hello", DEFAULT_MAX_FRAME_LEN)
            .await
            .unwrap();

        let frame = read_frame(&mut server, DEFAULT_MAX_FRAME_LEN)
            .await
            .unwrap()
            .expect("frame expected");
        assert_eq!(&frame[..], b"hello");
    }

    #[tokio::test]
    async fn test_zero_length_frame_is_valid() {
        let (mut client, mut server) = tokio::io::duplex(64);

        write_frame(&mut client, b"", DEFAULT_MAX_FRAME_LEN)
            .await
            .unwrap();

        let frame = read_frame(&mut server, DEFAULT_MAX_FRAME_LEN)
            .await
            .unwrap()
            .expect("frame expected");
        assert!(frame.is_empty());
    }

    #[tokio::test]
    async fn test_roundtrip_at_maximum_length() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let payload = vec![0xABu8; DEFAULT_MAX_FRAME_LEN as usize];

        write_frame(&mut client, &payload, DEFAULT_MAX_FRAME_LEN)
            .await
            .unwrap();

        let frame = read_frame(&mut server, DEFAULT_MAX_FRAME_LEN)
            .await
            .unwrap()
            .expect("frame expected");
        assert_eq!(frame.len(), payload.len());
    }

    #[tokio::test]
    async fn test_fragmented_writes_reassemble() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        // Hand-written frame delivered one byte at a time.
        let mut raw = 5u32.to_be_bytes().to_vec();
        raw.extend_from_slice(b"12345");

        let writer = tokio::spawn(async move {
            for byte in raw {
                client.write_all(&[byte]).await.unwrap();
                client.flush().await.unwrap();
                tokio::task::yield_now().await;
            }
            client
        });

        let frame = read_frame(&mut server, DEFAULT_MAX_FRAME_LEN)
            .await
            .unwrap()
            .expect("frame expected");
        assert_eq!(&frame[..], b"12345");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_oversize_declared_length_rejected_before_body() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        // Prefix claims 2000 bytes; no body follows.
        client.write_all(&2000u32.to_be_bytes()).await.unwrap();

        let err = read_frame(&mut server, DEFAULT_MAX_FRAME_LEN)
            .await
            .unwrap_err();
        match err {
            RpcError::FrameTooLong { len, max } => {
                assert_eq!(len, 2000);
                assert_eq!(max, DEFAULT_MAX_FRAME_LEN);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_eof_on_prefix_is_clean_close() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);

        let frame = read_frame(&mut server, DEFAULT_MAX_FRAME_LEN).await.unwrap();
        assert!(frame.is_none());
    }

    #[tokio::test]
    async fn test_eof_on_partial_prefix_is_clean_close() {
        let (mut client, mut server) = tokio::io::duplex(64);

        client.write_all(&[0x00, 0x00]).await.unwrap();
        drop(client);

        let frame = read_frame(&mut server, DEFAULT_MAX_FRAME_LEN).await.unwrap();
        assert!(frame.is_none());
    }

    #[tokio::test]
    async fn test_eof_mid_body_is_connection_closed() {
        let (mut client, mut server) = tokio::io::duplex(64);

        client.write_all(&10u32.to_be_bytes()).await.unwrap();
        client.write_all(b"abc").await.unwrap();
        drop(client);

        let err = read_frame(&mut server, DEFAULT_MAX_FRAME_LEN)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_write_rejects_oversize_payload() {
        let (mut client, _server) = tokio::io::duplex(4096);
        let payload = vec![0u8; DEFAULT_MAX_FRAME_LEN as usize + 1];

        let err = write_frame(&mut client, &payload, DEFAULT_MAX_FRAME_LEN)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::FrameTooLong { .. }));
    }
}
