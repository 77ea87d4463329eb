use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::TransportError;

/// Default upper bound for a single frame (1 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Write one length-prefixed frame and close our write half.
///
/// Prefix is a 4-byte big-endian length. Each request/response exchange
/// carries exactly one frame per direction, so the write side is finished
/// right after.
pub async fn write_framed<W>(send: &mut W, data: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let len = u32::try_from(data.len()).map_err(|_| TransportError::FrameTooLarge {
        size: data.len(),
        max: u32::MAX as usize,
    })?;
    send.write_all(&len.to_be_bytes()).await?;
    send.write_all(data).await?;
    send.flush().await?;
    send.shutdown().await?;
    Ok(())
}

/// Read one length-prefixed frame, rejecting anything above `max_size`.
pub async fn read_framed<R>(recv: &mut R, max_size: usize) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut len_buf = [0u8; 4];
    recv.read_exact(&mut len_buf).await?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_size {
        return Err(TransportError::FrameTooLarge {
            size: len,
            max: max_size,
        });
    }

    let mut buf = vec![0u8; len];
    recv.read_exact(&mut buf).await?;
    Ok(buf)
}
