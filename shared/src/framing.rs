//! Length-delimited framing over any tokio byte stream.
//!
//! Wire format: a 4-byte big-endian length, then the bincode encoding of one
//! [`Message`]. `MAX_MESSAGE_SIZE` bounds the allocation a peer can force
//! with a bogus length prefix.

use crate::{Message, ProtocolError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted frame payload (64 KiB). Chat lines and user lists are far
/// below this.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Encodes `message`, writes it as one frame and flushes.
pub async fn write_message<W>(writer: &mut W, message: &Message) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let payload = bincode::serialize(message)?;
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::FrameTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame and decodes it.
///
/// Returns `Ok(None)` when the peer closed the stream cleanly between frames.
/// A stream that ends inside a frame is an `UnexpectedEof` I/O error.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Message>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    if reader.read(&mut len_buf[..1]).await? == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut len_buf[1..]).await?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    let message = bincode::deserialize(&payload)?;
    Ok(Some(message))
}
