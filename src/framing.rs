//! Length-prefixed TCP framing: `[len: u16 LE][payload: len bytes]`.
//!
//! This is the only layer aware of the 2-byte length prefix; everything
//! above it (transport, session) deals in whole messages.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ErrorKind};

use crate::codec::MAX_MESSAGE_LEN;
use crate::error::FramingError;

/// Reads one length-prefixed frame from `reader`.
///
/// Returns `Ok(None)` on a clean EOF before any bytes of a new frame have
/// been read. A short read partway through a frame is
/// [`FramingError::UnexpectedEof`], never a silent `None` (spec.md §4.2).
///
/// # Errors
///
/// Returns [`FramingError::InvalidFrame`] for a zero length prefix,
/// [`FramingError::FrameTooLarge`] above [`MAX_MESSAGE_LEN`], and
/// [`FramingError::Io`]/[`FramingError::UnexpectedEof`] on I/O failure.
pub async fn read_message<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Vec<u8>>, FramingError> {
    // Read the first byte on its own: a zero-length read here is a clean
    // EOF between frames. Once that byte is in hand, any further EOF is
    // a truncated frame, not a clean shutdown.
    let mut len_buf = [0u8; 2];
    let first_byte = reader
        .read(&mut len_buf[..1])
        .await
        .map_err(FramingError::Io)?;
    if first_byte == 0 {
        return Ok(None);
    }
    reader
        .read_exact(&mut len_buf[1..])
        .await
        .map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof => FramingError::UnexpectedEof,
            _ => FramingError::Io(err),
        })?;
    let len = u16::from_le_bytes(len_buf);
    if len == 0 {
        return Err(FramingError::InvalidFrame { len });
    }
    let len = len as usize;
    if len > MAX_MESSAGE_LEN {
        return Err(FramingError::FrameTooLarge {
            len,
            max: MAX_MESSAGE_LEN,
        });
    }
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::UnexpectedEof => FramingError::UnexpectedEof,
            _ => FramingError::Io(err),
        })?;
    Ok(Some(payload))
}

/// Writes one length-prefixed frame to `writer` in a single buffered write.
///
/// # Errors
///
/// Returns [`FramingError::FrameTooLarge`] if `payload` exceeds
/// [`MAX_MESSAGE_LEN`], otherwise [`FramingError::Io`] on write failure.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), FramingError> {
    if payload.len() > MAX_MESSAGE_LEN {
        return Err(FramingError::FrameTooLarge {
            len: payload.len(),
            max: MAX_MESSAGE_LEN,
        });
    }
    let len = u16::try_from(payload.len()).map_err(|_| FramingError::FrameTooLarge {
        len: payload.len(),
        max: MAX_MESSAGE_LEN,
    })?;
    let mut frame = Vec::with_capacity(2 + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(payload);
    writer.write_all(&frame).await.map_err(FramingError::Io)
}
