//! Length-prefixed frame codec: a 4-byte little-endian length prefix
//! followed by that many payload bytes.
//!
//! The prefix is pure framing — it is read to know how many bytes to
//! pull off the wire and is never stored. A caller that turns a frame's
//! payload into a record (e.g. `shardlog-engine`'s log-store service)
//! stores exactly the bytes `read_frame` returns, not the framed form.

use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Refuses to allocate more than this many bytes for a single frame,
/// regardless of what the length prefix claims — a malformed or hostile
/// peer should not be able to force an unbounded allocation.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

pub async fn write_frame<W: tokio::io::AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> io::Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "frame payload exceeds u32::MAX")
    })?;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

pub async fn read_frame<R: tokio::io::AsyncRead + Unpin>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await?;
    let len = u32::from_le_bytes(len_bytes);
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame length {len} exceeds max {MAX_FRAME_LEN}"),
        ));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}
