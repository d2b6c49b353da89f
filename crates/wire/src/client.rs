//! A pipelined client connection: `send` hands a request's bytes to the
//! write half and returns a correlation id immediately; `recv` blocks on
//! the read half for the next reply. Callers build typed `send_X`/`recv_X`
//! wrappers on top by (de)serialising their own request/response types
//! into the opaque byte payloads this connection moves.

use crate::framing::{read_frame, write_frame};
use shardlog_core::Error;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// A connection's wire envelope is an 8-byte little-endian correlation
/// id followed by the caller's opaque payload.
pub struct Connection {
    write_half: Mutex<OwnedWriteHalf>,
    read_half: Mutex<OwnedReadHalf>,
    next_id: AtomicU64,
}

impl Connection {
    pub async fn connect(addr: SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Connection {
            write_half: Mutex::new(write_half),
            read_half: Mutex::new(read_half),
            next_id: AtomicU64::new(0),
        }
    }

    /// Dispatch `payload` and return immediately with its correlation id.
    /// Does not wait for a reply — callers may issue several `send`s
    /// before the first `recv`.
    pub async fn send(&self, payload: &[u8]) -> io::Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut envelope = Vec::with_capacity(8 + payload.len());
        envelope.extend_from_slice(&id.to_le_bytes());
        envelope.extend_from_slice(payload);
        let mut write_half = self.write_half.lock().await;
        write_frame(&mut *write_half, &envelope).await?;
        Ok(id)
    }

    /// Block for the next reply on this connection. Per spec, replies on
    /// a connection arrive in the order their requests were sent, so
    /// pairing `recv` calls with `send` calls in the same order is
    /// sufficient — the returned id is still surfaced so a caller can
    /// assert that pairing held.
    pub async fn recv(&self) -> Result<(u64, Vec<u8>), Error> {
        let mut read_half = self.read_half.lock().await;
        let frame = read_frame(&mut *read_half)
            .await
            .map_err(|_| Error::TransportClosed)?;
        if frame.len() < 8 {
            return Err(Error::TransportClosed);
        }
        let id = u64::from_le_bytes(frame[..8].try_into().unwrap());
        Ok((id, frame[8..].to_vec()))
    }
}
