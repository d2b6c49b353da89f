//! The accept loop: one task per connection, each reading request
//! frames and writing reply frames in the order they arrived. A single
//! connection's requests are handled one at a time, which trivially
//! satisfies the "replies arrive in send order" guarantee; pipelining
//! lets a client keep several requests in flight across its send/recv
//! halves rather than the server interleaving their completions.

use crate::framing::{read_frame, write_frame};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

/// A request handler: takes the opaque payload past the correlation id
/// and returns the opaque reply payload.
pub type Handler =
    Arc<dyn Fn(Vec<u8>) -> Pin<Box<dyn Future<Output = Vec<u8>> + Send>> + Send + Sync>;

pub async fn serve(listener: TcpListener, handler: Handler) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            let (read_half, write_half) = stream.into_split();
            if let Err(err) = serve_connection(read_half, write_half, handler).await {
                tracing::debug!(%peer, ?err, "connection closed");
            }
        });
    }
}

async fn serve_connection<R, W>(
    mut read_half: R,
    mut write_half: W,
    handler: Handler,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let envelope = match read_frame(&mut read_half).await {
            Ok(e) => e,
            Err(_) => return Ok(()),
        };
        if envelope.len() < 8 {
            return Ok(());
        }
        let id = &envelope[..8];
        let payload = envelope[8..].to_vec();
        let reply = handler(payload).await;
        let mut out = Vec::with_capacity(8 + reply.len());
        out.extend_from_slice(id);
        out.extend_from_slice(&reply);
        write_frame(&mut write_half, &out).await?;
    }
}
