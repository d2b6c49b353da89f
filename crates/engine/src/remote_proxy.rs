//! The cross-process counterpart to `LocalShardProxy` and the local
//! branch of [`crate::traversal::TraversalPeer`]: talks to a peer shard
//! over a `shardlog-wire` connection using this crate's request/response
//! protocol.
//!
//! [`shardlog_coordinator::ShardProxy`] is a synchronous trait — the
//! coordinator drives it from its own dedicated `std::thread`, not a
//! tokio task — so `send_begin_snapshot`/`recv_begin_snapshot` bridge to
//! the connection's async API with a borrowed [`tokio::runtime::Handle`]
//! and `block_on`. That's only sound off the runtime's own worker
//! threads, which is exactly where the snapshotter thread runs.
//! `TraversalPeer::traverse` has no such constraint: it's already called
//! from inside an async dispatch handler, so it uses the connection
//! directly.

use crate::protocol::{self, Request, Response};
use crate::traversal::TraversalPeer;
use parking_lot::Mutex;
use shardlog_core::{Error, Result};
use shardlog_wire::Connection;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::runtime::Handle;

pub struct RemoteShardProxy {
    conn: Arc<Connection>,
    runtime: Handle,
    pending_begin: Mutex<Option<u64>>,
    pending_end: Mutex<Option<bool>>,
}

impl RemoteShardProxy {
    pub fn new(conn: Arc<Connection>, runtime: Handle) -> Self {
        RemoteShardProxy {
            conn,
            runtime,
            pending_begin: Mutex::new(None),
            pending_end: Mutex::new(None),
        }
    }

    async fn roundtrip(conn: &Connection, req: &Request) -> Result<Response> {
        let bytes = protocol::encode_request(req)?;
        conn.send(&bytes).await.map_err(|_| Error::TransportClosed)?;
        let (_, reply) = conn.recv().await?;
        protocol::decode_response(&reply)
    }
}

impl shardlog_coordinator::ShardProxy for RemoteShardProxy {
    fn send_begin_snapshot(&self) {
        let conn = Arc::clone(&self.conn);
        let tail = self
            .runtime
            .block_on(async move { Self::roundtrip(&conn, &Request::BeginSnapshot).await });
        let tail = match tail {
            Ok(Response::Id(id)) => Some(id as u64),
            _ => None,
        };
        *self.pending_begin.lock() = tail;
    }

    fn recv_begin_snapshot(&self) -> Result<u64> {
        self.pending_begin
            .lock()
            .take()
            .ok_or_else(|| Error::TransportClosed)
    }

    fn send_end_snapshot(&self, tail: u64) {
        let conn = Arc::clone(&self.conn);
        let req = Request::EndSnapshot { tail: tail as i64 };
        let ok = self.runtime.block_on(async move { Self::roundtrip(&conn, &req).await });
        let ok = matches!(ok, Ok(Response::Bool(true)));
        *self.pending_end.lock() = Some(ok);
    }

    fn recv_end_snapshot(&self) -> Result<bool> {
        Ok(self.pending_end.lock().take().unwrap_or(false))
    }
}

impl TraversalPeer for RemoteShardProxy {
    fn traverse<'a>(
        &'a self,
        id1: i64,
        link_type: i64,
        depth: u32,
        breadth: u32,
        snapshot: &'a [u64],
        visited: &'a HashSet<i64>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<(i64, i64)>>> + Send + 'a>> {
        Box::pin(async move {
            let req = Request::Traverse {
                id1,
                link_type,
                depth,
                breadth,
                snapshot: snapshot.iter().map(|s| *s as i64).collect(),
                visited: visited.iter().copied().collect(),
            };
            match Self::roundtrip(&self.conn, &req).await? {
                Response::Edges(edges) => Ok(edges),
                Response::Error(msg) => Err(Error::ArgumentError(msg)),
                _ => Err(Error::ArgumentError("unexpected response to traverse".to_string())),
            }
        })
    }
}
