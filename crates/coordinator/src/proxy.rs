//! The shard-facing half of the two-phase snapshot protocol, split into
//! `send_X`/`recv_X` pairs so the coordinator can pipeline phase 1 and
//! phase 2 across all `N` shards whether a shard is local or reached
//! over `shardlog-wire`'s RPC transport.

use parking_lot::Mutex;
use shardlog_core::Result;
use shardlog_storage::AnyShard;
use std::sync::Arc;

/// What the coordinator needs from one shard to run a snapshot round.
///
/// A `send_X` dispatches the request and returns immediately; the
/// matching `recv_X` blocks until the reply is available. For an
/// in-process shard both happen synchronously inside `send_X`, with
/// `recv_X` just returning the stashed result — pipelining only matters
/// once a proxy crosses a real connection.
pub trait ShardProxy: Send + Sync {
    fn send_begin_snapshot(&self);
    fn recv_begin_snapshot(&self) -> Result<u64>;
    fn send_end_snapshot(&self, tail: u64);
    fn recv_end_snapshot(&self) -> Result<bool>;
}

/// A proxy for a shard living in this same process.
pub struct LocalShardProxy {
    shard: Arc<AnyShard>,
    pending_begin: Mutex<Option<u64>>,
    pending_end: Mutex<Option<bool>>,
}

impl LocalShardProxy {
    pub fn new(shard: Arc<AnyShard>) -> Self {
        LocalShardProxy {
            shard,
            pending_begin: Mutex::new(None),
            pending_end: Mutex::new(None),
        }
    }
}

impl ShardProxy for LocalShardProxy {
    fn send_begin_snapshot(&self) {
        let pending = self.shard.begin_snapshot();
        *self.pending_begin.lock() = Some(pending.tail());
    }

    fn recv_begin_snapshot(&self) -> Result<u64> {
        Ok(self
            .pending_begin
            .lock()
            .take()
            .expect("recv_begin_snapshot called without a matching send"))
    }

    fn send_end_snapshot(&self, tail: u64) {
        let pending = shardlog_storage::PendingSnapshot::from_tail(tail);
        let done = self.shard.end_snapshot(pending);
        *self.pending_end.lock() = Some(done.tail() == tail);
    }

    fn recv_end_snapshot(&self) -> Result<bool> {
        Ok(self
            .pending_end
            .lock()
            .take()
            .expect("recv_end_snapshot called without a matching send"))
    }
}
