//! Log store shard: binds a byte [`shardlog_mal::ByteLog`] and a
//! [`shardlog_mal::StateLog`] to a [`shardlog_concurrency`] tail
//! discipline, adding per-record lifecycle state and the local two-phase
//! snapshot protocol.

mod shard;
mod snapshot;

pub use shard::{AnyShard, LogStoreShard, ShardConfig};
pub use snapshot::{LocalSnapshot, PendingSnapshot};
