//! Snapshot Coordinator: orchestrates the two-phase atomic snapshot
//! across all shards, keeps an append-only history of published
//! snapshot vectors, and runs the background snapshotter (and optional
//! rate monitor) that drives it.
//!
//! The history is [`history::SnapshotHistory`], an append-only sequence
//! of per-shard tail vectors kept over a [`shardlog_mal::ByteLog`] rather
//! than a second bespoke container.

mod coordinator;
mod history;
mod proxy;

pub use coordinator::{Coordinator, CoordinatorConfig};
pub use history::SnapshotHistory;
pub use proxy::{LocalShardProxy, ShardProxy};
