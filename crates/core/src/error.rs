//! Error types shared across the shardlog workspace.
//!
//! Each variant corresponds to one of the error kinds in the design's
//! propagation-policy table: some are fatal and surfaced to the caller
//! (`CapacityExceeded`, `StorageError`), some are local read/write failures
//! surfaced per-call (`Invalidated`, `OutOfSnapshot`, `NotYetVisible`), and
//! the rest are transport- or argument-level.

use std::io;
use thiserror::Error;

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the log-store core and its services.
#[derive(Debug, Error)]
pub enum Error {
    /// The MAL directory has no room for another bucket (`i >= B * D`).
    /// Fatal: the containing shard cannot accept further appends.
    #[error("MAL capacity exceeded: slot {slot} exceeds directory capacity {capacity}")]
    CapacityExceeded {
        /// The slot index that could not be addressed.
        slot: u64,
        /// Maximum addressable slot count (`bucket_len * directory_len`).
        capacity: u64,
    },

    /// A bucket mmap or msync failed. Fatal for the containing shard.
    #[error("storage error: {0}")]
    StorageError(#[from] io::Error),

    /// The record at the requested id has its `INVALID` flag set.
    #[error("record {0} is invalidated")]
    Invalidated(u64),

    /// The requested id is not covered by the snapshot it was read against.
    #[error("id {id} is out of snapshot (cut at {snapshot_tail})")]
    OutOfSnapshot {
        /// The id that was requested.
        id: u64,
        /// The snapshot tail it was checked against.
        snapshot_tail: u64,
    },

    /// A read-stalled CC could not confirm `WRITTEN` within the bounded
    /// spin deadline.
    #[error("record {0} not yet visible (spin deadline exceeded)")]
    NotYetVisible(u64),

    /// The RPC peer closed the connection; in-flight calls are abandoned.
    #[error("transport closed")]
    TransportClosed,

    /// Malformed input at an API boundary: bad sizes, unknown
    /// concurrency/storage mode, unknown shard id, and the like.
    #[error("argument error: {0}")]
    ArgumentError(String),
}

impl Error {
    /// Whether retrying the same call against the same shard could succeed.
    ///
    /// `NotYetVisible` is the only variant where a retry is meaningful:
    /// the record may simply not have finished publishing yet.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::NotYetVisible(_))
    }

    /// Whether this error is fatal for the shard that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::CapacityExceeded { .. } | Error::StorageError(_))
    }
}
