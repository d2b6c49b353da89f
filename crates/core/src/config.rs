//! Config enums shared between the CLI, storage, and concurrency crates.
//!
//! Kept separate from the CLI's flag-parsing so `shardlog-storage` and
//! `shardlog-concurrency` can depend on the mode enums without depending
//! on `clap`.

use crate::error::Error;
use std::str::FromStr;

/// The tail-advance discipline a log store shard's concurrency control
/// uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// `begin_write` is a bare fetch-add, `end_write` is a no-op; readers
    /// spin-wait on the per-record `WRITTEN` flag. Favours writer
    /// throughput. This is the default.
    ReadStalled,
    /// `end_write` spins until all earlier writers in the same batch have
    /// published. Favours reader simplicity.
    WriteStalled,
}

impl Default for ConcurrencyMode {
    fn default() -> Self {
        ConcurrencyMode::ReadStalled
    }
}

impl FromStr for ConcurrencyMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "read-stalled" => Ok(ConcurrencyMode::ReadStalled),
            "write-stalled" => Ok(ConcurrencyMode::WriteStalled),
            other => Err(Error::ArgumentError(format!(
                "unknown concurrency-control mode {other:?}, expected \
                 read-stalled or write-stalled"
            ))),
        }
    }
}

/// The MAL durability backing a shard uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Anonymous memory, no recovery.
    InMemory,
    /// mmap'd buckets, writes reach the page cache but `msync` is not
    /// called on the hot path.
    DurableRelaxed,
    /// Same as relaxed, plus every mutation is followed by an `msync` of
    /// the containing page before the call returns.
    Durable,
}

impl Default for StorageMode {
    fn default() -> Self {
        StorageMode::InMemory
    }
}

impl FromStr for StorageMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "in-memory" => Ok(StorageMode::InMemory),
            "durable-relaxed" => Ok(StorageMode::DurableRelaxed),
            "durable" => Ok(StorageMode::Durable),
            other => Err(Error::ArgumentError(format!(
                "unknown storage mode {other:?}, expected in-memory, \
                 durable-relaxed, or durable"
            ))),
        }
    }
}
