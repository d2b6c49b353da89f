//! Durability backing selection for a [`crate::Mal`].

use std::path::PathBuf;

/// How a MAL's buckets are backed and whether mutations are flushed.
///
/// Mirrors [`shardlog_core::StorageMode`] but carries the data path a
/// durable MAL needs to find its bucket files on recovery; the core enum
/// stays path-free so it can be shared by crates that never touch disk.
#[derive(Debug, Clone)]
pub enum Durability {
    /// Anonymous memory. Nothing survives a crash.
    Volatile,
    /// mmap'd bucket files under `dir`; mutations reach the page cache but
    /// are never explicitly synced by the MAL itself.
    RelaxedDurable { dir: PathBuf },
    /// mmap'd bucket files under `dir`; every `write` flushes the touched
    /// pages before returning.
    Strict { dir: PathBuf },
}

impl Durability {
    pub(crate) fn dir(&self) -> Option<&PathBuf> {
        match self {
            Durability::Volatile => None,
            Durability::RelaxedDurable { dir } | Durability::Strict { dir } => Some(dir),
        }
    }

    pub(crate) fn flush_on_write(&self) -> bool {
        matches!(self, Durability::Strict { .. })
    }
}
