//! Append-only history of published snapshot vectors.

use parking_lot::RwLock;
use shardlog_core::Result;
use shardlog_mal::{ByteLog, Durability};

/// Stores each published snapshot (a `Vec<u64>` of per-shard tails,
/// length `N`) as a fixed-width little-endian record in a
/// [`ByteLog`], with an in-memory index from snapshot id to byte offset.
///
/// The byte log is the source of truth; the offset index is bookkeeping
/// that lets `get` avoid rescanning the log, and is cheap to rebuild
/// because the coordinator always appends with `N` known in advance.
pub struct SnapshotHistory {
    shard_count: usize,
    log: ByteLog,
    offsets: RwLock<Vec<u64>>,
}

impl SnapshotHistory {
    pub fn new(shard_count: usize, bucket_len: u64, dir_len: u64, durability: Durability) -> Self {
        SnapshotHistory {
            shard_count,
            log: ByteLog::new("snapshot_history", bucket_len, dir_len, durability),
            offsets: RwLock::new(Vec::new()),
        }
    }

    /// Append `tails` as the next snapshot, returning its id (its index
    /// in the history).
    pub fn append(&self, tails: &[u64]) -> Result<u64> {
        debug_assert_eq!(tails.len(), self.shard_count);
        let mut bytes = Vec::with_capacity(tails.len() * 8);
        for t in tails {
            bytes.extend_from_slice(&t.to_le_bytes());
        }
        let offset = self.log.reserve(bytes.len() as u64)?;
        self.log.write(offset, &bytes)?;
        let mut offsets = self.offsets.write();
        offsets.push(offset);
        Ok((offsets.len() - 1) as u64)
    }

    /// Look up a previously published snapshot by id. Never blocks once
    /// `id < len()`.
    pub fn get(&self, id: u64) -> Result<Option<Vec<u64>>> {
        let offset = {
            let offsets = self.offsets.read();
            match offsets.get(id as usize) {
                Some(o) => *o,
                None => return Ok(None),
            }
        };
        let bytes = self.log.read(offset, (self.shard_count * 8) as u64)?;
        let tails = bytes
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        Ok(Some(tails))
    }

    pub fn len(&self) -> u64 {
        self.offsets.read().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recently published snapshot, if any.
    pub fn latest(&self) -> Result<Option<Vec<u64>>> {
        let len = self.len();
        if len == 0 {
            return Ok(None);
        }
        self.get(len - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_get_round_trips() {
        let history = SnapshotHistory::new(3, 4096, 16, Durability::Volatile);
        let id = history.append(&[1, 2, 3]).unwrap();
        assert_eq!(id, 0);
        assert_eq!(history.get(0).unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(history.latest().unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn get_beyond_history_returns_none() {
        let history = SnapshotHistory::new(2, 4096, 16, Durability::Volatile);
        history.append(&[5, 6]).unwrap();
        assert_eq!(history.get(1).unwrap(), None);
    }

    #[test]
    fn ids_increase_monotonically() {
        let history = SnapshotHistory::new(1, 4096, 16, Durability::Volatile);
        let a = history.append(&[1]).unwrap();
        let b = history.append(&[2]).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(history.len(), 2);
    }
}
