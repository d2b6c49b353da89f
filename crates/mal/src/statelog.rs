//! A MAL of packed state words: one slot per record index, holding the
//! length/flags/offset triple that makes a record's bytes in the
//! [`crate::ByteLog`] addressable and its visibility checkable.

use crate::durability::Durability;
use crate::mal::Mal;
use shardlog_core::Result;
use std::sync::atomic::AtomicU64;

pub struct StateLog {
    mal: Mal<u64>,
}

impl StateLog {
    pub fn new(name: impl Into<String>, bucket_len: u64, dir_len: u64, durability: Durability) -> Self {
        StateLog {
            mal: Mal::new(name, bucket_len, dir_len, durability),
        }
    }

    pub fn open_recover(
        name: impl Into<String>,
        bucket_len: u64,
        dir_len: u64,
        durability: Durability,
    ) -> Result<Self> {
        Ok(StateLog {
            mal: Mal::open_recover(name, bucket_len, dir_len, durability)?,
        })
    }

    pub fn size(&self) -> u64 {
        self.mal.size()
    }

    /// Reserve `count` contiguous state-word slots, returning the first
    /// index. Unlike [`crate::ByteLog::reserve`], state words are fixed
    /// size so a reservation never needs bucket-boundary padding.
    pub fn reserve(&self, count: u64) -> Result<u64> {
        self.mal.reserve(count)
    }

    /// Atomic handle to the state word at `i`. Stable since `AtomicU64`
    /// gained `from_ptr`: the slot is a plain `u64` backed either by
    /// anonymous or mmap'd memory, and this reinterprets it in place
    /// rather than copying.
    pub fn atomic_at(&self, i: u64) -> Result<&AtomicU64> {
        let ptr = self.mal.slot_ptr(i)?;
        // SAFETY: the slot is 8-byte aligned (u64 bucket storage) and
        // lives for as long as the bucket does, which outlives this
        // borrow of `self`.
        Ok(unsafe { AtomicU64::from_ptr(ptr) })
    }

    pub fn flush(&self, i: u64) -> Result<()> {
        self.mal.flush_slot(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn atomic_at_reads_zero_initially() {
        let log = StateLog::new("t", 16, 4, Durability::Volatile);
        let i = log.reserve(1).unwrap();
        assert_eq!(log.atomic_at(i).unwrap().load(Ordering::Acquire), 0);
    }

    #[test]
    fn atomic_at_store_is_visible_through_new_handle() {
        let log = StateLog::new("t", 16, 4, Durability::Volatile);
        let i = log.reserve(1).unwrap();
        log.atomic_at(i).unwrap().store(42, Ordering::Release);
        assert_eq!(log.atomic_at(i).unwrap().load(Ordering::Acquire), 42);
    }
}
