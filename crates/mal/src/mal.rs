//! The generic slot container shared by [`crate::ByteLog`] and
//! [`crate::StateLog`].

use crate::bucket::{Bucket, ZeroInit};
use crate::directory::BucketDirectory;
use crate::durability::Durability;
use shardlog_core::{Error, Result};
use std::fs::OpenOptions;
use std::sync::atomic::{AtomicU64, Ordering};

/// A lock-free, index-addressable container of `T` slots, organized as a
/// directory of fixed-size buckets.
///
/// Slot `i` lives at `directory[i / bucket_len][i % bucket_len]`. Buckets
/// are allocated lazily, on the first `reserve`/`at` that touches them,
/// and installed with a CAS so concurrent callers never block on a lock.
pub struct Mal<T> {
    name: String,
    directory: BucketDirectory<T>,
    cursor: AtomicU64,
    bucket_len: u64,
    durability: Durability,
}

impl<T: ZeroInit> Mal<T> {
    /// Create a fresh, empty MAL. `dir_len` bounds the number of buckets
    /// the directory can ever hold; `bucket_len` is the slot count per
    /// bucket.
    pub fn new(name: impl Into<String>, bucket_len: u64, dir_len: u64, durability: Durability) -> Self {
        Mal {
            name: name.into(),
            directory: BucketDirectory::new(dir_len as usize),
            cursor: AtomicU64::new(0),
            bucket_len,
            durability,
        }
    }

    /// Reopen a durable MAL, reinstalling whatever bucket files are
    /// present and setting the logical cursor to the end of the highest
    /// recovered bucket.
    ///
    /// A crash between `make_bucket` creating bucket `b` and the writer
    /// that reserved slots in it completing is indistinguishable from a
    /// crash with bucket `b` simply unused; recovery therefore always
    /// restores the cursor to `(max_bucket_idx + 1) * bucket_len`, which
    /// may discard a partially-written final bucket's tail slots as
    /// unreserved. Callers needing exact recovery must replay from an
    /// external log of acknowledged appends.
    pub fn open_recover(
        name: impl Into<String>,
        bucket_len: u64,
        dir_len: u64,
        durability: Durability,
    ) -> Result<Self> {
        let name = name.into();
        let mal = Mal {
            name: name.clone(),
            directory: BucketDirectory::new(dir_len as usize),
            cursor: AtomicU64::new(0),
            bucket_len,
            durability,
        };
        let Some(dir) = mal.durability.dir() else {
            return Ok(mal);
        };
        if !dir.exists() {
            return Ok(mal);
        }
        let mut max_idx: Option<u64> = None;
        for b in 0..mal.directory.len() as u64 {
            let path = dir.join(format!("{name}_{b}"));
            if !path.exists() {
                continue;
            }
            let file = OpenOptions::new().read(true).write(true).open(&path)?;
            let bucket = Bucket::open_mapped(&file, mal.bucket_len as usize)?;
            mal.directory.install(b as usize, bucket);
            max_idx = Some(b);
        }
        if let Some(b) = max_idx {
            mal.cursor.store((b + 1) * mal.bucket_len, Ordering::Release);
        }
        Ok(mal)
    }

    /// Current logical size: one past the highest slot ever reserved.
    pub fn size(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }

    pub(crate) fn bucket_len(&self) -> u64 {
        self.bucket_len
    }

    /// Atomically reserve `count` contiguous slots starting at the
    /// returned index, growing the directory as needed.
    pub(crate) fn reserve(&self, count: u64) -> Result<u64> {
        let start = self.cursor.fetch_add(count, Ordering::AcqRel);
        let end = start + count;
        if end > self.bucket_len * self.directory.len() as u64 {
            return Err(Error::CapacityExceeded {
                slot: end,
                capacity: self.bucket_len * self.directory.len() as u64,
            });
        }
        self.ensure_buckets(start, end)?;
        Ok(start)
    }

    pub(crate) fn raw_cursor(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }

    fn ensure_buckets(&self, start: u64, end: u64) -> Result<()> {
        let first_bucket = start / self.bucket_len;
        let last_bucket = (end.saturating_sub(1)) / self.bucket_len;
        for b in first_bucket..=last_bucket {
            if self.directory.peek(b as usize).is_none() {
                let bucket = self.make_bucket(b)?;
                self.directory.install(b as usize, bucket);
            }
        }
        Ok(())
    }

    fn make_bucket(&self, b: u64) -> Result<Bucket<T>> {
        match self.durability.dir() {
            None => Ok(Bucket::new_anonymous(self.bucket_len as usize)),
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let path = dir.join(format!("{}_{b}", self.name));
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .open(path)?;
                Ok(Bucket::open_mapped(&file, self.bucket_len as usize)?)
            }
        }
    }

    /// Raw pointer to slot `i`. Panics in debug builds if `i` falls in a
    /// bucket that has never been reserved into.
    pub(crate) fn slot_ptr(&self, i: u64) -> Result<*mut T> {
        let b = i / self.bucket_len;
        let offset = (i % self.bucket_len) as usize;
        match self.directory.peek(b as usize) {
            Some(bucket) => Ok(bucket.slot_ptr(offset)),
            None => Err(Error::NotYetVisible(i)),
        }
    }

    pub(crate) fn flush_slot(&self, i: u64) -> Result<()> {
        if !self.durability.flush_on_write() {
            return Ok(());
        }
        let b = i / self.bucket_len;
        let offset = (i % self.bucket_len) as usize;
        if let Some(bucket) = self.directory.peek(b as usize) {
            bucket.flush_range(offset, 1)?;
        }
        Ok(())
    }

    pub(crate) fn bucket_len_mask_boundary(&self, i: u64) -> u64 {
        self.bucket_len - (i % self.bucket_len)
    }

    /// Reserve `len` contiguous slots that never straddle a bucket
    /// boundary, padding past the remainder of the current bucket if `len`
    /// would not otherwise fit. Returns the start of the reserved range.
    pub(crate) fn reserve_aligned(&self, len: u64) -> Result<u64> {
        if len > self.bucket_len {
            return Err(Error::ArgumentError(format!(
                "record of {len} slots exceeds bucket size {}",
                self.bucket_len
            )));
        }
        let capacity = self.bucket_len * self.directory.len() as u64;
        loop {
            let cur = self.cursor.load(Ordering::Acquire);
            let remaining_in_bucket = self.bucket_len - (cur % self.bucket_len);
            let start = if remaining_in_bucket < len {
                cur + remaining_in_bucket
            } else {
                cur
            };
            let end = start + len;
            if end > capacity {
                return Err(Error::CapacityExceeded { slot: end, capacity });
            }
            if self
                .cursor
                .compare_exchange_weak(cur, end, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.ensure_buckets(start, end)?;
                return Ok(start);
            }
        }
    }
}
