//! Lock-free directory of bucket pointers.
//!
//! Each directory slot is a `AtomicPtr<Bucket<T>>`, null until first
//! touch. The install race is resolved with a single CAS: the loser frees
//! its candidate bucket and defers to whichever bucket won.

use crate::bucket::{Bucket, ZeroInit};
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

pub(crate) struct BucketDirectory<T> {
    slots: Box<[AtomicPtr<Bucket<T>>]>,
}

impl<T: ZeroInit> BucketDirectory<T> {
    pub(crate) fn new(dir_len: usize) -> Self {
        let mut slots = Vec::with_capacity(dir_len);
        slots.resize_with(dir_len, || AtomicPtr::new(ptr::null_mut()));
        BucketDirectory {
            slots: slots.into_boxed_slice(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Return the bucket installed at directory index `b`, if any, without
    /// allocating one.
    pub(crate) fn peek(&self, b: usize) -> Option<&Bucket<T>> {
        let ptr = self.slots[b].load(Ordering::Acquire);
        if ptr.is_null() {
            None
        } else {
            Some(unsafe { &*ptr })
        }
    }

    /// Install `bucket` at directory index `b`, unless another thread won
    /// the race first.
    pub(crate) fn install(&self, b: usize, bucket: Bucket<T>) {
        let ptr = self.slots[b].load(Ordering::Acquire);
        if !ptr.is_null() {
            return;
        }
        let candidate = Box::into_raw(Box::new(bucket));
        if let Err(_existing) = self.slots[b].compare_exchange(
            ptr::null_mut(),
            candidate,
            Ordering::Release,
            Ordering::Acquire,
        ) {
            // Lost the race: free our candidate, the winner stays.
            unsafe {
                drop(Box::from_raw(candidate));
            }
        }
    }

    /// Highest directory index with an installed bucket, if any.
    pub(crate) fn max_installed(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.load(Ordering::Acquire).is_null())
            .map(|(idx, _)| idx)
            .max()
    }
}

impl<T> Drop for BucketDirectory<T> {
    fn drop(&mut self) {
        for slot in self.slots.iter() {
            let ptr = slot.load(Ordering::Acquire);
            if !ptr.is_null() {
                unsafe {
                    drop(Box::from_raw(ptr));
                }
            }
        }
    }
}
