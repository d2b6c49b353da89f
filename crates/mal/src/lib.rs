//! Monotonic append log: a lock-free, index-addressable container of
//! fixed-size slots with deterministic slot→address mapping, optional
//! memory-mapped durability, and crash-safe growth.
//!
//! The container is a two-level directory of fixed-size *buckets*
//! (`directory` + `bucket`), allocated lazily and installed with a CAS so
//! concurrent `at(i)` calls never contend on a lock. [`Mal`] is the
//! generic slot container; [`ByteLog`] and [`StateLog`] are the two
//! concrete instantiations the log store shard needs — byte payloads and
//! per-record state words, respectively.

mod bucket;
mod directory;
mod durability;
mod mal;

pub mod bytelog;
pub mod statelog;

pub use bucket::ZeroInit;
pub use bytelog::ByteLog;
pub use durability::Durability;
pub use mal::Mal;
pub use statelog::StateLog;
