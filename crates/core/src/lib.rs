//! Shared types for the shardlog core: ids, the record state word, error
//! kinds, and the small set of config enums every other crate needs.
//!
//! This crate has no I/O and no atomics of its own — it is the vocabulary
//! the rest of the workspace shares, kept dependency-free on purpose so
//! that `mal`, `concurrency`, and `storage` can each depend on it without
//! pulling each other in.

pub mod config;
pub mod error;
pub mod ids;
pub mod limits;
pub mod state;

pub use config::{ConcurrencyMode, StorageMode};
pub use error::{Error, Result};
pub use ids::{GlobalId, LocalId, ShardId};
pub use state::{RecordFlags, StateWord};
