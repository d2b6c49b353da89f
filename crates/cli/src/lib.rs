//! Argument parsing, host-list files, and config assembly.
//!
//! Kept free of `shardlog-mal`/`shardlog-storage`/`shardlog-coordinator`
//! on purpose: this crate only produces plain config values, it does not
//! construct shards or connections — that's `shardlog-engine`'s job, so
//! crates that need the mode enums can depend on `shardlog-core` alone
//! without pulling in a CLI parser.

mod args;
mod hostlist;

pub use args::ServerArgs;
pub use hostlist::{parse_host_list, HostEntry};
