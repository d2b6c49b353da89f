use clap::Parser;
use shardlog_core::{ConcurrencyMode, StorageMode};
use std::path::PathBuf;

/// Recognised server options.
#[derive(Debug, Parser)]
#[command(name = "shardlog-server", about = "Distributed append-centric log store")]
pub struct ServerArgs {
    /// RPC listen port.
    #[arg(long, default_value_t = shardlog_core::limits::DEFAULT_PORT)]
    pub port: u16,

    /// Tail discipline this shard uses.
    #[arg(long = "concurrency-control", default_value = "read-stalled")]
    pub concurrency_control: ConcurrencyMode,

    /// MAL backing for this shard.
    #[arg(long, default_value = "in-memory")]
    pub storage: StorageMode,

    /// Directory root for durable MAL files. Required unless `storage`
    /// is `in-memory`.
    #[arg(long = "data-path")]
    pub data_path: Option<PathBuf>,

    /// Path to the host-list file: one `host[:port]` per line, line
    /// index becomes that line's shard id.
    #[arg(long = "host-list")]
    pub host_list: PathBuf,

    /// This process's shard id (0-based index into the host list).
    #[arg(long = "server-id")]
    pub server_id: u32,

    /// Microseconds between snapshot rounds; 0 means as fast as
    /// possible.
    #[arg(long = "sleep-us", default_value_t = 0)]
    pub sleep_us: u64,
}

impl ServerArgs {
    /// `storage` requires `data_path` to be durable.
    pub fn validate(&self) -> Result<(), shardlog_core::Error> {
        if self.storage != StorageMode::InMemory && self.data_path.is_none() {
            return Err(shardlog_core::Error::ArgumentError(
                "--data-path is required when --storage is durable-relaxed or durable".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        ServerArgs::command().debug_assert();
    }

    #[test]
    fn durable_storage_without_data_path_fails_validation() {
        let args = ServerArgs {
            port: 9090,
            concurrency_control: ConcurrencyMode::ReadStalled,
            storage: StorageMode::Durable,
            data_path: None,
            host_list: PathBuf::from("hosts.txt"),
            server_id: 0,
            sleep_us: 0,
        };
        assert!(args.validate().is_err());
    }
}
