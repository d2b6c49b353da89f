//! The `shardlog-server` binary: parses the host-list and CLI config,
//! builds this process's shard plus the log-store, graph, and
//! timeseries services over it, wires up the snapshot coordinator
//! against the other hosts in the list, and serves RPCs.

use clap::Parser;
use shardlog_cli::{parse_host_list, ServerArgs};
use shardlog_coordinator::{Coordinator, CoordinatorConfig, LocalShardProxy, ShardProxy};
use shardlog_core::{ConcurrencyMode, Error, Result, ShardId, StorageMode};
use shardlog_engine::dispatch::Dispatch;
use shardlog_engine::remote_proxy::RemoteShardProxy;
use shardlog_engine::traversal::TraversalPeer;
use shardlog_engine::{GraphService, LogStoreService, TimeseriesService, TraversalService};
use shardlog_mal::Durability;
use shardlog_sharding::Router;
use shardlog_storage::{AnyShard, ShardConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    if let Err(err) = run().await {
        tracing::error!(?err, "shardlog-server exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = ServerArgs::parse();
    args.validate()?;

    let hosts = parse_host_list(&args.host_list)?;
    let shard_count = hosts.len() as u32;
    if args.server_id >= shard_count {
        return Err(Error::ArgumentError(format!(
            "server-id {} out of range for {} hosts in {:?}",
            args.server_id, shard_count, args.host_list
        )));
    }
    let local_shard_id = ShardId::new(args.server_id);
    let router = Router::new(shard_count)?;

    let durability = match args.storage {
        StorageMode::InMemory => Durability::Volatile,
        StorageMode::DurableRelaxed => Durability::RelaxedDurable { dir: require_data_path(&args)? },
        StorageMode::Durable => Durability::Strict { dir: require_data_path(&args)? },
    };
    let has_existing_data = has_existing_data(&durability, "shardlog-shard");

    let shard_config = ShardConfig {
        name: "shardlog-shard".to_string(),
        durability,
        ..ShardConfig::default()
    };

    let shard = Arc::new(match (args.concurrency_control, has_existing_data) {
        (ConcurrencyMode::ReadStalled, false) => AnyShard::new_read_stalled(shard_config),
        (ConcurrencyMode::WriteStalled, false) => AnyShard::new_write_stalled(shard_config),
        (ConcurrencyMode::ReadStalled, true) => AnyShard::open_recover_read_stalled(shard_config)?,
        (ConcurrencyMode::WriteStalled, true) => AnyShard::open_recover_write_stalled(shard_config)?,
    });

    // Nodes, links, and timeseries points are each just opaque records on
    // the one per-process shard; the services differ in how they
    // interpret and index those bytes, not in where they're stored.
    let logstore = Arc::new(LogStoreService::new(Arc::clone(&shard), router, local_shard_id));
    let graph = Arc::new(GraphService::new(Arc::clone(&shard)));
    let timeseries = Arc::new(TimeseriesService::new(Arc::clone(&shard)));
    let traversal = Arc::new(TraversalService::new(router, local_shard_id, Arc::clone(&graph)));

    let mut proxies: Vec<Arc<dyn ShardProxy>> = Vec::with_capacity(hosts.len());
    for (idx, host) in hosts.iter().enumerate() {
        if idx as u32 == args.server_id {
            proxies.push(Arc::new(LocalShardProxy::new(Arc::clone(&shard))));
            continue;
        }
        let addr: SocketAddr = format!("{}:{}", host.host, host.port)
            .parse()
            .map_err(|e| Error::ArgumentError(format!("bad host-list entry {}:{}: {e}", host.host, host.port)))?;
        let conn = Arc::new(
            shardlog_wire::Connection::connect(addr)
                .await
                .map_err(Error::StorageError)?,
        );
        let remote = Arc::new(RemoteShardProxy::new(conn, tokio::runtime::Handle::current()));
        traversal.register_peer(ShardId::new(idx as u32), Arc::clone(&remote) as Arc<dyn TraversalPeer>);
        proxies.push(remote);
    }

    let coordinator = Arc::new(Coordinator::new(
        proxies,
        CoordinatorConfig {
            sleep_us: args.sleep_us,
            ..CoordinatorConfig::default()
        },
    ));
    coordinator.start();
    coordinator.start_monitor(Duration::from_secs(10));

    let dispatch = Arc::new(Dispatch::new(logstore, graph, timeseries, traversal, Arc::clone(&coordinator)));
    let handler = dispatch.into_handler();

    let listener = TcpListener::bind(("0.0.0.0", args.port)).await.map_err(Error::StorageError)?;
    tracing::info!(port = args.port, shard = local_shard_id.get(), "shardlog-server listening");

    let result = shardlog_wire::serve(listener, handler).await.map_err(Error::StorageError);

    coordinator.stop();
    coordinator.stop_monitor();
    result
}

fn require_data_path(args: &ServerArgs) -> Result<PathBuf> {
    args.data_path
        .clone()
        .ok_or_else(|| Error::ArgumentError("--data-path is required for durable storage".to_string()))
}

/// Whether a prior run already left bucket files behind, so this process
/// should recover instead of starting a fresh MAL.
fn has_existing_data(durability: &Durability, name: &str) -> bool {
    let dir = match durability {
        Durability::Volatile => return false,
        Durability::RelaxedDurable { dir } | Durability::Strict { dir } => dir,
    };
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .any(|e| e.file_name().to_string_lossy().starts_with(&format!("{name}_bytes_")))
        })
        .unwrap_or(false)
}
