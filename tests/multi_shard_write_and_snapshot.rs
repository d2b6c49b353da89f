//! A scaled-down version of what `shardlog-server` wires together at
//! startup: `N=3` in-process shards, each behind a `LogStoreService`,
//! driven by one `Coordinator` over `LocalShardProxy`s. Exercises
//! sharding and the coordinator's atomic snapshot together, the way a
//! real deployment would, but without any network hop.

use shardlog_concurrency::ReadStalled;
use shardlog_coordinator::{Coordinator, CoordinatorConfig, LocalShardProxy, ShardProxy};
use shardlog_core::ShardId;
use shardlog_engine::LogStoreService;
use shardlog_sharding::Router;
use shardlog_storage::{AnyShard, LogStoreShard, ShardConfig};
use std::sync::Arc;

const N: u32 = 3;

fn build_cluster() -> (Vec<Arc<LogStoreService>>, Arc<Coordinator>) {
    let router = Router::new(N).unwrap();
    let mut services = Vec::with_capacity(N as usize);
    let mut proxies: Vec<Arc<dyn ShardProxy>> = Vec::with_capacity(N as usize);

    for i in 0..N {
        let config = ShardConfig {
            name: format!("shard-{i}"),
            ..ShardConfig::default()
        };
        let shard = Arc::new(AnyShard::ReadStalled(LogStoreShard::new(config, ReadStalled::new())));
        proxies.push(Arc::new(LocalShardProxy::new(Arc::clone(&shard))));
        services.push(Arc::new(LogStoreService::new(shard, router, ShardId::new(i))));
    }

    let coordinator = Arc::new(Coordinator::new(proxies, CoordinatorConfig::default()));
    (services, coordinator)
}

#[test]
fn multi_append_sharding_across_a_real_cluster() {
    let (services, _coordinator) = build_cluster();
    let svc = &services[1];
    let payloads: Vec<&[u8]> = vec![b"r0", b"r1", b"r2", b"r3", b"r4", b"r5"];
    let ids = svc.multi_append(&payloads).unwrap();
    let raw: Vec<u64> = ids.iter().map(|g| g.get()).collect();
    assert_eq!(raw, vec![1, 4, 7, 10, 13, 16]);
    assert_eq!(svc.get(ids[2], 2, u64::MAX).unwrap(), b"r2");
}

#[test]
fn coordinator_snapshot_covers_every_shard_after_writes() {
    let (services, coordinator) = build_cluster();
    for (i, svc) in services.iter().enumerate() {
        for r in 0..(i as u32 + 1) {
            svc.append(format!("s{i}-{r}").as_bytes()).unwrap();
        }
    }

    let snapshot_id = coordinator.run_round().unwrap();
    let tails = coordinator.get_snapshot(snapshot_id).unwrap().unwrap();
    assert_eq!(tails, vec![1, 2, 3]);

    // every id already written is inside the published cut
    for (i, svc) in services.iter().enumerate() {
        for r in 0..(i as u32 + 1) {
            let global = Router::new(N).unwrap().encode(
                shardlog_core::LocalId::new(r as u64),
                ShardId::new(i as u32),
            ).unwrap();
            assert!(svc.get(global, 16, tails[i]).is_ok());
        }
    }
}
