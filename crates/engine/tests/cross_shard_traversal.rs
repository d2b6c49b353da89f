//! Cross-shard traversal, exercised across two real shards rather than
//! the single-shard unit tests in `traversal.rs`. Each shard runs its
//! own `TraversalService`; the peer link between them is a thin adapter
//! that mimics what `RemoteShardProxy` does over the wire, cloning the
//! `visited` set by value since a real RPC call would serialize it too.

use shardlog_concurrency::ReadStalled;
use shardlog_core::{LocalId, Result, ShardId};
use shardlog_engine::traversal::{TraversalPeer, TraversalService};
use shardlog_engine::GraphService;
use shardlog_sharding::Router;
use shardlog_storage::{AnyShard, LogStoreShard, ShardConfig};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

struct LocalPeer(Arc<TraversalService>);

impl TraversalPeer for LocalPeer {
    fn traverse<'a>(
        &'a self,
        id1: i64,
        link_type: i64,
        depth: u32,
        breadth: u32,
        snapshot: &'a [u64],
        visited: &'a HashSet<i64>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<(i64, i64)>>> + Send + 'a>> {
        let mut cloned = visited.clone();
        Box::pin(async move {
            self.0
                .traverse(id1, link_type, depth, breadth, snapshot, &mut cloned)
                .await
        })
    }
}

fn shard() -> Arc<AnyShard> {
    Arc::new(AnyShard::ReadStalled(LogStoreShard::new(
        ShardConfig::default(),
        ReadStalled::new(),
    )))
}

/// `N=2` with the link chain split across shard boundaries: node 1
/// lives on shard 0, its neighbour 2 on shard 1, forcing `traverse` to
/// actually cross the network rather than stay local the whole way.
#[tokio::test]
async fn traversal_crosses_real_shard_boundary() {
    let router = Router::new(2).unwrap();

    let graph0 = Arc::new(GraphService::new(shard()));
    let graph1 = Arc::new(GraphService::new(shard()));

    // Global ids: even -> shard 0, odd -> shard 1 (global = local*N + shard_id).
    let id1 = router.encode(LocalId::new(0), ShardId::new(0)).unwrap().get() as i64;
    let id2 = router.encode(LocalId::new(0), ShardId::new(1)).unwrap().get() as i64;
    let id3 = router.encode(LocalId::new(1), ShardId::new(0)).unwrap().get() as i64;

    graph0.add_link(id1, id2, 0, vec![]).unwrap();
    graph1.add_link(id2, id3, 0, vec![]).unwrap();

    let cut0 = graph0.shard().num_records();
    let cut1 = graph1.shard().num_records();

    let svc0 = Arc::new(TraversalService::new(router, ShardId::new(0), Arc::clone(&graph0)));
    let svc1 = Arc::new(TraversalService::new(router, ShardId::new(1), Arc::clone(&graph1)));

    svc0.register_peer(ShardId::new(1), Arc::new(LocalPeer(Arc::clone(&svc1))));
    svc1.register_peer(ShardId::new(0), Arc::new(LocalPeer(Arc::clone(&svc0))));

    let mut visited = HashSet::new();
    let edges = svc0
        .traverse(id1, 0, 5, 10, &[cut0, cut1], &mut visited)
        .await
        .unwrap();

    assert_eq!(edges, vec![(id1, id2), (id2, id3)]);
}
