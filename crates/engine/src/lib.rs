//! Service layer: binds a local log store shard, the sharding router,
//! and the snapshot coordinator into the log-store, graph, and
//! timeseries RPC services, plus the cross-shard traversal read path.

pub mod dispatch;
pub mod graph;
pub mod logstore;
pub mod protocol;
pub mod remote_proxy;
pub mod timeseries;
pub mod traversal;

pub use graph::GraphService;
pub use logstore::LogStoreService;
pub use remote_proxy::RemoteShardProxy;
pub use timeseries::TimeseriesService;
pub use traversal::TraversalService;
