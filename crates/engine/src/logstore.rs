//! The log-store RPC service: a thin layer translating global ids onto
//! the local shard's `AnyShard`.

use shardlog_core::{Error, GlobalId, LocalId, Result, ShardId};
use shardlog_sharding::Router;
use shardlog_storage::AnyShard;
use std::sync::Arc;

pub struct LogStoreService {
    shard: Arc<AnyShard>,
    router: Router,
    shard_id: ShardId,
}

impl LogStoreService {
    pub fn new(shard: Arc<AnyShard>, router: Router, shard_id: ShardId) -> Self {
        LogStoreService {
            shard,
            router,
            shard_id,
        }
    }

    fn require_local(&self, global: GlobalId) -> Result<LocalId> {
        let (local, owner) = self.router.decode(global);
        if owner != self.shard_id {
            return Err(Error::ArgumentError(format!(
                "id {} belongs to shard {}, not {}",
                global.get(),
                owner.get(),
                self.shard_id.get()
            )));
        }
        Ok(local)
    }

    pub fn append(&self, payload: &[u8]) -> Result<GlobalId> {
        let local = self.shard.append(payload)?;
        self.router.encode(LocalId::new(local), self.shard_id)
    }

    pub fn multi_append(&self, payloads: &[&[u8]]) -> Result<Vec<GlobalId>> {
        let locals = self.shard.multi_append(payloads)?;
        locals
            .into_iter()
            .map(|l| self.router.encode(LocalId::new(l), self.shard_id))
            .collect()
    }

    pub fn get(&self, id: GlobalId, len: u64, min_snapshot: u64) -> Result<Vec<u8>> {
        let local = self.require_local(id)?;
        self.shard.get(local.get(), len, min_snapshot)
    }

    pub fn update(&self, id: GlobalId, new_payload: &[u8]) -> Result<()> {
        let local = self.require_local(id)?;
        self.shard.update(local.get(), new_payload)
    }

    pub fn invalidate(&self, id: GlobalId) -> Result<bool> {
        let local = self.require_local(id)?;
        self.shard.invalidate(local.get())
    }

    pub fn num_records(&self) -> u64 {
        self.shard.num_records()
    }

    pub fn shard(&self) -> &Arc<AnyShard> {
        &self.shard
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardlog_concurrency::ReadStalled;
    use shardlog_storage::{LogStoreShard, ShardConfig};

    fn service() -> LogStoreService {
        let shard = Arc::new(AnyShard::ReadStalled(LogStoreShard::new(
            ShardConfig::default(),
            ReadStalled::new(),
        )));
        let router = Router::new(3).unwrap();
        LogStoreService::new(shard, router, ShardId::new(0))
    }

    #[test]
    fn append_returns_global_id_with_shard_stamped_in() {
        let svc = service();
        let id = svc.append(b"hello").unwrap();
        assert_eq!(id.get() % 3, 0);
        assert_eq!(svc.get(id, 5, u64::MAX).unwrap(), b"hello");
    }

    #[test]
    fn multi_append_stamps_every_id_with_its_owning_shard() {
        let shard = Arc::new(AnyShard::ReadStalled(LogStoreShard::new(
            ShardConfig::default(),
            ReadStalled::new(),
        )));
        let router = Router::new(3).unwrap();
        let svc = LogStoreService::new(shard, router, ShardId::new(1));
        let payloads: Vec<&[u8]> = vec![b"r0", b"r1", b"r2", b"r3", b"r4", b"r5"];
        let ids = svc.multi_append(&payloads).unwrap();
        let raw: Vec<u64> = ids.iter().map(|g| g.get()).collect();
        assert_eq!(raw, vec![1, 4, 7, 10, 13, 16]);
        assert_eq!(svc.get(ids[2], 2, u64::MAX).unwrap(), b"r2");
    }

    #[test]
    fn get_for_id_owned_by_another_shard_is_rejected() {
        let svc = service();
        let foreign = svc.router.encode(LocalId::new(0), ShardId::new(1)).unwrap();
        assert!(svc.get(foreign, 1, u64::MAX).is_err());
    }
}
