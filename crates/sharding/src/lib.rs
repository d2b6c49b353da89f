//! Sharding and key routing: partitions the global id space by `id mod
//! N` across `N` log store shards.

use shardlog_core::{Error, GlobalId, LocalId, Result, ShardId};

/// The fixed shard count and the encode/decode functions between a
/// shard-local id and a global id.
///
/// `N` is set once at process start from the host-list file and never
/// changes; runtime rebalancing is not supported.
#[derive(Debug, Clone, Copy)]
pub struct Router {
    shard_count: u32,
}

impl Router {
    pub fn new(shard_count: u32) -> Result<Self> {
        if shard_count == 0 {
            return Err(Error::ArgumentError("shard count must be nonzero".to_string()));
        }
        Ok(Router { shard_count })
    }

    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }

    /// `global_id = local_id * N + shard_id`.
    pub fn encode(&self, local: LocalId, shard: ShardId) -> Result<GlobalId> {
        if shard.get() >= self.shard_count {
            return Err(Error::ArgumentError(format!(
                "shard id {} out of range for N={}",
                shard.get(),
                self.shard_count
            )));
        }
        let global = local
            .get()
            .checked_mul(self.shard_count as u64)
            .and_then(|v| v.checked_add(shard.get() as u64))
            .ok_or_else(|| Error::ArgumentError("global id overflow".to_string()))?;
        Ok(GlobalId::new(global))
    }

    /// `shard_id = global_id mod N`; `local_id = global_id / N`.
    pub fn decode(&self, global: GlobalId) -> (LocalId, ShardId) {
        let n = self.shard_count as u64;
        let shard = ShardId::new((global.get() % n) as u32);
        let local = LocalId::new(global.get() / n);
        (local, shard)
    }

    /// The shard that owns `global`, without computing the local id.
    pub fn shard_of(&self, global: GlobalId) -> ShardId {
        ShardId::new((global.get() % self.shard_count as u64) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_matches_expected_formula() {
        let router = Router::new(3).unwrap();
        let global = router.encode(LocalId::new(2), ShardId::new(1)).unwrap();
        assert_eq!(global.get(), 2 * 3 + 1);
    }

    #[test]
    fn rejects_out_of_range_shard() {
        let router = Router::new(3).unwrap();
        assert!(router.encode(LocalId::new(0), ShardId::new(3)).is_err());
    }

    proptest! {
        #[test]
        fn decode_encode_round_trips(local in 0u64..1_000_000, shard in 0u32..16, n in 1u32..16) {
            let router = Router::new(n).unwrap();
            let shard = shard % n;
            let global = router.encode(LocalId::new(local), ShardId::new(shard)).unwrap();
            let (decoded_local, decoded_shard) = router.decode(global);
            prop_assert_eq!(decoded_local.get(), local);
            prop_assert_eq!(decoded_shard.get(), shard);
            prop_assert_eq!(global.get() % n as u64, shard as u64);
        }
    }
}
