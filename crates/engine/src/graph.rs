//! The graph RPC service: nodes are plain records on the local shard;
//! links are also shard records (so the same append-order "writer id"
//! the snapshot cut compares against applies to them), indexed in
//! memory by `(id1, link_type)` for lookup.
//!
//! This module covers `add_link`/`get_link_list`/etc plus the traversal
//! primitive in `crate::traversal`; graph-walk application logic above
//! that surface lives elsewhere.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use shardlog_core::{Error, Result};
use shardlog_storage::AnyShard;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinkRecord {
    id1: i64,
    id2: i64,
    link_type: i64,
    payload: Vec<u8>,
}

/// One edge in the in-memory adjacency index: the neighbour and the
/// local id of the shard record backing its payload. Filtering on
/// `record_id < snapshot` is what makes `traverse` respect a snapshot
/// cut.
#[derive(Debug, Clone)]
struct LinkEdge {
    id2: i64,
    record_id: u64,
    payload: Vec<u8>,
}

pub struct GraphService {
    shard: Arc<AnyShard>,
    links: DashMap<(i64, i64), Vec<LinkEdge>>,
}

impl GraphService {
    pub fn new(shard: Arc<AnyShard>) -> Self {
        GraphService {
            shard,
            links: DashMap::new(),
        }
    }

    pub fn add_node(&self, payload: &[u8]) -> Result<u64> {
        self.shard.append(payload)
    }

    pub fn get_node(&self, id: u64, len: u64, min_snapshot: u64) -> Result<Vec<u8>> {
        self.shard.get(id, len, min_snapshot)
    }

    pub fn update_node(&self, id: u64, payload: &[u8]) -> Result<()> {
        self.shard.update(id, payload)
    }

    pub fn delete_node(&self, id: u64) -> Result<bool> {
        self.shard.invalidate(id)
    }

    /// Takes `id1`/`id2`/`link_type`/`payload` as separate named fields
    /// rather than positional wire tokens, so no id swap or re-parse
    /// ambiguity can arise here.
    pub fn add_link(&self, id1: i64, id2: i64, link_type: i64, payload: Vec<u8>) -> Result<bool> {
        let record = LinkRecord {
            id1,
            id2,
            link_type,
            payload: payload.clone(),
        };
        let bytes = bincode::serialize(&record)
            .map_err(|e| Error::ArgumentError(format!("link encode failed: {e}")))?;
        let record_id = self.shard.append(&bytes)?;
        self.links
            .entry((id1, link_type))
            .or_default()
            .push(LinkEdge {
                id2,
                record_id,
                payload,
            });
        Ok(true)
    }

    pub fn update_link(&self, id1: i64, id2: i64, link_type: i64, payload: Vec<u8>) -> Result<bool> {
        let mut entries = self
            .links
            .get_mut(&(id1, link_type))
            .ok_or_else(|| Error::ArgumentError("no such link".to_string()))?;
        let edge = entries
            .iter_mut()
            .find(|e| e.id2 == id2)
            .ok_or_else(|| Error::ArgumentError("no such link".to_string()))?;
        let record = LinkRecord {
            id1,
            id2,
            link_type,
            payload: payload.clone(),
        };
        let bytes = bincode::serialize(&record)
            .map_err(|e| Error::ArgumentError(format!("link encode failed: {e}")))?;
        self.shard.update(edge.record_id, &bytes)?;
        edge.payload = payload;
        Ok(true)
    }

    pub fn delete_link(&self, id1: i64, id2: i64, link_type: i64) -> Result<bool> {
        let mut entries = match self.links.get_mut(&(id1, link_type)) {
            Some(e) => e,
            None => return Ok(false),
        };
        if let Some(pos) = entries.iter().position(|e| e.id2 == id2) {
            let record_id = entries[pos].record_id;
            self.shard.invalidate(record_id)?;
            entries.remove(pos);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn get_link(&self, id1: i64, id2: i64, link_type: i64, snapshot: u64) -> Option<Vec<u8>> {
        let entries = self.links.get(&(id1, link_type))?;
        entries
            .iter()
            .find(|e| e.id2 == id2 && e.record_id < snapshot)
            .map(|e| e.payload.clone())
    }

    pub fn multiget_link(
        &self,
        id1: i64,
        link_type: i64,
        id2s: &[i64],
        snapshot: u64,
    ) -> Vec<Option<Vec<u8>>> {
        id2s.iter()
            .map(|id2| self.get_link(id1, *id2, link_type, snapshot))
            .collect()
    }

    /// Newest first.
    pub fn get_link_list(&self, id1: i64, link_type: i64, snapshot: u64) -> Vec<(i64, Vec<u8>)> {
        let entries = match self.links.get(&(id1, link_type)) {
            Some(e) => e,
            None => return Vec::new(),
        };
        entries
            .iter()
            .filter(|e| e.record_id < snapshot)
            .rev()
            .map(|e| (e.id2, e.payload.clone()))
            .collect()
    }

    /// `min_seq`/`max_seq` bound the underlying shard record id each
    /// edge was created with, which is monotonic in append order —
    /// used here as the edge's creation-order key in place of a
    /// separately tracked wall-clock timestamp.
    pub fn get_link_list_range(
        &self,
        id1: i64,
        link_type: i64,
        min_seq: u64,
        max_seq: u64,
        snapshot: u64,
    ) -> Vec<(i64, Vec<u8>)> {
        let entries = match self.links.get(&(id1, link_type)) {
            Some(e) => e,
            None => return Vec::new(),
        };
        entries
            .iter()
            .filter(|e| e.record_id < snapshot && e.record_id >= min_seq && e.record_id <= max_seq)
            .rev()
            .map(|e| (e.id2, e.payload.clone()))
            .collect()
    }

    pub fn count_links(&self, id1: i64, link_type: i64, snapshot: u64) -> u64 {
        match self.links.get(&(id1, link_type)) {
            Some(e) => e.iter().filter(|e| e.record_id < snapshot).count() as u64,
            None => 0,
        }
    }

    /// Local half of traversal: neighbours of `id1` under `link_type`
    /// visible as of `snapshot`, as `(id2, record_id)` pairs so the
    /// caller can apply `visited`/`breadth` without re-deriving the cut.
    pub(crate) fn local_neighbours(&self, id1: i64, link_type: i64, snapshot: u64) -> Vec<i64> {
        self.links
            .get(&(id1, link_type))
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.record_id < snapshot)
                    .map(|e| e.id2)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn shard(&self) -> &Arc<AnyShard> {
        &self.shard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardlog_concurrency::ReadStalled;
    use shardlog_storage::{LogStoreShard, ShardConfig};

    fn service() -> GraphService {
        let shard = Arc::new(AnyShard::ReadStalled(LogStoreShard::new(
            ShardConfig::default(),
            ReadStalled::new(),
        )));
        GraphService::new(shard)
    }

    #[test]
    fn add_link_then_get_link_list_round_trips() {
        let svc = service();
        svc.add_link(1, 2, 0, b"a".to_vec()).unwrap();
        svc.add_link(1, 3, 0, b"b".to_vec()).unwrap();
        let list = svc.get_link_list(1, 0, u64::MAX);
        assert_eq!(list.len(), 2);
        // newest first
        assert_eq!(list[0].0, 3);
    }

    #[test]
    fn cross_links_respect_snapshot_cut() {
        let svc = service();
        svc.add_link(1, 2, 0, vec![]).unwrap();
        svc.add_link(2, 3, 0, vec![]).unwrap();
        svc.add_link(3, 4, 0, vec![]).unwrap();
        let cut = svc.shard.num_records();
        svc.add_link(4, 5, 0, vec![]).unwrap();

        assert_eq!(svc.local_neighbours(1, 0, cut), vec![2]);
        assert_eq!(svc.local_neighbours(4, 0, cut), Vec::<i64>::new());
    }

    #[test]
    fn delete_link_removes_it_from_list() {
        let svc = service();
        svc.add_link(1, 2, 0, vec![]).unwrap();
        assert!(svc.delete_link(1, 2, 0).unwrap());
        assert!(svc.get_link_list(1, 0, u64::MAX).is_empty());
    }
}
