//! The timeseries RPC service: packed `data_pt` records over the log
//! store shard's byte storage, with an explicit zero-copy view over a
//! record's bytes rather than a raw pointer cast.

use shardlog_core::{Error, Result};
use shardlog_storage::AnyShard;
use std::mem::size_of;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One timestamped value. `repr(C)` gives it a fixed, predictable
/// layout so a raw byte buffer can be reinterpreted as a slice of these
/// without copying.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPt {
    pub timestamp: i64,
    pub value: f64,
}

impl DataPt {
    pub const SIZE: usize = size_of::<DataPt>();

    fn to_bytes(self) -> [u8; DataPt::SIZE] {
        let mut buf = [0u8; DataPt::SIZE];
        buf[0..8].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[8..16].copy_from_slice(&self.value.to_le_bytes());
        buf
    }

    fn from_bytes(bytes: &[u8]) -> DataPt {
        let timestamp = i64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let value = f64::from_le_bytes(bytes[8..16].try_into().unwrap());
        DataPt { timestamp, value }
    }
}

/// A zero-copy view of a byte buffer as `data_pt` records. Constructed
/// only when `bytes.len() % sizeof(data_pt) == 0`.
pub struct DataPtView<'a> {
    bytes: &'a [u8],
}

impl<'a> DataPtView<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() % DataPt::SIZE != 0 {
            return Err(Error::ArgumentError(format!(
                "buffer of {} bytes is not a multiple of sizeof(data_pt) ({})",
                bytes.len(),
                DataPt::SIZE
            )));
        }
        Ok(DataPtView { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / DataPt::SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, i: usize) -> DataPt {
        let start = i * DataPt::SIZE;
        DataPt::from_bytes(&self.bytes[start..start + DataPt::SIZE])
    }

    pub fn iter(&self) -> impl Iterator<Item = DataPt> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }
}

pub struct TimeseriesService {
    shard: Arc<AnyShard>,
    point_count: AtomicU64,
}

impl TimeseriesService {
    pub fn new(shard: Arc<AnyShard>) -> Self {
        TimeseriesService {
            shard,
            point_count: AtomicU64::new(0),
        }
    }

    /// Insert a batch of points, each as its own shard record. Append
    /// order need not match timestamp order.
    pub fn insert_values(&self, bytes: &[u8]) -> Result<Vec<u64>> {
        let view = DataPtView::new(bytes)?;
        let mut ids = Vec::with_capacity(view.len());
        for pt in view.iter() {
            ids.push(self.shard.append(&pt.to_bytes())?);
        }
        self.point_count.fetch_add(view.len() as u64, Ordering::Relaxed);
        Ok(ids)
    }

    /// Insert a batch as a single contiguous record — coarser-grained
    /// but one reservation for the whole block.
    pub fn insert_values_block(&self, bytes: &[u8]) -> Result<u64> {
        let view = DataPtView::new(bytes)?;
        let id = self.shard.append(bytes)?;
        self.point_count.fetch_add(view.len() as u64, Ordering::Relaxed);
        Ok(id)
    }

    fn scan_visible(&self, min_snapshot: u64) -> Result<Vec<DataPt>> {
        let mut out = Vec::new();
        let tail = self.shard.num_records().min(min_snapshot);
        for id in 0..tail {
            let bytes = match self.shard.get(id, u64::MAX, min_snapshot) {
                Ok(b) => b,
                Err(Error::Invalidated(_)) | Err(Error::NotYetVisible(_)) => continue,
                Err(e) => return Err(e),
            };
            let view = DataPtView::new(&bytes)?;
            out.extend(view.iter());
        }
        Ok(out)
    }

    pub fn get_range(&self, start_ts: i64, end_ts: i64, min_snapshot: u64) -> Result<Vec<DataPt>> {
        Ok(self
            .scan_visible(min_snapshot)?
            .into_iter()
            .filter(|p| p.timestamp >= start_ts && p.timestamp <= end_ts)
            .collect())
    }

    /// All points at or after `start_ts`, up to the current snapshot —
    /// the "open-ended toward the tail" counterpart to `get_range`.
    pub fn get_range_latest(&self, start_ts: i64, min_snapshot: u64) -> Result<Vec<DataPt>> {
        Ok(self
            .scan_visible(min_snapshot)?
            .into_iter()
            .filter(|p| p.timestamp >= start_ts)
            .collect())
    }

    /// The point whose timestamp is closest to `ts` by absolute
    /// distance.
    pub fn get_nearest_value(&self, ts: i64, min_snapshot: u64) -> Result<Option<DataPt>> {
        Ok(self
            .scan_visible(min_snapshot)?
            .into_iter()
            .min_by_key(|p| (p.timestamp - ts).abs()))
    }

    /// The most recent point at or before `ts` — a causal lookup rather
    /// than nearest-by-distance, for callers that must not see the
    /// future relative to `ts`.
    pub fn get_nearest_value_latest(&self, ts: i64, min_snapshot: u64) -> Result<Option<DataPt>> {
        Ok(self
            .scan_visible(min_snapshot)?
            .into_iter()
            .filter(|p| p.timestamp <= ts)
            .max_by_key(|p| p.timestamp))
    }

    pub fn compute_diff(&self, start_ts: i64, end_ts: i64, min_snapshot: u64) -> Result<Option<f64>> {
        let start = self.get_nearest_value(start_ts, min_snapshot)?;
        let end = self.get_nearest_value(end_ts, min_snapshot)?;
        Ok(match (start, end) {
            (Some(a), Some(b)) => Some(b.value - a.value),
            _ => None,
        })
    }

    pub fn num_entries(&self) -> u64 {
        self.point_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardlog_concurrency::ReadStalled;
    use shardlog_storage::{LogStoreShard, ShardConfig};

    fn service() -> TimeseriesService {
        let shard = Arc::new(AnyShard::ReadStalled(LogStoreShard::new(
            ShardConfig::default(),
            ReadStalled::new(),
        )));
        TimeseriesService::new(shard)
    }

    fn pts(pairs: &[(i64, f64)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (ts, v) in pairs {
            bytes.extend_from_slice(&DataPt { timestamp: *ts, value: *v }.to_bytes());
        }
        bytes
    }

    #[test]
    fn insert_values_then_get_range() {
        let svc = service();
        let buf = pts(&[(1, 1.0), (5, 5.0), (10, 10.0)]);
        svc.insert_values(&buf).unwrap();
        let snapshot = svc.shard.num_records();
        let range = svc.get_range(2, 10, snapshot).unwrap();
        assert_eq!(range.len(), 2);
        assert_eq!(svc.num_entries(), 3);
    }

    #[test]
    fn insert_values_block_counts_all_points_as_one_record() {
        let svc = service();
        let buf = pts(&[(1, 1.0), (2, 2.0)]);
        let id = svc.insert_values_block(&buf).unwrap();
        assert_eq!(id, 0);
        assert_eq!(svc.shard.num_records(), 1);
        assert_eq!(svc.num_entries(), 2);
    }

    #[test]
    fn nearest_value_latest_never_looks_into_the_future() {
        let svc = service();
        let buf = pts(&[(1, 1.0), (10, 10.0), (20, 20.0)]);
        svc.insert_values(&buf).unwrap();
        let snapshot = svc.shard.num_records();
        let nearest = svc.get_nearest_value_latest(15, snapshot).unwrap().unwrap();
        assert_eq!(nearest.timestamp, 10);
    }

    #[test]
    fn compute_diff_is_value_delta_between_nearest_points() {
        let svc = service();
        let buf = pts(&[(0, 1.0), (10, 5.0)]);
        svc.insert_values(&buf).unwrap();
        let snapshot = svc.shard.num_records();
        assert_eq!(svc.compute_diff(0, 10, snapshot).unwrap(), Some(4.0));
    }

    #[test]
    fn malformed_buffer_length_is_rejected() {
        let svc = service();
        assert!(svc.insert_values(&[0u8; 3]).is_err());
    }
}
