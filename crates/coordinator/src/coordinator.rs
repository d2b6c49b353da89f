use crate::history::SnapshotHistory;
use crate::proxy::ShardProxy;
use parking_lot::{Condvar, Mutex};
use shardlog_core::Result;
use shardlog_mal::Durability;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Construction-time parameters for a [`Coordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Microseconds between the start of consecutive snapshot rounds; `0`
    /// means run as fast as possible.
    pub sleep_us: u64,
    pub history_bucket_len: u64,
    pub history_dir_len: u64,
    pub history_durability: Durability,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            sleep_us: 0,
            history_bucket_len: 1 << 16,
            history_dir_len: 1 << 10,
            history_durability: Durability::Volatile,
        }
    }
}

/// Orchestrates the two-phase atomic snapshot across a fixed vector of
/// `N` shard proxies.
pub struct Coordinator {
    shards: Vec<Arc<dyn ShardProxy>>,
    history: SnapshotHistory,
    sleep_us: u64,
    run: AtomicBool,
    snapshot_count: AtomicU64,
    ready: Condvar,
    ready_lock: Mutex<()>,
    snapshotter: Mutex<Option<JoinHandle<()>>>,
    monitor: Mutex<Option<JoinHandle<()>>>,
    monitor_run: AtomicBool,
}

impl Coordinator {
    pub fn new(shards: Vec<Arc<dyn ShardProxy>>, config: CoordinatorConfig) -> Self {
        let shard_count = shards.len();
        Coordinator {
            shards,
            history: SnapshotHistory::new(
                shard_count,
                config.history_bucket_len,
                config.history_dir_len,
                config.history_durability,
            ),
            sleep_us: config.sleep_us,
            run: AtomicBool::new(false),
            snapshot_count: AtomicU64::new(0),
            ready: Condvar::new(),
            ready_lock: Mutex::new(()),
            snapshotter: Mutex::new(None),
            monitor: Mutex::new(None),
            monitor_run: AtomicBool::new(false),
        }
    }

    /// Run one atomic snapshot round to completion: phase 1 against all
    /// shards, append to history, then phase 2 against all shards.
    /// Pipelined — every `send_X` for a phase is issued before any
    /// `recv_X` for that phase.
    pub fn run_round(&self) -> Result<u64> {
        for shard in &self.shards {
            shard.send_begin_snapshot();
        }
        let mut tails = Vec::with_capacity(self.shards.len());
        for shard in &self.shards {
            tails.push(shard.recv_begin_snapshot()?);
        }

        let id = self.history.append(&tails)?;

        for (shard, tail) in self.shards.iter().zip(tails.iter()) {
            shard.send_end_snapshot(*tail);
        }
        for shard in &self.shards {
            if !shard.recv_end_snapshot()? {
                tracing::warn!("shard did not confirm end_snapshot for round {id}");
            }
        }

        self.snapshot_count.fetch_add(1, Ordering::Relaxed);
        let _guard = self.ready_lock.lock();
        self.ready.notify_all();
        tracing::debug!(snapshot_id = id, tails = ?tails, "snapshot round complete");
        Ok(id)
    }

    /// Indexed lookup into the published history. Never blocks once
    /// `id < history length`.
    pub fn get_snapshot(&self, id: u64) -> Result<Option<Vec<u64>>> {
        self.history.get(id)
    }

    /// The most recent completed snapshot, blocking until at least one
    /// exists.
    pub fn force_snapshot(&self) -> Result<Vec<u64>> {
        loop {
            if let Some(tails) = self.history.latest()? {
                return Ok(tails);
            }
            let mut guard = self.ready_lock.lock();
            if self.history.is_empty() {
                self.ready.wait_for(&mut guard, Duration::from_millis(50));
            }
        }
    }

    /// Spawn the background task that runs snapshot rounds at the
    /// configured cadence until [`Self::stop`] is called.
    pub fn start(self: &Arc<Self>) {
        self.run.store(true, Ordering::Release);
        let this = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("shardlog-snapshotter".to_string())
            .spawn(move || {
                while this.run.load(Ordering::Acquire) {
                    if let Err(err) = this.run_round() {
                        tracing::error!(?err, "snapshot round failed");
                    }
                    if this.sleep_us > 0 {
                        thread::sleep(Duration::from_micros(this.sleep_us));
                    }
                }
            })
            .expect("failed to spawn snapshotter thread");
        *self.snapshotter.lock() = Some(handle);
    }

    pub fn stop(&self) {
        self.run.store(false, Ordering::Release);
        if let Some(handle) = self.snapshotter.lock().take() {
            let _ = handle.join();
        }
    }

    /// Spawn the optional monitor task that logs the snapshot rate every
    /// `period`.
    pub fn start_monitor(self: &Arc<Self>, period: Duration) {
        self.monitor_run.store(true, Ordering::Release);
        let this = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("shardlog-monitor".to_string())
            .spawn(move || {
                let mut last = this.snapshot_count.load(Ordering::Relaxed);
                while this.monitor_run.load(Ordering::Acquire) {
                    thread::sleep(period);
                    let now = this.snapshot_count.load(Ordering::Relaxed);
                    let rate = (now - last) as f64 / period.as_secs_f64();
                    tracing::info!(snapshots_per_sec = rate, "snapshot rate");
                    last = now;
                }
            })
            .expect("failed to spawn monitor thread");
        *self.monitor.lock() = Some(handle);
    }

    pub fn stop_monitor(&self) {
        self.monitor_run.store(false, Ordering::Release);
        if let Some(handle) = self.monitor.lock().take() {
            let _ = handle.join();
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.run.store(false, Ordering::Release);
        self.monitor_run.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::LocalShardProxy;
    use shardlog_concurrency::ReadStalled;
    use shardlog_storage::{AnyShard, LogStoreShard, ShardConfig};

    fn make_shard(name: &str) -> Arc<dyn ShardProxy> {
        let config = ShardConfig {
            name: name.to_string(),
            ..ShardConfig::default()
        };
        let shard = AnyShard::ReadStalled(LogStoreShard::new(config, ReadStalled::new()));
        Arc::new(LocalShardProxy::new(Arc::new(shard)))
    }

    #[test]
    fn run_round_publishes_a_snapshot_per_shard() {
        let shards = vec![make_shard("s0"), make_shard("s1"), make_shard("s2")];
        let coordinator = Coordinator::new(shards, CoordinatorConfig::default());
        let id = coordinator.run_round().unwrap();
        assert_eq!(id, 0);
        let tails = coordinator.get_snapshot(0).unwrap().unwrap();
        assert_eq!(tails, vec![0, 0, 0]);
    }

    #[test]
    fn force_snapshot_returns_latest_without_blocking_once_present() {
        let shards = vec![make_shard("s0")];
        let coordinator = Coordinator::new(shards, CoordinatorConfig::default());
        coordinator.run_round().unwrap();
        coordinator.run_round().unwrap();
        let latest = coordinator.force_snapshot().unwrap();
        assert_eq!(latest.len(), 1);
    }
}
