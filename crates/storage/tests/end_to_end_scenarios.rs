//! End-to-end scenarios driven entirely through `AnyShard`'s public API
//! as an external caller would use it (no access to the private
//! `LogStoreShard` internals the unit tests in `shard.rs` reach into).

use shardlog_concurrency::{ReadStalled, WriteStalled};
use shardlog_core::Error;
use shardlog_storage::{AnyShard, LogStoreShard, ShardConfig};

fn read_stalled() -> AnyShard {
    AnyShard::ReadStalled(LogStoreShard::new(ShardConfig::default(), ReadStalled::new()))
}

fn write_stalled() -> AnyShard {
    AnyShard::WriteStalled(LogStoreShard::new(ShardConfig::default(), WriteStalled::new()))
}

#[test]
fn single_shard_append_get_round_trip() {
    for shard in [read_stalled(), write_stalled()] {
        let id = shard.append(b"hello").unwrap();
        assert_eq!(id, 0);
        assert_eq!(shard.get(0, 5, u64::MAX).unwrap(), b"hello");
        assert_eq!(shard.num_records(), 1);
    }
}

#[test]
fn invalidate_then_get() {
    for shard in [read_stalled(), write_stalled()] {
        let id = shard.append(b"x").unwrap();
        assert!(shard.invalidate(id).unwrap());
        assert!(matches!(shard.get(id, 1, u64::MAX), Err(Error::Invalidated(_))));
    }
}

#[test]
fn update_then_get() {
    for shard in [read_stalled(), write_stalled()] {
        let id = shard.append(b"aa").unwrap();
        shard.update(id, b"bb").unwrap();
        assert_eq!(shard.get(id, 2, u64::MAX).unwrap(), b"bb");
    }
}

#[test]
fn begin_end_snapshot_round_trip_through_any_shard() {
    for shard in [read_stalled(), write_stalled()] {
        for i in 0..5u8 {
            shard.append(&[i]).unwrap();
        }
        let pending = shard.begin_snapshot();
        shard.append(&[99]).unwrap();
        let done = shard.end_snapshot(pending);
        assert_eq!(done.tail(), 5);
        assert!(matches!(
            shard.get(5, 1, done.tail()),
            Err(Error::OutOfSnapshot { .. })
        ));
    }
}
