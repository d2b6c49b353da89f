use crate::snapshot::{LocalSnapshot, PendingSnapshot};
use shardlog_concurrency::{ReadStalled, TailDiscipline, WriteStalled};
use shardlog_core::{Error, RecordFlags, Result, StateWord};
use shardlog_mal::{ByteLog, Durability, StateLog};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

/// Construction-time parameters for a [`LogStoreShard`].
#[derive(Debug, Clone)]
pub struct ShardConfig {
    pub name: String,
    pub bucket_len: u64,
    pub dir_len: u64,
    pub durability: Durability,
    /// Bounded spin budget for `get` under read-stalled CC: number of
    /// spin iterations attempted before a short sleep, and overall
    /// attempts before giving up with `NotYetVisible`.
    pub spin_attempts: u32,
}

impl Default for ShardConfig {
    fn default() -> Self {
        ShardConfig {
            name: "shard".to_string(),
            bucket_len: shardlog_core::limits::DEFAULT_BUCKET_LEN,
            dir_len: shardlog_core::limits::DEFAULT_DIRECTORY_LEN,
            durability: Durability::Volatile,
            spin_attempts: 64,
        }
    }
}

/// One log store shard: a byte MAL, a state-word MAL, and a tail
/// discipline `C`, bound together.
///
/// `C` is fixed at construction and never switched: the tail discipline
/// is a monomorphisation chosen once per shard, not a runtime branch.
pub struct LogStoreShard<C: TailDiscipline> {
    bytes: ByteLog,
    states: StateLog,
    cc: C,
    spin_attempts: u32,
}

impl<C: TailDiscipline> LogStoreShard<C> {
    pub fn new(config: ShardConfig, cc: C) -> Self {
        LogStoreShard {
            bytes: ByteLog::new(
                format!("{}_bytes", config.name),
                config.bucket_len,
                config.dir_len,
                config.durability.clone(),
            ),
            states: StateLog::new(
                format!("{}_states", config.name),
                config.dir_len.min(config.bucket_len).max(1024),
                config.dir_len,
                config.durability,
            ),
            cc,
            spin_attempts: config.spin_attempts,
        }
    }

    pub fn open_recover(config: ShardConfig, cc: C) -> Result<Self> {
        Ok(LogStoreShard {
            bytes: ByteLog::open_recover(
                format!("{}_bytes", config.name),
                config.bucket_len,
                config.dir_len,
                config.durability.clone(),
            )?,
            states: StateLog::open_recover(
                format!("{}_states", config.name),
                config.dir_len.min(config.bucket_len).max(1024),
                config.dir_len,
                config.durability,
            )?,
            cc,
            spin_attempts: config.spin_attempts,
        })
    }

    /// Append one record, returning its local id.
    pub fn append(&self, payload: &[u8]) -> Result<u64> {
        if payload.len() > shardlog_core::limits::MAX_RECORD_LEN {
            return Err(Error::ArgumentError(format!(
                "record of {} bytes exceeds max length {}",
                payload.len(),
                shardlog_core::limits::MAX_RECORD_LEN
            )));
        }
        let start_id = self.cc.begin_write(1);
        let byte_off = self.bytes.reserve(payload.len() as u64)?;
        self.bytes.write(byte_off, payload)?;
        self.publish_state(start_id, payload.len() as u16, byte_off)?;
        self.cc.end_write(start_id, 1);
        tracing::trace!(id = start_id, len = payload.len(), "append");
        Ok(start_id)
    }

    /// Append a batch of records as one reservation; returns the ids
    /// assigned by offset from a single `start_id`. All-or-nothing: every
    /// payload is validated before any id or byte range is reserved, so a
    /// rejected batch never leaves a dangling reservation for `end_write`
    /// to publish.
    pub fn multi_append(&self, payloads: &[&[u8]]) -> Result<Vec<u64>> {
        for payload in payloads {
            if payload.len() > shardlog_core::limits::MAX_RECORD_LEN {
                return Err(Error::ArgumentError(format!(
                    "record of {} bytes exceeds max length {}",
                    payload.len(),
                    shardlog_core::limits::MAX_RECORD_LEN
                )));
            }
        }
        let total: u64 = payloads.iter().map(|p| p.len() as u64).sum();
        let count = payloads.len() as u64;
        let start_id = self.cc.begin_write(count);
        let byte_base = self.bytes.reserve_block(total)?;
        let mut cursor = byte_base;
        for (i, payload) in payloads.iter().enumerate() {
            self.bytes.write(cursor, payload)?;
            self.publish_state(start_id + i as u64, payload.len() as u16, cursor)?;
            cursor += payload.len() as u64;
        }
        self.cc.end_write(start_id, count);
        let ids: Vec<u64> = (0..count).map(|i| start_id + i).collect();
        tracing::trace!(start_id, count, "multi_append");
        Ok(ids)
    }

    fn publish_state(&self, id: u64, len: u16, offset: u64) -> Result<()> {
        let word = StateWord::new(len, RecordFlags::WRITTEN, offset);
        let slot = self.reserve_state_slot_if_needed(id)?;
        slot.store(word.into_raw(), Ordering::Release);
        self.states.flush(id)
    }

    /// The state log grows in lockstep with the CC's id allocation, so a
    /// slot for `id` already exists once `begin_write` has handed it out
    /// to this caller; this just materialises the backing bucket.
    fn reserve_state_slot_if_needed(&self, id: u64) -> Result<&std::sync::atomic::AtomicU64> {
        while self.states.size() <= id {
            let want = id + 1 - self.states.size();
            self.states.reserve(want)?;
        }
        self.states.atomic_at(id)
    }

    /// Read `len` bytes of record `id`, rejecting it if `id` falls
    /// outside `min_snapshot`, the record was invalidated, or (under
    /// read-stalled CC) the payload has not been published within the
    /// configured spin budget.
    pub fn get(&self, id: u64, len: u64, min_snapshot: u64) -> Result<Vec<u8>> {
        if id >= min_snapshot {
            return Err(Error::OutOfSnapshot {
                id,
                snapshot_tail: min_snapshot,
            });
        }
        let word = self.read_state_with_spin(id)?;
        if word.flags().is_invalid() {
            return Err(Error::Invalidated(id));
        }
        let take = len.min(word.length() as u64);
        self.bytes.read(word.offset(), take)
    }

    fn read_state_with_spin(&self, id: u64) -> Result<StateWord> {
        let slot = self.states.atomic_at(id)?;
        for attempt in 0..self.spin_attempts {
            let raw = slot.load(Ordering::Acquire);
            let word = StateWord::from_raw(raw);
            if word.flags().is_written() {
                return Ok(word);
            }
            if attempt + 1 == self.spin_attempts {
                break;
            }
            if attempt < 16 {
                std::hint::spin_loop();
            } else {
                thread::sleep(Duration::from_micros(1));
            }
        }
        Err(Error::NotYetVisible(id))
    }

    /// Write a new payload for `id`, atomically retargeting its state
    /// word. The old byte range is never reclaimed.
    pub fn update(&self, id: u64, new_payload: &[u8]) -> Result<()> {
        let slot = self.states.atomic_at(id)?;
        let current = StateWord::from_raw(slot.load(Ordering::Acquire));
        if current.flags().is_invalid() {
            return Err(Error::Invalidated(id));
        }
        let byte_off = self.bytes.reserve(new_payload.len() as u64)?;
        self.bytes.write(byte_off, new_payload)?;
        let word = StateWord::new(new_payload.len() as u16, RecordFlags::WRITTEN, byte_off);
        slot.store(word.into_raw(), Ordering::Release);
        self.states.flush(id)?;
        tracing::trace!(id, len = new_payload.len(), "update");
        Ok(())
    }

    /// Set the `INVALID` flag on `id`'s state word.
    pub fn invalidate(&self, id: u64) -> Result<bool> {
        let slot = self.states.atomic_at(id)?;
        loop {
            let raw = slot.load(Ordering::Acquire);
            let word = StateWord::from_raw(raw);
            let marked = StateWord::new(word.length(), word.flags().with_invalid(), word.offset());
            match slot.compare_exchange_weak(
                raw,
                marked.into_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(true),
                Err(_) => continue,
            }
        }
    }

    /// Count of ids fully visible on this shard.
    pub fn num_records(&self) -> u64 {
        self.cc.read_tail()
    }

    pub fn visible_tail(&self) -> u64 {
        self.cc.read_tail()
    }

    /// Begin a local snapshot: captures the current visible tail.
    pub fn begin_snapshot(&self) -> PendingSnapshot {
        PendingSnapshot::new(self.cc.read_tail())
    }

    /// Finalise a snapshot begun at `pending.tail()`. The `Acquire` fence
    /// on the CC's own counters is already established by `read_tail`;
    /// this additionally fences the state log so every id `< tail` is
    /// visible to any thread that observes the returned value.
    pub fn end_snapshot(&self, pending: PendingSnapshot) -> LocalSnapshot {
        std::sync::atomic::fence(Ordering::SeqCst);
        LocalSnapshot::new(pending.tail())
    }
}

/// A shard whose tail discipline is chosen at runtime rather than at the
/// call site's type — what the server binary actually constructs from
/// `ShardConfig`'s `concurrency-control` option.
pub enum AnyShard {
    ReadStalled(LogStoreShard<ReadStalled>),
    WriteStalled(LogStoreShard<WriteStalled>),
}

impl AnyShard {
    pub fn new_read_stalled(config: ShardConfig) -> Self {
        AnyShard::ReadStalled(LogStoreShard::new(config, ReadStalled::new()))
    }

    pub fn new_write_stalled(config: ShardConfig) -> Self {
        AnyShard::WriteStalled(LogStoreShard::new(config, WriteStalled::new()))
    }

    pub fn open_recover_read_stalled(config: ShardConfig) -> Result<Self> {
        Ok(AnyShard::ReadStalled(LogStoreShard::open_recover(config, ReadStalled::new())?))
    }

    pub fn open_recover_write_stalled(config: ShardConfig) -> Result<Self> {
        Ok(AnyShard::WriteStalled(LogStoreShard::open_recover(config, WriteStalled::new())?))
    }

    pub fn append(&self, payload: &[u8]) -> Result<u64> {
        match self {
            AnyShard::ReadStalled(s) => s.append(payload),
            AnyShard::WriteStalled(s) => s.append(payload),
        }
    }

    pub fn multi_append(&self, payloads: &[&[u8]]) -> Result<Vec<u64>> {
        match self {
            AnyShard::ReadStalled(s) => s.multi_append(payloads),
            AnyShard::WriteStalled(s) => s.multi_append(payloads),
        }
    }

    pub fn get(&self, id: u64, len: u64, min_snapshot: u64) -> Result<Vec<u8>> {
        match self {
            AnyShard::ReadStalled(s) => s.get(id, len, min_snapshot),
            AnyShard::WriteStalled(s) => s.get(id, len, min_snapshot),
        }
    }

    pub fn update(&self, id: u64, new_payload: &[u8]) -> Result<()> {
        match self {
            AnyShard::ReadStalled(s) => s.update(id, new_payload),
            AnyShard::WriteStalled(s) => s.update(id, new_payload),
        }
    }

    pub fn invalidate(&self, id: u64) -> Result<bool> {
        match self {
            AnyShard::ReadStalled(s) => s.invalidate(id),
            AnyShard::WriteStalled(s) => s.invalidate(id),
        }
    }

    pub fn num_records(&self) -> u64 {
        match self {
            AnyShard::ReadStalled(s) => s.num_records(),
            AnyShard::WriteStalled(s) => s.num_records(),
        }
    }

    pub fn begin_snapshot(&self) -> PendingSnapshot {
        match self {
            AnyShard::ReadStalled(s) => s.begin_snapshot(),
            AnyShard::WriteStalled(s) => s.begin_snapshot(),
        }
    }

    pub fn end_snapshot(&self, pending: PendingSnapshot) -> LocalSnapshot {
        match self {
            AnyShard::ReadStalled(s) => s.end_snapshot(pending),
            AnyShard::WriteStalled(s) => s.end_snapshot(pending),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard() -> LogStoreShard<ReadStalled> {
        LogStoreShard::new(ShardConfig::default(), ReadStalled::new())
    }

    #[test]
    fn append_then_get_round_trip() {
        let s = shard();
        let id = s.append(b"hello").unwrap();
        assert_eq!(id, 0);
        assert_eq!(s.get(id, 5, u64::MAX).unwrap(), b"hello");
        assert_eq!(s.num_records(), 1);
    }

    #[test]
    fn multi_append_ids_are_contiguous() {
        let s = shard();
        let payloads: Vec<&[u8]> = vec![b"r0", b"r1", b"r2"];
        let ids = s.multi_append(&payloads).unwrap();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(s.get(1, 2, u64::MAX).unwrap(), b"r1");
    }

    #[test]
    fn invalidate_then_get_fails() {
        let s = shard();
        let id = s.append(b"x").unwrap();
        assert!(s.invalidate(id).unwrap());
        assert!(matches!(s.get(id, 1, u64::MAX), Err(Error::Invalidated(_))));
    }

    #[test]
    fn update_then_get_sees_new_payload() {
        let s = shard();
        let id = s.append(b"aa").unwrap();
        s.update(id, b"bb").unwrap();
        assert_eq!(s.get(id, 2, u64::MAX).unwrap(), b"bb");
    }

    #[test]
    fn get_beyond_snapshot_is_out_of_snapshot() {
        let s = shard();
        let id = s.append(b"x").unwrap();
        let err = s.get(id, 1, id).unwrap_err();
        assert!(matches!(err, Error::OutOfSnapshot { .. }));
    }

    #[test]
    fn begin_end_snapshot_excludes_later_appends() {
        let s = shard();
        for i in 0..5 {
            s.append(format!("r{i}").as_bytes()).unwrap();
        }
        let pending = s.begin_snapshot();
        s.append(b"after").unwrap();
        let done = s.end_snapshot(pending);
        assert_eq!(done.tail(), 5);
        assert!(s.get(4, 2, done.tail()).is_ok());
        assert!(matches!(
            s.get(5, 5, done.tail()),
            Err(Error::OutOfSnapshot { .. })
        ));
    }

    /// Run with an actual concurrent writer: one thread appends ids
    /// 0..100 while the main thread races in and takes a snapshot. Every
    /// id below the captured tail must read back its expected bytes;
    /// every id at or above it must be rejected as out-of-snapshot by a
    /// reader bound to that cut.
    #[test]
    fn snapshot_excludes_concurrent_in_flight_writes() {
        use std::sync::Arc;

        let s = Arc::new(shard());
        let writer = {
            let s = Arc::clone(&s);
            thread::spawn(move || {
                for i in 0..100u64 {
                    let id = s.append(format!("v{i}").as_bytes()).unwrap();
                    assert_eq!(id, i);
                }
            })
        };

        // Give the writer a head start so the snapshot lands mid-stream
        // rather than before the first append.
        thread::sleep(Duration::from_micros(50));
        let pending = s.begin_snapshot();
        let done = s.end_snapshot(pending);
        let tail = done.tail();

        writer.join().unwrap();

        for id in 0..tail {
            assert_eq!(s.get(id, 64, tail).unwrap(), format!("v{id}").as_bytes());
        }
        for id in tail..100 {
            assert!(matches!(
                s.get(id, 64, tail),
                Err(Error::OutOfSnapshot { .. })
            ));
        }
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        /// Appending an arbitrary sequence of payloads, every id comes
        /// back as the exact bytes supplied, in a gap-free initial
        /// segment, under the discipline that guarantees no per-record
        /// flag check is needed.
        proptest! {
            #[test]
            fn no_torn_reads_write_stalled(payloads in proptest::collection::vec(
                proptest::collection::vec(any::<u8>(), 0..32), 0..50
            )) {
                let s = LogStoreShard::new(ShardConfig::default(), WriteStalled::new());
                for (expected_id, payload) in payloads.iter().enumerate() {
                    let id = s.append(payload).unwrap();
                    prop_assert_eq!(id, expected_id as u64);
                }
                let tail = s.visible_tail();
                prop_assert_eq!(tail, payloads.len() as u64);
                for (id, payload) in payloads.iter().enumerate() {
                    let got = s.get(id as u64, payload.len() as u64, tail).unwrap();
                    prop_assert_eq!(&got, payload);
                }
            }
        }
    }
}
