//! Tail-advance disciplines for concurrent appends.
//!
//! A log store shard needs two cooperating cursors: where the next
//! writer should reserve space, and what a reader may safely see. The
//! two disciplines here trade that cost differently:
//!
//! - [`ReadStalled`] keeps a single tail. Reservation is a bare
//!   fetch-add and completion is a no-op; readers instead check the
//!   per-record `WRITTEN` flag ([`shardlog_core::RecordFlags`]) before
//!   trusting a slot, so a reader can race ahead of a writer that hasn't
//!   finished yet and simply spin.
//! - [`WriteStalled`] keeps separate write and read tails. Completion
//!   CAS-loops the read tail forward only once every earlier writer in
//!   program order has published, so readers never need to consult a
//!   per-record flag — the read tail alone is the visibility boundary.

mod read_stalled;
mod write_stalled;

pub use read_stalled::ReadStalled;
pub use write_stalled::WriteStalled;

/// The reservation/publication contract a log store shard's tail
/// implements, independent of which discipline backs it.
pub trait TailDiscipline: Send + Sync {
    /// Reserve `count` contiguous slots, returning the index of the
    /// first one. Always monotonic and non-blocking.
    fn begin_write(&self, count: u64) -> u64;

    /// Mark the `count` slots starting at `start` as written. For
    /// [`ReadStalled`] this is a no-op; for [`WriteStalled`] it may
    /// block until earlier writers in the same tail have called
    /// `end_write` first.
    fn end_write(&self, start: u64, count: u64);

    /// The tail a reader may safely scan up to, exclusive.
    fn read_tail(&self) -> u64;

    /// The tail the next writer will reserve from, exclusive.
    fn write_tail(&self) -> u64;
}
