use crate::TailDiscipline;
use std::sync::atomic::{AtomicU64, Ordering};

/// Single-tail discipline: `begin_write` is a bare fetch-add, `end_write`
/// is a no-op. Writers never wait on each other; a reader that wants to
/// know whether a given slot is actually populated must check that
/// record's own `WRITTEN` flag rather than trust `read_tail` alone.
#[derive(Default)]
pub struct ReadStalled {
    tail: AtomicU64,
}

impl ReadStalled {
    pub fn new() -> Self {
        ReadStalled {
            tail: AtomicU64::new(0),
        }
    }
}

impl TailDiscipline for ReadStalled {
    fn begin_write(&self, count: u64) -> u64 {
        self.tail.fetch_add(count, Ordering::AcqRel)
    }

    fn end_write(&self, _start: u64, _count: u64) {}

    fn read_tail(&self) -> u64 {
        self.tail.load(Ordering::Acquire)
    }

    fn write_tail(&self) -> u64 {
        self.tail.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_write_allocates_disjoint_ranges() {
        let tail = ReadStalled::new();
        let a = tail.begin_write(3);
        let b = tail.begin_write(2);
        assert_eq!(a, 0);
        assert_eq!(b, 3);
        assert_eq!(tail.write_tail(), 5);
    }

    #[test]
    fn end_write_does_not_move_read_tail_further() {
        let tail = ReadStalled::new();
        let start = tail.begin_write(4);
        let before = tail.read_tail();
        tail.end_write(start, 4);
        assert_eq!(tail.read_tail(), before);
    }

    #[test]
    fn read_tail_tracks_reservations_not_completions() {
        let tail = ReadStalled::new();
        tail.begin_write(2);
        // read_tail already reports the reservation even before any
        // end_write call, since this discipline never stalls readers on
        // the tail itself.
        assert_eq!(tail.read_tail(), 2);
    }
}
