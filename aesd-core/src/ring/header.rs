//! Index bookkeeping for the ring.
//!
//! The header tracks where the next record goes, where the oldest live
//! record sits and whether every slot is occupied. It knows nothing about
//! the records themselves.

/// Write/read positions of a fixed-capacity ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingHeader {
    /// Number of slots. Never zero.
    capacity: usize,

    /// Slot the next record is written to.
    write_idx: usize,

    /// Slot holding the oldest live record.
    read_idx: usize,

    /// Set when `write_idx` has caught up with `read_idx` after a write.
    full: bool,
}

impl RingHeader {
    /// Creates an empty header for `capacity` slots.
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);

        Self {
            capacity,
            write_idx: 0,
            read_idx: 0,
            full: false,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slot the next record is written to.
    pub fn write_idx(&self) -> usize {
        self.write_idx
    }

    /// Slot holding the oldest live record.
    pub fn read_idx(&self) -> usize {
        self.read_idx
    }

    /// Whether every slot holds a live record.
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Number of live slots.
    pub fn live_count(&self) -> usize {
        if self.full {
            self.capacity
        } else if self.write_idx >= self.read_idx {
            self.write_idx - self.read_idx
        } else {
            self.capacity - self.read_idx + self.write_idx
        }
    }

    /// Maps the `n`th live record (0 = oldest) to its slot.
    pub fn physical(&self, n: usize) -> usize {
        (self.read_idx + n) % self.capacity
    }

    /// Records a write at `write_idx`.
    ///
    /// When the ring was already full the oldest record has just been
    /// overwritten, so the read position moves past it. Returns true in
    /// that case.
    pub(crate) fn commit_write(&mut self) -> bool {
        let evicted = self.full;
        if evicted {
            self.read_idx = (self.read_idx + 1) % self.capacity;
        }

        self.write_idx = (self.write_idx + 1) % self.capacity;
        self.full = self.write_idx == self.read_idx;

        evicted
    }

    /// Returns to the empty state.
    pub(crate) fn reset(&mut self) {
        *self = Self::new(self.capacity);
    }
}
