//! Bounded ring index of variable-length records.
//!
//! This module implements a fixed-capacity circular index that keeps the
//! most recent records and lets callers locate a record by a byte offset
//! into the concatenation of everything it currently holds. It performs
//! no I/O and no locking.

mod buffer;
mod header;
mod slot;

pub use buffer::RingIndex;
pub use header::RingHeader;
pub use slot::EntryPosition;

use crate::error::Result;

/// Default number of records a ring keeps.
pub const DEFAULT_CAPACITY: usize = 10;

/// Creates an owned-record ring with the default capacity.
pub fn create_ring_index() -> RingIndex<Vec<u8>> {
    RingIndex::default()
}

/// Creates an owned-record ring holding at most `capacity` records.
pub fn create_ring_index_with_capacity(capacity: usize) -> Result<RingIndex<Vec<u8>>> {
    RingIndex::with_capacity(capacity)
}
