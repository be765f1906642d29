//! Fixed-capacity ring of variable-length byte records.
//!
//! The live records, concatenated oldest-first, form one logical byte
//! stream. Lookups translate an offset into that stream back into the
//! record holding it. Adding to a full ring overwrites the oldest record.
//!
//! There is no internal locking. Callers sharing a ring between threads
//! must wrap it themselves.

use crate::error::{Error, Result};
use crate::ring::{header::RingHeader, slot::EntryPosition, DEFAULT_CAPACITY};

/// A bounded history of records addressable by global byte offset.
#[derive(Debug, Clone)]
pub struct RingIndex<T> {
    /// Slot storage. Slots outside the live range are `None`.
    slots: Box<[Option<T>]>,

    /// Write/read positions.
    header: RingHeader,
}

impl<T: AsRef<[u8]>> RingIndex<T> {
    /// Creates an empty ring with room for `capacity` records.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }

        Ok(Self::build(capacity))
    }

    fn build(capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| None).collect::<Vec<_>>();

        Self {
            slots: slots.into_boxed_slice(),
            header: RingHeader::new(capacity),
        }
    }

    /// Inserts `record` as the newest entry.
    ///
    /// If the ring was full, the oldest record is evicted and handed back.
    pub fn add(&mut self, record: T) -> Option<T> {
        let idx = self.header.write_idx();
        let previous = self.slots[idx].replace(record);

        if self.header.commit_write() {
            previous
        } else {
            debug_assert!(previous.is_none(), "slot outside live range was occupied");
            None
        }
    }

    /// Finds the record containing byte `offset` of the logical stream.
    ///
    /// Returns `None` when fewer than `offset + 1` bytes are held. Zero-length
    /// records never match.
    pub fn find_by_offset(&self, offset: usize) -> Option<EntryPosition<'_, T>> {
        let mut preceding = 0usize;

        for n in 0..self.header.live_count() {
            let slot = self.header.physical(n);
            let Some(entry) = self.slots[slot].as_ref() else {
                continue;
            };

            let len = entry.as_ref().len();
            if offset < preceding + len {
                return Some(EntryPosition {
                    slot,
                    entry,
                    offset: offset - preceding,
                });
            }
            preceding += len;
        }

        None
    }

    /// Copies bytes of the logical stream starting at `offset` into `buf`.
    ///
    /// Reads may span records. Returns the number of bytes copied, which is
    /// zero when `offset` is at or past the end of the stream.
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> usize {
        let mut copied = 0;

        while copied < buf.len() {
            let Some(pos) = self.find_by_offset(offset + copied) else {
                break;
            };

            let src = pos.remaining();
            let n = src.len().min(buf.len() - copied);
            buf[copied..copied + n].copy_from_slice(&src[..n]);
            copied += n;
        }

        copied
    }

    /// Live records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.header.live_count())
            .filter_map(move |n| self.slots[self.header.physical(n)].as_ref())
    }

    /// Total bytes across live records.
    pub fn total_bytes(&self) -> usize {
        self.iter().map(|entry| entry.as_ref().len()).sum()
    }

    /// Live records concatenated oldest-first.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_bytes());
        for entry in self.iter() {
            out.extend_from_slice(entry.as_ref());
        }
        out
    }

    /// Drops back to the empty state, returning the live records oldest-first.
    pub fn clear(&mut self) -> Vec<T> {
        let mut drained = Vec::with_capacity(self.header.live_count());
        for n in 0..self.header.live_count() {
            if let Some(entry) = self.slots[self.header.physical(n)].take() {
                drained.push(entry);
            }
        }

        self.header.reset();
        drained
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.header.capacity()
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.header.live_count()
    }

    /// True when no records are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the next `add` will evict.
    pub fn is_full(&self) -> bool {
        self.header.is_full()
    }

    /// Current write/read positions.
    pub fn header(&self) -> &RingHeader {
        &self.header
    }
}

impl<T: AsRef<[u8]>> Default for RingIndex<T> {
    fn default() -> Self {
        Self::build(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ring_of(capacity: usize, records: &[&str]) -> RingIndex<Vec<u8>> {
        let mut ring = RingIndex::with_capacity(capacity).unwrap();
        for r in records {
            ring.add(r.as_bytes().to_vec());
        }
        ring
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = RingIndex::<Vec<u8>>::with_capacity(0);
        assert!(matches!(result, Err(Error::ZeroCapacity)));
    }

    #[test]
    fn test_default_capacity() {
        let ring = RingIndex::<Vec<u8>>::default();
        assert_eq!(ring.capacity(), DEFAULT_CAPACITY);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_find_by_offset_three_records() {
        // Lengths 3, 5, 2: 10 bytes total.
        let ring = ring_of(10, &["abc", "defgh", "ij"]);

        let first = ring.find_by_offset(0).unwrap();
        assert_eq!(first.entry.as_slice(), b"abc");
        assert_eq!(first.offset, 0);

        let second = ring.find_by_offset(3).unwrap();
        assert_eq!(second.entry.as_slice(), b"defgh");
        assert_eq!(second.offset, 0);

        let pos = ring.find_by_offset(7).unwrap();
        assert_eq!(pos.entry.as_slice(), b"defgh");
        assert_eq!(pos.offset, 4);

        let third = ring.find_by_offset(8).unwrap();
        assert_eq!(third.entry.as_slice(), b"ij");
        assert_eq!(third.offset, 0);

        let last = ring.find_by_offset(9).unwrap();
        assert_eq!(last.entry.as_slice(), b"ij");
        assert_eq!(last.offset, 1);

        assert!(ring.find_by_offset(10).is_none());
        assert!(ring.find_by_offset(1000).is_none());
    }

    #[test]
    fn test_find_by_offset_empty() {
        let ring = RingIndex::<Vec<u8>>::default();
        assert!(ring.find_by_offset(0).is_none());
    }

    #[test]
    fn test_zero_length_records_skipped_but_occupy_slots() {
        let mut ring = ring_of(3, &["", "ab", ""]);
        assert!(ring.is_full());
        assert_eq!(ring.total_bytes(), 2);

        let pos = ring.find_by_offset(0).unwrap();
        assert_eq!(pos.entry.as_slice(), b"ab");
        assert_eq!(pos.slot, 1);
        assert!(ring.find_by_offset(2).is_none());

        // The empty record at slot 0 is the oldest and is evicted first.
        let evicted = ring.add(b"c".to_vec()).unwrap();
        assert!(evicted.is_empty());
        assert_eq!(ring.to_bytes(), b"abc");
    }

    #[test]
    fn test_add_when_full_evicts_exactly_oldest() {
        let mut ring = ring_of(3, &["a", "b", "c"]);
        assert!(ring.is_full());

        let evicted = ring.add(b"d".to_vec());
        assert_eq!(evicted.as_deref(), Some(&b"a"[..]));
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.to_bytes(), b"bcd");

        let evicted = ring.add(b"e".to_vec());
        assert_eq!(evicted.as_deref(), Some(&b"b"[..]));
        assert_eq!(ring.to_bytes(), b"cde");
    }

    #[test]
    fn test_add_when_not_full_evicts_nothing() {
        let mut ring = RingIndex::with_capacity(3).unwrap();
        assert!(ring.add(b"a".to_vec()).is_none());
        assert!(ring.add(b"b".to_vec()).is_none());
        assert!(!ring.is_full());
        assert!(ring.add(b"c".to_vec()).is_none());
        assert!(ring.is_full());
    }

    #[test]
    fn test_find_by_offset_after_wrap() {
        let ring = ring_of(3, &["aa", "bbb", "c", "dddd"]);
        // Live: "bbb", "c", "dddd"
        assert_eq!(ring.header().read_idx(), 1);

        let pos = ring.find_by_offset(3).unwrap();
        assert_eq!(pos.entry.as_slice(), b"c");
        assert_eq!(pos.offset, 0);

        let pos = ring.find_by_offset(6).unwrap();
        assert_eq!(pos.entry.as_slice(), b"dddd");
        assert_eq!(pos.slot, 0);
        assert_eq!(pos.offset, 2);
        assert_eq!(pos.byte(), b'd');

        assert!(ring.find_by_offset(8).is_none());
    }

    #[test]
    fn test_read_at_spans_records() {
        let ring = ring_of(4, &["hello\n", "world\n"]);

        let mut buf = [0u8; 5];
        assert_eq!(ring.read_at(3, &mut buf), 5);
        assert_eq!(&buf, b"lo\nwo");

        let mut buf = [0u8; 64];
        let n = ring.read_at(6, &mut buf);
        assert_eq!(&buf[..n], b"world\n");

        assert_eq!(ring.read_at(12, &mut buf), 0);
    }

    #[test]
    fn test_clear_returns_records_in_order() {
        let mut ring = ring_of(2, &["x", "y", "z"]);
        let drained = ring.clear();

        assert_eq!(drained, vec![b"y".to_vec(), b"z".to_vec()]);
        assert!(ring.is_empty());
        assert!(!ring.is_full());
        assert!(ring.find_by_offset(0).is_none());

        ring.add(b"q".to_vec());
        assert_eq!(ring.to_bytes(), b"q");
    }

    #[test]
    fn test_borrowed_records() {
        let mut ring: RingIndex<&[u8]> = RingIndex::with_capacity(2).unwrap();
        ring.add(&b"one"[..]);
        ring.add(&b"two"[..]);

        let pos = ring.find_by_offset(4).unwrap();
        assert_eq!(*pos.entry, &b"two"[..]);
        assert_eq!(pos.offset, 1);
    }

    proptest! {
        #[test]
        fn prop_stream_is_last_n_records(
            capacity in 1usize..12,
            records in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..8), 0..40),
        ) {
            let mut ring = RingIndex::with_capacity(capacity).unwrap();
            let mut evictions = 0;
            for r in &records {
                if ring.add(r.clone()).is_some() {
                    evictions += 1;
                }
            }

            let keep = records.len().min(capacity);
            let expected: Vec<u8> = records[records.len() - keep..].concat();

            prop_assert_eq!(ring.len(), keep);
            prop_assert_eq!(ring.is_full(), records.len() >= capacity);
            prop_assert_eq!(evictions, records.len().saturating_sub(capacity));
            prop_assert_eq!(ring.to_bytes(), expected.clone());

            // Every offset maps back to the matching byte; one past the end misses.
            for (i, b) in expected.iter().enumerate() {
                let pos = ring.find_by_offset(i).unwrap();
                prop_assert_eq!(pos.byte(), *b);
            }
            prop_assert!(ring.find_by_offset(expected.len()).is_none());
        }
    }
}
