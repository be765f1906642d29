//! Result type for offset lookups in the ring.

/// A live record located by a global byte offset.
///
/// `offset` is the position of the requested byte inside `entry`.
#[derive(Debug, PartialEq, Eq)]
pub struct EntryPosition<'a, T> {
    /// Slot the record occupies.
    pub slot: usize,

    /// The record containing the requested byte.
    pub entry: &'a T,

    /// Offset of the requested byte within the record.
    pub offset: usize,
}

impl<'a, T: AsRef<[u8]>> EntryPosition<'a, T> {
    /// Bytes of the record from the requested byte to its end.
    pub fn remaining(&self) -> &'a [u8] {
        &self.entry.as_ref()[self.offset..]
    }

    /// The requested byte itself.
    pub fn byte(&self) -> u8 {
        self.entry.as_ref()[self.offset]
    }
}

// Manual impls: deriving would require `T: Clone`/`T: Copy`.
impl<T> Clone for EntryPosition<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EntryPosition<'_, T> {}
