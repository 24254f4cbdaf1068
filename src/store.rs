//! Fixed-capacity circular message storage
//!
//! Every slot is `slot_size` bytes wide and all slots live in a single
//! allocation made up front, so storing a message never allocates.
//!
//! # Layout
//! - `front`: oldest occupied slot
//! - `end`: next slot to fill
//! - `size`: occupied slots, always a contiguous circular run from `front`
//!
//! The store has no locking of its own. `BoundedQueue` owns it behind a
//! mutex and checks every precondition before calling in. The `closed` flag
//! lives here so that it changes under the same lock as the cursors.

use crate::error::{MqError, Result};

pub(crate) struct MessageStore {
    /// `capacity * slot_size` bytes of message payload
    data: Box<[u8]>,
    /// Length of the message held in each slot
    lens: Box<[usize]>,
    slot_size: usize,
    front: usize,
    end: usize,
    size: usize,
    /// Set once by `close`; never cleared
    closed: bool,
}

/// Allocate a boxed slice without aborting on allocation failure.
fn try_alloc<T: Clone>(len: usize, value: T) -> Option<Box<[T]>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).ok()?;
    buf.resize(len, value);
    Some(buf.into_boxed_slice())
}

impl MessageStore {
    /// Allocate storage for `capacity` messages of up to `slot_size` bytes.
    pub(crate) fn create(capacity: usize, slot_size: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MqError::InvalidConfig("queue capacity must be non-zero"));
        }
        if slot_size == 0 {
            return Err(MqError::InvalidConfig("max message size must be non-zero"));
        }

        let bytes = capacity
            .checked_mul(slot_size)
            .ok_or(MqError::OutOfMemory { bytes: usize::MAX })?;
        let data = try_alloc(bytes, 0u8).ok_or(MqError::OutOfMemory { bytes })?;
        let lens = try_alloc(capacity, 0usize).ok_or(MqError::OutOfMemory {
            bytes: capacity.saturating_mul(std::mem::size_of::<usize>()),
        })?;

        Ok(Self {
            data,
            lens,
            slot_size,
            front: 0,
            end: 0,
            size: 0,
            closed: false,
        })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.lens.len()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.size == self.capacity()
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    #[inline]
    fn slot_range(&self, slot: usize, len: usize) -> std::ops::Range<usize> {
        let start = slot * self.slot_size;
        start..start + len
    }

    /// Copy `msg` into the slot at `end`.
    ///
    /// The caller guarantees the store is not full and `msg` fits a slot.
    /// Slice indexing is bounds-checked, so a violated precondition panics
    /// instead of writing past the slot.
    pub(crate) fn put(&mut self, msg: &[u8]) {
        debug_assert!(!self.is_full());
        debug_assert!(msg.len() <= self.slot_size);

        let range = self.slot_range(self.end, msg.len());
        self.data[range].copy_from_slice(msg);
        self.lens[self.end] = msg.len();

        self.end = (self.end + 1) % self.capacity();
        self.size += 1;
    }

    /// Copy the message at `front` into `out` and release its slot.
    ///
    /// Returns `(copied, len)`: the bytes written to `out` and the full
    /// message length. Bytes that do not fit in `out` are dropped with
    /// the slot. The caller guarantees the store is not empty.
    pub(crate) fn take(&mut self, out: &mut [u8]) -> (usize, usize) {
        debug_assert!(!self.is_empty());

        let len = self.lens[self.front];
        let copied = len.min(out.len());
        let range = self.slot_range(self.front, copied);
        out[..copied].copy_from_slice(&self.data[range]);

        self.lens[self.front] = 0;
        self.front = (self.front + 1) % self.capacity();
        self.size -= 1;

        (copied, len)
    }

    /// Drop every stored message, returning how many were discarded.
    pub(crate) fn clear(&mut self) -> usize {
        let discarded = self.size;
        self.lens.fill(0);
        self.front = 0;
        self.end = 0;
        self.size = 0;
        discarded
    }

    /// Mark the store closed and drop every stored message.
    pub(crate) fn close(&mut self) -> usize {
        self.closed = true;
        self.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take_vec(store: &mut MessageStore) -> Vec<u8> {
        let mut buf = vec![0u8; store.slot_size];
        let (copied, len) = store.take(&mut buf);
        assert_eq!(copied, len);
        buf.truncate(len);
        buf
    }

    #[test]
    fn test_put_take_order() {
        let mut store = MessageStore::create(4, 16).unwrap();
        store.put(b"one");
        store.put(b"two");
        store.put(b"three");
        assert_eq!(store.len(), 3);

        assert_eq!(take_vec(&mut store), b"one");
        assert_eq!(take_vec(&mut store), b"two");
        assert_eq!(take_vec(&mut store), b"three");
        assert!(store.is_empty());
    }

    #[test]
    fn test_wraparound() {
        let mut store = MessageStore::create(3, 8).unwrap();

        // Cycle the cursors around the ring several times
        for round in 0u8..10 {
            store.put(&[round, 1]);
            store.put(&[round, 2]);
            assert_eq!(take_vec(&mut store), [round, 1]);
            store.put(&[round, 3]);
            assert_eq!(take_vec(&mut store), [round, 2]);
            assert_eq!(take_vec(&mut store), [round, 3]);
            assert!(store.is_empty());
        }
    }

    #[test]
    fn test_full_slot_and_empty_message() {
        let mut store = MessageStore::create(2, 8).unwrap();
        store.put(&[0xAB; 8]);
        store.put(&[]);
        assert!(store.is_full());

        assert_eq!(take_vec(&mut store), [0xAB; 8]);
        assert_eq!(take_vec(&mut store), Vec::<u8>::new());
    }

    #[test]
    fn test_take_truncates() {
        let mut store = MessageStore::create(2, 16).unwrap();
        store.put(b"hello");
        store.put(b"world");

        let mut buf = [0u8; 2];
        assert_eq!(store.take(&mut buf), (2, 5));
        assert_eq!(&buf, b"he");

        // The remainder went with the slot
        assert_eq!(take_vec(&mut store), b"world");
    }

    #[test]
    fn test_clear() {
        let mut store = MessageStore::create(4, 4).unwrap();
        store.put(b"a");
        store.put(b"b");
        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());

        store.put(b"c");
        assert_eq!(take_vec(&mut store), b"c");
    }

    #[test]
    fn test_close() {
        let mut store = MessageStore::create(4, 4).unwrap();
        store.put(b"a");
        assert!(!store.is_closed());
        assert_eq!(store.close(), 1);
        assert!(store.is_closed());
        assert!(store.is_empty());
    }

    #[test]
    fn test_create_rejects_bad_limits() {
        assert!(matches!(
            MessageStore::create(0, 16),
            Err(MqError::InvalidConfig(_))
        ));
        assert!(matches!(
            MessageStore::create(16, 0),
            Err(MqError::InvalidConfig(_))
        ));
        assert!(matches!(
            MessageStore::create(usize::MAX, 2),
            Err(MqError::OutOfMemory { .. })
        ));
    }
}
