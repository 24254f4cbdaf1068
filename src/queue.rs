//! Bounded FIFO Message Queue
//!
//! Many producers and consumers share one queue. A single mutex guards the
//! message store, which makes every enqueue and dequeue totally ordered and
//! keeps delivery strictly first-in-first-out.
//!
//! # Design
//! - Fixed-size slots allocated once at creation
//! - Enqueue: size check -> lock -> capacity check -> copy in -> unlock
//! - Dequeue: lock -> empty check -> copy out -> unlock
//! - Full and empty fail immediately; callers own the retry policy
//! - Closing happens under the same lock, so no enqueue lands after it

use crate::error::{MqError, Result};
use crate::store::MessageStore;
use parking_lot::Mutex;
use std::fmt;
use tracing::debug;

/// Maximum message size in bytes
pub const MAX_MESSAGE_SIZE: usize = 4096;

/// Maximum number of queued messages
pub const MAX_QUEUE_SIZE: usize = 1000;

/// Queue limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Largest message accepted, in bytes
    pub max_message_size: usize,
    /// Number of messages the queue holds before rejecting writes
    pub max_queue_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_message_size: MAX_MESSAGE_SIZE,
            max_queue_size: MAX_QUEUE_SIZE,
        }
    }
}

impl QueueConfig {
    /// Check that the limits can hold at least one non-empty message.
    pub fn validate(&self) -> Result<()> {
        if self.max_queue_size == 0 {
            return Err(MqError::InvalidConfig("queue capacity must be non-zero"));
        }
        if self.max_message_size == 0 {
            return Err(MqError::InvalidConfig("max message size must be non-zero"));
        }
        Ok(())
    }
}

/// Outcome of a dequeue into a caller buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    /// Bytes written to the caller buffer
    pub copied: usize,
    /// Full length of the dequeued message
    pub len: usize,
}

impl Received {
    /// True when the caller buffer was too short and the tail was discarded.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.copied < self.len
    }
}

/// Thread-safe bounded message queue
pub struct BoundedQueue {
    store: Mutex<MessageStore>,
    config: QueueConfig,
}

impl BoundedQueue {
    /// Create a queue, allocating all message storage up front.
    pub fn new(config: QueueConfig) -> Result<Self> {
        config.validate()?;
        let store = MessageStore::create(config.max_queue_size, config.max_message_size)?;
        Ok(Self {
            store: Mutex::new(store),
            config,
        })
    }

    /// Try to enqueue a message (non-blocking)
    ///
    /// Fails with `MessageTooLarge` or `QueueFull` without changing the queue,
    /// and with `Shutdown` once the queue is closed.
    #[inline]
    pub fn enqueue(&self, msg: &[u8]) -> Result<()> {
        if msg.len() > self.config.max_message_size {
            return Err(MqError::MessageTooLarge {
                max: self.config.max_message_size,
                got: msg.len(),
            });
        }

        let mut store = self.store.lock();
        if store.is_closed() {
            return Err(MqError::Shutdown);
        }
        if store.is_full() {
            return Err(MqError::QueueFull);
        }
        store.put(msg);
        Ok(())
    }

    /// Try to dequeue the oldest message (non-blocking)
    ///
    /// Fails with `QueueEmpty` when nothing is queued.
    pub fn dequeue(&self) -> Result<Vec<u8>> {
        // Allocate before locking so the critical section is a plain copy
        let mut buf = vec![0u8; self.config.max_message_size];
        let received = self.dequeue_into(&mut buf)?;
        buf.truncate(received.len);
        Ok(buf)
    }

    /// Dequeue the oldest message into `buf`
    ///
    /// If the message is longer than `buf`, only the first `buf.len()` bytes
    /// are delivered and the remainder is discarded.
    #[inline]
    pub fn dequeue_into(&self, buf: &mut [u8]) -> Result<Received> {
        let mut store = self.store.lock();
        if store.is_closed() {
            return Err(MqError::Shutdown);
        }
        if store.is_empty() {
            return Err(MqError::QueueEmpty);
        }
        let (copied, len) = store.take(buf);
        Ok(Received { copied, len })
    }

    /// Discard every queued message, returning how many were dropped.
    pub fn discard_all(&self) -> usize {
        self.store.lock().clear()
    }

    /// Close the queue and discard its messages in one locked step.
    ///
    /// Every later enqueue and dequeue fails with `Shutdown`. Returns the
    /// number of messages discarded; closing again discards nothing.
    pub fn close(&self) -> usize {
        self.store.lock().close()
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.store.lock().is_closed()
    }

    /// Tear the queue down, discarding anything still queued.
    pub fn destroy(self) -> usize {
        let discarded = self.store.into_inner().clear();
        debug!(discarded, "message queue destroyed");
        discarded
    }

    /// Number of queued messages
    #[inline]
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.store.lock().is_full()
    }

    /// Maximum number of queued messages
    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.max_queue_size
    }

    #[inline]
    pub fn max_message_size(&self) -> usize {
        self.config.max_message_size
    }

    #[inline]
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }
}

impl fmt::Debug for BoundedQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("max_message_size", &self.max_message_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_world() {
        let queue = BoundedQueue::new(QueueConfig::default()).unwrap();
        queue.enqueue(b"hello").unwrap();
        queue.enqueue(b"world").unwrap();

        assert_eq!(queue.dequeue().unwrap(), b"hello");
        assert_eq!(queue.dequeue().unwrap(), b"world");
        assert_eq!(queue.dequeue(), Err(MqError::QueueEmpty));
    }

    #[test]
    fn test_too_large_leaves_queue_unchanged() {
        let queue = BoundedQueue::new(QueueConfig::default()).unwrap();
        let msg = vec![b'A'; 5000];

        assert_eq!(
            queue.enqueue(&msg),
            Err(MqError::MessageTooLarge { max: 4096, got: 5000 })
        );
        assert_eq!(queue.len(), 0);

        queue.enqueue(&msg[..MAX_MESSAGE_SIZE]).unwrap();
        assert_eq!(queue.dequeue().unwrap().len(), MAX_MESSAGE_SIZE);
    }

    #[test]
    fn test_full_rejects_and_keeps_size() {
        let queue = BoundedQueue::new(QueueConfig::default()).unwrap();
        for _ in 0..MAX_QUEUE_SIZE {
            queue.enqueue(b"x").unwrap();
        }
        assert!(queue.is_full());
        assert_eq!(queue.enqueue(b"x"), Err(MqError::QueueFull));
        assert_eq!(queue.len(), MAX_QUEUE_SIZE);

        // One slot frees up after a dequeue
        queue.dequeue().unwrap();
        queue.enqueue(b"y").unwrap();
        assert_eq!(queue.enqueue(b"z"), Err(MqError::QueueFull));
    }

    #[test]
    fn test_empty_is_idempotent() {
        let queue = BoundedQueue::new(QueueConfig::default()).unwrap();
        for _ in 0..5 {
            assert_eq!(queue.dequeue(), Err(MqError::QueueEmpty));
        }
        assert!(queue.is_empty());

        let mut buf = [0u8; 8];
        assert_eq!(queue.dequeue_into(&mut buf), Err(MqError::QueueEmpty));
    }

    #[test]
    fn test_dequeue_into_truncates() {
        let queue = BoundedQueue::new(QueueConfig::default()).unwrap();
        queue.enqueue(b"hello").unwrap();

        let mut buf = [0u8; 2];
        let received = queue.dequeue_into(&mut buf).unwrap();
        assert_eq!(received, Received { copied: 2, len: 5 });
        assert!(received.is_truncated());
        assert_eq!(&buf, b"he");
        assert_eq!(queue.dequeue(), Err(MqError::QueueEmpty));
    }

    #[test]
    fn test_custom_limits() {
        let config = QueueConfig {
            max_message_size: 4,
            max_queue_size: 2,
        };
        let queue = BoundedQueue::new(config).unwrap();
        assert_eq!(
            queue.enqueue(b"12345"),
            Err(MqError::MessageTooLarge { max: 4, got: 5 })
        );
        queue.enqueue(b"1234").unwrap();
        queue.enqueue(b"").unwrap();
        assert_eq!(queue.enqueue(b"1"), Err(MqError::QueueFull));

        assert_eq!(queue.dequeue().unwrap(), b"1234");
        assert_eq!(queue.dequeue().unwrap(), b"");
    }

    #[test]
    fn test_destroy_discards() {
        let queue = BoundedQueue::new(QueueConfig::default()).unwrap();
        queue.enqueue(b"a").unwrap();
        queue.enqueue(b"b").unwrap();
        queue.enqueue(b"c").unwrap();
        assert_eq!(queue.destroy(), 3);
    }

    #[test]
    fn test_close_rejects_further_use() {
        let queue = BoundedQueue::new(QueueConfig::default()).unwrap();
        queue.enqueue(b"a").unwrap();
        queue.enqueue(b"b").unwrap();

        // Discarding empties the queue but leaves it open
        assert_eq!(queue.discard_all(), 2);
        assert!(!queue.is_closed());
        queue.enqueue(b"a").unwrap();
        queue.enqueue(b"b").unwrap();

        assert_eq!(queue.close(), 2);
        assert!(queue.is_closed());
        assert_eq!(queue.enqueue(b"c"), Err(MqError::Shutdown));
        assert_eq!(queue.dequeue(), Err(MqError::Shutdown));
        assert_eq!(queue.close(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_invalid_config() {
        let config = QueueConfig {
            max_message_size: 0,
            max_queue_size: 10,
        };
        assert!(matches!(
            BoundedQueue::new(config),
            Err(MqError::InvalidConfig(_))
        ));
    }
}
