//! File-like device API for VenomMQ
//!
//! A [`MessageDevice`] is the service side: it owns the queue for as long as
//! the service runs. Callers [`open`](MessageDevice::open) it to obtain a
//! [`DeviceHandle`] and use read/write on that handle much like a character
//! device file. Every write is one message, every read returns one message.

use crate::error::{MqError, Result};
use crate::queue::{BoundedQueue, QueueConfig};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default device name
pub const DEFAULT_DEVICE_NAME: &str = "chardev";

/// How many callers may hold the device open at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenPolicy {
    /// Any number of concurrent openers
    #[default]
    Shared,
    /// One opener at a time; further opens fail with `DeviceBusy`
    Exclusive,
}

/// Device configuration
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Name used in log output and busy errors
    pub name: String,
    /// Queue limits
    pub queue: QueueConfig,
    /// Concurrent open policy
    pub open_policy: OpenPolicy,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEVICE_NAME.to_string(),
            queue: QueueConfig::default(),
            open_policy: OpenPolicy::Shared,
        }
    }
}

impl DeviceConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.queue.max_message_size = size;
        self
    }

    pub fn with_max_queue_size(mut self, size: usize) -> Self {
        self.queue.max_queue_size = size;
        self
    }

    pub fn with_open_policy(mut self, policy: OpenPolicy) -> Self {
        self.open_policy = policy;
        self
    }
}

/// State shared by the device and every open handle
struct DeviceShared {
    name: String,
    queue: BoundedQueue,
    open_policy: OpenPolicy,
    open_count: AtomicUsize,
    stopped: AtomicBool,
}

impl DeviceShared {
    #[inline]
    fn ensure_running(&self) -> Result<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(MqError::Shutdown);
        }
        Ok(())
    }

    /// Mark the device stopped and drop its messages. Only the first call
    /// does any work.
    fn stop(&self) -> usize {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let discarded = self.queue.close();
        info!(
            device = %self.name,
            discarded,
            open_handles = self.open_count.load(Ordering::Acquire),
            "device shut down"
        );
        discarded
    }
}

/// Service side of a message device
pub struct MessageDevice {
    shared: Arc<DeviceShared>,
}

impl MessageDevice {
    /// Create the queue and make the device available for opening.
    pub fn register(config: DeviceConfig) -> Result<Self> {
        let queue = BoundedQueue::new(config.queue)?;

        info!(
            device = %config.name,
            max_message_size = config.queue.max_message_size,
            max_queue_size = config.queue.max_queue_size,
            policy = ?config.open_policy,
            "device registered"
        );

        Ok(Self {
            shared: Arc::new(DeviceShared {
                name: config.name,
                queue,
                open_policy: config.open_policy,
                open_count: AtomicUsize::new(0),
                stopped: AtomicBool::new(false),
            }),
        })
    }

    /// Open the device, returning a handle for reads and writes.
    pub fn open(&self) -> Result<DeviceHandle> {
        let shared = &self.shared;
        shared.ensure_running()?;

        let count = match shared.open_policy {
            OpenPolicy::Shared => shared.open_count.fetch_add(1, Ordering::AcqRel) + 1,
            OpenPolicy::Exclusive => {
                if shared
                    .open_count
                    .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    debug!(device = %shared.name, "exclusive open refused");
                    return Err(MqError::DeviceBusy(shared.name.clone()));
                }
                1
            }
        };

        debug!(device = %shared.name, open_handles = count, "device opened");
        Ok(DeviceHandle {
            shared: Arc::clone(shared),
        })
    }

    /// Get the name of the device
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Number of handles currently open
    pub fn open_count(&self) -> usize {
        self.shared.open_count.load(Ordering::Acquire)
    }

    /// The queue behind the device
    pub fn queue(&self) -> &BoundedQueue {
        &self.shared.queue
    }

    /// Stop the device, discarding undelivered messages.
    ///
    /// Returns the number of messages discarded. Handles that are still
    /// open fail every further operation with `Shutdown`.
    pub fn shutdown(self) -> usize {
        self.shared.stop()
    }
}

impl Drop for MessageDevice {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

/// One caller's open access to a [`MessageDevice`]
///
/// Closing happens on drop; [`close`](DeviceHandle::close) makes it explicit.
pub struct DeviceHandle {
    shared: Arc<DeviceShared>,
}

impl DeviceHandle {
    /// Read one message into `buf`
    ///
    /// Returns the number of bytes delivered, `min(message length, buf.len())`.
    /// The part of a message that does not fit is discarded. An empty queue
    /// fails with `QueueEmpty`.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.shared.ensure_running()?;
        self.shared.queue.dequeue_into(buf).map(|r| r.copied)
    }

    /// Write `data` as one message, returning `data.len()`.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        self.shared.ensure_running()?;
        self.check_size(data.len())?;
        self.shared.queue.enqueue(data)?;
        Ok(data.len())
    }

    /// Stage exactly `len` bytes from `src`, then write them as one message.
    ///
    /// A source that fails or ends early is a `CopyFault`; nothing is queued.
    pub fn write_from<R: Read>(&self, mut src: R, len: usize) -> Result<usize> {
        self.shared.ensure_running()?;
        self.check_size(len)?;

        let mut staged = vec![0u8; len];
        src.read_exact(&mut staged)
            .map_err(|e| MqError::CopyFault(e.to_string()))?;
        self.write(&staged)
    }

    /// Read one message and copy up to `max_len` bytes of it into `dst`.
    ///
    /// The message is consumed before the copy, so a `CopyFault` from `dst`
    /// loses it.
    pub fn read_to<W: Write>(&self, mut dst: W, max_len: usize) -> Result<usize> {
        self.shared.ensure_running()?;
        let msg = self.shared.queue.dequeue()?;
        let n = msg.len().min(max_len);
        dst.write_all(&msg[..n])
            .map_err(|e| MqError::CopyFault(e.to_string()))?;
        Ok(n)
    }

    /// Device control request. None are supported.
    pub fn control(&self, cmd: u32, arg: usize) -> Result<()> {
        warn!(device = %self.shared.name, cmd, arg, "unsupported control operation");
        Err(MqError::UnsupportedOperation(cmd))
    }

    /// Release this handle. The queue is left untouched.
    pub fn close(self) {}

    #[inline]
    fn check_size(&self, len: usize) -> Result<()> {
        let max = self.shared.queue.max_message_size();
        if len > max {
            return Err(MqError::MessageTooLarge { max, got: len });
        }
        Ok(())
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        let remaining = self.shared.open_count.fetch_sub(1, Ordering::AcqRel) - 1;
        debug!(device = %self.shared.name, open_handles = remaining, "device closed");
    }
}

impl Read for &DeviceHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        DeviceHandle::read(*self, buf).map_err(io::Error::from)
    }
}

impl Read for DeviceHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(&mut &*self, buf)
    }
}

impl Write for &DeviceHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        DeviceHandle::write(*self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Write for DeviceHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
