//! Error types for VenomMQ

use rustix::io::Errno;
use std::io;
use thiserror::Error;

/// Result type for VenomMQ operations
pub type Result<T> = std::result::Result<T, MqError>;

/// Errors that can occur in VenomMQ operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MqError {
    /// Backing storage for the queue could not be allocated
    #[error("Failed to allocate {bytes} bytes of message storage")]
    OutOfMemory { bytes: usize },

    /// Queue limits that cannot hold a single message
    #[error("Invalid queue configuration: {0}")]
    InvalidConfig(&'static str),

    /// Message exceeds the per-message limit
    #[error("Message too large: max {max} bytes, got {got} bytes")]
    MessageTooLarge { max: usize, got: usize },

    /// Queue holds its maximum number of messages
    #[error("Message queue is full")]
    QueueFull,

    /// No message available, try again later
    #[error("Message queue is empty")]
    QueueEmpty,

    /// Control operations are not supported by the device
    #[error("Unsupported control operation {0:#x}")]
    UnsupportedOperation(u32),

    /// Bytes could not be moved across the caller boundary
    #[error("Failed to copy message bytes: {0}")]
    CopyFault(String),

    /// Device is opened exclusively by another caller
    #[error("Device '{0}' is busy")]
    DeviceBusy(String),

    /// Device has been shut down
    #[error("Device has been shut down")]
    Shutdown,
}

impl MqError {
    /// The errno a character device would report for this error.
    pub fn errno(&self) -> Errno {
        match self {
            MqError::OutOfMemory { .. } => Errno::NOMEM,
            MqError::InvalidConfig(_) => Errno::INVAL,
            MqError::MessageTooLarge { .. } => Errno::INVAL,
            MqError::QueueFull => Errno::BUSY,
            MqError::QueueEmpty => Errno::AGAIN,
            MqError::UnsupportedOperation(_) => Errno::INVAL,
            MqError::CopyFault(_) => Errno::FAULT,
            MqError::DeviceBusy(_) => Errno::BUSY,
            MqError::Shutdown => Errno::NODEV,
        }
    }

    /// Whether the caller may simply retry the same operation later.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, MqError::QueueFull | MqError::QueueEmpty)
    }
}

impl From<MqError> for io::Error {
    fn from(err: MqError) -> Self {
        io::Error::from_raw_os_error(err.errno().raw_os_error())
    }
}
