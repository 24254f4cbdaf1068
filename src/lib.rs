//! VenomMQ - Bounded FIFO message device
//!
//! This library provides a message queue that many producers and consumers
//! share through a file-like device API. Each write deposits one message,
//! each read takes the oldest one.
//!
//! # Architecture
//!
//! - **BoundedQueue**: fixed-capacity ring of message slots behind one mutex
//! - **MessageDevice**: service side, owns the queue and counts open handles
//! - **DeviceHandle**: caller side, read/write/control like a device file
//!
//! # Limits
//!
//! - Messages: at most 4096 bytes
//! - Queue: at most 1000 undelivered messages
//!
//! Full and empty queues fail immediately with `QueueFull` / `QueueEmpty`;
//! nothing ever blocks.

pub mod error;
mod store;
pub mod queue;
pub mod device;
pub mod bindings;

pub use error::{MqError, Result};
pub use queue::{BoundedQueue, QueueConfig, Received, MAX_MESSAGE_SIZE, MAX_QUEUE_SIZE};
pub use device::{DeviceConfig, DeviceHandle, MessageDevice, OpenPolicy};
