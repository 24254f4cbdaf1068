//! C Bindings for VenomMQ
//!
//! Exposes the device through a raw C API shaped like a character device
//! driver: read/write return a byte count or a negative errno.

use crate::device::{DeviceConfig, DeviceHandle, MessageDevice};
use crate::error::MqError;
use crate::queue::QueueConfig;
use rustix::io::Errno;
use std::os::raw::{c_long, c_uint, c_ulong};
use std::ptr;
use std::slice;

// Opaque handles
pub struct VenomMqDevice(MessageDevice);
pub struct VenomMqFile(DeviceHandle);

#[inline]
fn errno_ret(errno: Errno) -> isize {
    -(errno.raw_os_error() as isize)
}

#[inline]
fn error_ret(err: MqError) -> isize {
    errno_ret(err.errno())
}

/// Largest buffer length a slice can describe
const MAX_BUF_LEN: usize = isize::MAX as usize;

/// Create a new message device
///
/// Returns NULL if the limits are invalid or storage cannot be allocated.
#[no_mangle]
pub extern "C" fn venom_mq_create(
    max_message_size: usize,
    max_queue_size: usize,
) -> *mut VenomMqDevice {
    let config = DeviceConfig::default().with_queue(QueueConfig {
        max_message_size,
        max_queue_size,
    });

    match MessageDevice::register(config) {
        Ok(device) => Box::into_raw(Box::new(VenomMqDevice(device))),
        Err(_) => ptr::null_mut(),
    }
}

/// Destroy a device, discarding any undelivered messages
///
/// # Safety
/// `handle` must be NULL or a pointer returned by `venom_mq_create` that has
/// not been destroyed yet.
#[no_mangle]
pub unsafe extern "C" fn venom_mq_destroy(handle: *mut VenomMqDevice) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Open the device
///
/// Returns NULL if the device is NULL or has been shut down.
///
/// # Safety
/// `handle` must be NULL or a live device pointer.
#[no_mangle]
pub unsafe extern "C" fn venom_mq_open(handle: *const VenomMqDevice) -> *mut VenomMqFile {
    if handle.is_null() {
        return ptr::null_mut();
    }

    let device = &(*handle).0;
    match device.open() {
        Ok(file) => Box::into_raw(Box::new(VenomMqFile(file))),
        Err(_) => ptr::null_mut(),
    }
}

/// Close a file handle
///
/// # Safety
/// `file` must be NULL or a pointer returned by `venom_mq_open` that has not
/// been released yet.
#[no_mangle]
pub unsafe extern "C" fn venom_mq_release(file: *mut VenomMqFile) {
    if !file.is_null() {
        drop(Box::from_raw(file));
    }
}

/// Read one message into `buf`
///
/// Returns the number of bytes copied, `-EAGAIN` if the queue is empty,
/// `-EFAULT` if `buf` is NULL with a non-zero length, `-EINVAL` if `len`
/// exceeds `isize::MAX`.
///
/// # Safety
/// `file` must be a live file pointer; `buf` must be valid for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn venom_mq_read(file: *const VenomMqFile, buf: *mut u8, len: usize) -> isize {
    if file.is_null() {
        return errno_ret(Errno::BADF);
    }
    if len > MAX_BUF_LEN {
        return errno_ret(Errno::INVAL);
    }
    if buf.is_null() && len > 0 {
        return error_ret(MqError::CopyFault("NULL read buffer".into()));
    }

    let file = &(*file).0;
    let out: &mut [u8] = if len == 0 {
        &mut []
    } else {
        slice::from_raw_parts_mut(buf, len)
    };

    match file.read(out) {
        Ok(n) => n as isize,
        Err(e) => error_ret(e),
    }
}

/// Write `len` bytes from `buf` as one message
///
/// Returns `len`, `-EINVAL` if the message is too large or `len` exceeds
/// `isize::MAX`, `-EBUSY` if the queue is full, `-EFAULT` if `buf` is NULL
/// with a non-zero length.
///
/// # Safety
/// `file` must be a live file pointer; `buf` must be valid for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn venom_mq_write(file: *const VenomMqFile, buf: *const u8, len: usize) -> isize {
    if file.is_null() {
        return errno_ret(Errno::BADF);
    }
    if len > MAX_BUF_LEN {
        return errno_ret(Errno::INVAL);
    }
    if buf.is_null() && len > 0 {
        return error_ret(MqError::CopyFault("NULL write buffer".into()));
    }

    let file = &(*file).0;
    let data: &[u8] = if len == 0 {
        &[]
    } else {
        slice::from_raw_parts(buf, len)
    };

    match file.write(data) {
        Ok(n) => n as isize,
        Err(e) => error_ret(e),
    }
}

/// Device control. Always fails with `-EINVAL`.
///
/// # Safety
/// `file` must be NULL or a live file pointer.
#[no_mangle]
pub unsafe extern "C" fn venom_mq_ioctl(
    file: *const VenomMqFile,
    ioctl_num: c_uint,
    ioctl_param: c_ulong,
) -> c_long {
    if file.is_null() {
        return errno_ret(Errno::BADF) as c_long;
    }

    let file = &(*file).0;
    match file.control(ioctl_num, ioctl_param as usize) {
        Ok(()) => 0,
        Err(e) => error_ret(e) as c_long,
    }
}
