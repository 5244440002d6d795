//! FFI functions over the process-wide message pool

use crate::{
    buffers::{MessagePool, NUM_BUFFERS},
    error::StatusCode,
    frame::{RawFrame, MSG_LEN},
};

use super::types::*;

lazy_static::lazy_static! {
    /// The pool behind the C API. Rust callers should own a `MessagePool`
    /// instead of going through this instance.
    pub static ref GLOBAL_POOL: MessagePool = MessagePool::default();
}

/// Initialize the pool; all buffers become free
#[no_mangle]
pub extern "C" fn knxmsg_init() {
    GLOBAL_POOL.init();
}

#[no_mangle]
pub extern "C" fn knxmsg_deinit() {
    GLOBAL_POOL.deinit();
}

/// Allocate a buffer, writing its number to `buffer`
#[no_mangle]
pub extern "C" fn knxmsg_allocate_buffer(buffer: *mut KnxMsgBufferNumber) -> KnxMsgStatus {
    if buffer.is_null() {
        return StatusCode::NullPtr as KnxMsgStatus;
    }

    let (number, status) = match GLOBAL_POOL.allocate() {
        Ok(handle) => (handle.slot(), KNXMSG_OK),
        Err(e) => (KNXMSG_NULL_BUFFER, status_of_error(&e)),
    };
    unsafe {
        *buffer = number;
    }
    status
}

/// Allocate with the pool's blocking policy; returns the null buffer on failure
#[no_mangle]
pub extern "C" fn knxmsg_allocate_buffer_wrapper() -> KnxMsgBufferNumber {
    GLOBAL_POOL
        .allocate_blocking()
        .map(|handle| handle.slot())
        .unwrap_or(KNXMSG_NULL_BUFFER)
}

#[no_mangle]
pub extern "C" fn knxmsg_release_buffer(buffer: KnxMsgBufferNumber) -> KnxMsgStatus {
    status_of(&GLOBAL_POOL.release(GLOBAL_POOL.handle_at(buffer)))
}

#[no_mangle]
pub extern "C" fn knxmsg_clear_buffer(buffer: KnxMsgBufferNumber) -> KnxMsgStatus {
    status_of(&GLOBAL_POOL.clear_buffer(GLOBAL_POOL.handle_at(buffer)))
}

#[no_mangle]
pub extern "C" fn knxmsg_post(buffer: KnxMsgBufferNumber) -> KnxMsgStatus {
    status_of(&GLOBAL_POOL.post(GLOBAL_POOL.handle_at(buffer)))
}

/// Take the oldest buffer posted for `sap`; the null buffer if none
#[no_mangle]
pub extern "C" fn knxmsg_get(sap: u8) -> KnxMsgBufferNumber {
    GLOBAL_POOL
        .get(sap)
        .map(|handle| handle.slot())
        .unwrap_or(KNXMSG_NULL_BUFFER)
}

#[no_mangle]
pub extern "C" fn knxmsg_set_sap(buffer: KnxMsgBufferNumber, sap: u8) -> KnxMsgStatus {
    status_of(&GLOBAL_POOL.set_sap(GLOBAL_POOL.handle_at(buffer), sap))
}

#[no_mangle]
pub extern "C" fn knxmsg_set_len(buffer: KnxMsgBufferNumber, len: u8) {
    GLOBAL_POOL.set_len(GLOBAL_POOL.handle_at(buffer), len);
}

#[no_mangle]
pub extern "C" fn knxmsg_get_len(buffer: KnxMsgBufferNumber) -> u8 {
    GLOBAL_POOL.len(GLOBAL_POOL.handle_at(buffer)).unwrap_or(0)
}

#[no_mangle]
pub extern "C" fn knxmsg_get_routing_count(buffer: KnxMsgBufferNumber) -> u8 {
    GLOBAL_POOL
        .routing_count(GLOBAL_POOL.handle_at(buffer))
        .unwrap_or(0)
}

#[no_mangle]
pub extern "C" fn knxmsg_set_routing_count(buffer: KnxMsgBufferNumber) {
    GLOBAL_POOL.set_routing_count(GLOBAL_POOL.handle_at(buffer));
}

#[no_mangle]
pub extern "C" fn knxmsg_set_routing_ctrl(buffer: KnxMsgBufferNumber, ctrl: u8) {
    GLOBAL_POOL.set_routing_ctrl(GLOBAL_POOL.handle_at(buffer), ctrl);
}

/// Copy 22 payload bytes from `msg` into the buffer
#[no_mangle]
pub extern "C" fn knxmsg_write_msg(buffer: KnxMsgBufferNumber, msg: *const u8) -> KnxMsgStatus {
    if msg.is_null() {
        return StatusCode::NullPtr as KnxMsgStatus;
    }

    let bytes = unsafe { std::slice::from_raw_parts(msg, MSG_LEN) };
    let handle = GLOBAL_POOL.handle_at(buffer);
    let result = RawFrame::from_slice(bytes)
        .and_then(|raw| GLOBAL_POOL.with_frame_mut(handle, |frame| *frame = raw));
    status_of(&result)
}

/// Copy the buffer's 22 payload bytes into `msg`
#[no_mangle]
pub extern "C" fn knxmsg_read_msg(buffer: KnxMsgBufferNumber, msg: *mut u8) -> KnxMsgStatus {
    if msg.is_null() {
        return StatusCode::NullPtr as KnxMsgStatus;
    }

    match GLOBAL_POOL.raw_frame(GLOBAL_POOL.handle_at(buffer)) {
        Ok(raw) => {
            unsafe {
                std::ptr::copy_nonoverlapping(raw.as_bytes().as_ptr(), msg, MSG_LEN);
            }
            KNXMSG_OK
        }
        Err(e) => status_of_error(&e),
    }
}

#[no_mangle]
pub extern "C" fn knxmsg_debug_get_buffer_counters(counters: *mut KnxMsgDebugBufferCounters) {
    if counters.is_null() {
        return;
    }

    unsafe {
        *counters = GLOBAL_POOL.counters().into();
    }
}

/// Copy all slot records into `buffers`, which must hold `NUM_BUFFERS` entries
#[no_mangle]
pub extern "C" fn knxmsg_debug_get_buffers(buffers: *mut KnxMsgBuffer) {
    if buffers.is_null() {
        return;
    }

    let slots = GLOBAL_POOL.buffers();
    let out = unsafe { std::slice::from_raw_parts_mut(buffers, NUM_BUFFERS) };
    for (dst, slot) in out.iter_mut().zip(slots.iter()) {
        *dst = KnxMsgBuffer::from(slot);
    }
}
