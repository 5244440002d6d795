//! C-compatible records and status values

use crate::{
    buffers::{BufferSlot, CounterSnapshot, NO_NEXT},
    error::{MsgError, Result, StatusCode},
    frame::MSG_LEN,
};

/// Status word returned by the C API
pub type KnxMsgStatus = u16;

/// Buffers cross the C boundary as slot numbers
pub type KnxMsgBufferNumber = u8;

/// The null buffer number
pub const KNXMSG_NULL_BUFFER: KnxMsgBufferNumber = NO_NEXT;

pub const KNXMSG_OK: KnxMsgStatus = StatusCode::Ok as KnxMsgStatus;

/// Debug counter record, `used` before `free`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KnxMsgDebugBufferCounters {
    pub used: u8,
    pub free: u8,
}

impl From<CounterSnapshot> for KnxMsgDebugBufferCounters {
    fn from(counters: CounterSnapshot) -> Self {
        Self {
            used: counters.used,
            free: counters.free,
        }
    }
}

/// Packed 27-byte slot record
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct KnxMsgBuffer {
    pub next: u8,
    pub len: u8,
    pub service: u8,
    pub sap: u8,
    pub status: u8,
    pub msg: [u8; MSG_LEN],
}

impl Default for KnxMsgBuffer {
    fn default() -> Self {
        Self {
            next: 0,
            len: 0,
            service: 0,
            sap: 0,
            status: 0,
            msg: [0; MSG_LEN],
        }
    }
}

impl From<&BufferSlot> for KnxMsgBuffer {
    fn from(slot: &BufferSlot) -> Self {
        Self {
            next: slot.next,
            len: slot.len,
            service: slot.service,
            sap: slot.sap,
            status: slot.status,
            msg: slot.frame.into_bytes(),
        }
    }
}

pub(crate) fn status_of(result: &Result<()>) -> KnxMsgStatus {
    StatusCode::from(result) as KnxMsgStatus
}

pub(crate) fn status_of_error(error: &MsgError) -> KnxMsgStatus {
    error.status() as KnxMsgStatus
}
