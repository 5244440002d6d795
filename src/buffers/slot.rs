//! Buffer slot record, slot state and buffer handles

use serde::{Deserialize, Serialize};

use crate::frame::{RawFrame, MSG_LEN};

/// Sentinel for "no next slot" in the free-list link and for null handles
pub const NO_NEXT: u8 = 0xff;

/// Size of one slot record: next, len, service, sap, status, frame
pub const SLOT_RECORD_LEN: usize = 5 + MSG_LEN;

/// Pool operation that last acted on a slot
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    Init = 0x00,
    AllocateBuffer = 0x01,
    AllocateBufferWrapper = 0x02,
    ReleaseBuffer = 0x03,
    ClearBuffer = 0x04,
    Post = 0x05,
    Get = 0x06,
    SetLen = 0x07,
    GetLen = 0x08,
    SetRoutingCount = 0x09,
    GetRoutingCount = 0x0a,
    GetBufferAddress = 0x0b,
    GetBufferNumber = 0x0c,
    ClearMessageBuffer = 0x0d,
    SetRoutingCtrl = 0x0e,
}

impl Service {
    pub fn from_u8(value: u8) -> Option<Self> {
        use Service::*;
        let service = match value {
            0x00 => Init,
            0x01 => AllocateBuffer,
            0x02 => AllocateBufferWrapper,
            0x03 => ReleaseBuffer,
            0x04 => ClearBuffer,
            0x05 => Post,
            0x06 => Get,
            0x07 => SetLen,
            0x08 => GetLen,
            0x09 => SetRoutingCount,
            0x0a => GetRoutingCount,
            0x0b => GetBufferAddress,
            0x0c => GetBufferNumber,
            0x0d => ClearMessageBuffer,
            0x0e => SetRoutingCtrl,
            _ => return None,
        };
        Some(service)
    }
}

/// Ownership state of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlotState {
    /// Linked into the free list
    #[default]
    Free,
    /// Owned by exactly one caller
    Allocated,
    /// Owned by the routing layer, waiting for `get`
    Posted,
}

/// One pool entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BufferSlot {
    /// Index of the next free slot, `NO_NEXT` when last or not in the list
    pub next: u8,
    /// Logical payload length
    pub len: u8,
    /// Last pool operation, see [`Service`]
    pub service: u8,
    /// Service access point the buffer is addressed to
    pub sap: u8,
    /// Status code of the last managed operation
    pub status: u8,
    pub frame: RawFrame,
    /// Not part of the 27-byte record
    pub state: SlotState,
}

impl BufferSlot {
    pub(crate) fn free(next: u8) -> Self {
        Self {
            next,
            ..Default::default()
        }
    }

    pub fn is_free(&self) -> bool {
        self.state == SlotState::Free
    }

    /// Decoded `service` byte
    pub fn last_service(&self) -> Option<Service> {
        Service::from_u8(self.service)
    }

    /// Zero payload and metadata, keeping the link and the state
    pub(crate) fn clear(&mut self) {
        self.len = 0;
        self.service = 0;
        self.sap = 0;
        self.status = 0;
        self.frame.clear();
    }

    /// Packed 27-byte record
    pub fn to_bytes(&self) -> [u8; SLOT_RECORD_LEN] {
        let mut out = [0u8; SLOT_RECORD_LEN];
        out[0] = self.next;
        out[1] = self.len;
        out[2] = self.service;
        out[3] = self.sap;
        out[4] = self.status;
        out[5..].copy_from_slice(self.frame.as_bytes());
        out
    }

    /// Rebuild a slot from its packed record. The state is not recorded and
    /// comes back as `Free`.
    pub fn from_bytes(bytes: &[u8; SLOT_RECORD_LEN]) -> Self {
        let mut frame = [0u8; MSG_LEN];
        frame.copy_from_slice(&bytes[5..]);
        Self {
            next: bytes[0],
            len: bytes[1],
            service: bytes[2],
            sap: bytes[3],
            status: bytes[4],
            frame: RawFrame::from_bytes(frame),
            state: SlotState::Free,
        }
    }
}

/// Reference to a pool slot handed out by allocate/get
///
/// Handles are plain copies; ownership discipline is enforced by the pool
/// through the slot state, so a stale or duplicated handle is reported as an
/// error rather than corrupting the pool. A handle also records the pool
/// generation it was issued in and stops being valid after `init`/`deinit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferHandle {
    slot: u8,
    generation: u32,
}

impl BufferHandle {
    /// The null handle
    pub const NULL: BufferHandle = BufferHandle {
        slot: NO_NEXT,
        generation: 0,
    };

    pub(crate) fn new(slot: u8, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub fn null() -> Self {
        Self::NULL
    }

    pub fn is_null(&self) -> bool {
        self.slot == NO_NEXT
    }

    /// Slot index this handle refers to
    pub fn slot(&self) -> u8 {
        self.slot
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }
}

impl Default for BufferHandle {
    fn default() -> Self {
        Self::NULL
    }
}
