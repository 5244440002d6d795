//! Frame codec for the 22-byte telegram payload
//!
//! Every buffer slot carries a fixed 22-byte payload that can be read as one
//! of three layouts. The raw bytes are the canonical storage; the typed
//! layouts are produced and consumed through explicit encode/decode calls so
//! diagnostics can always read the bytes no matter which layout the owner
//! had in mind.
//!
//! ```text
//! offset   0     1..3    3..5    5     6     7     8 ...                 22
//!        ┌─────┬───────┬───────┬─────┬─────┬─────┬──────────────────────┐
//! std    │ctrl │source │ dest  │npci │tpci │apci │ data[14]             │
//! prop   │ctrl │source │ dest  │npci │tpci │apci │obj prop n idx data[10]│
//! poll   │ctrl │source │ poll  │nslot│ slots[14]               │ --  -- │
//!        └─────┴───────┴───────┴─────┴─────────────────────────┴────────┘
//! ```

pub mod polling;
pub mod property;
pub mod standard;

pub use polling::PollingFrame;
pub use property::PropertyFrame;
pub use standard::StandardFrame;

use serde::{Deserialize, Serialize};

/// Size of the frame payload in bytes
pub const MSG_LEN: usize = 22;

/// Application data capacity of a standard frame
pub const MAX_APDU_LEN: usize = 14;

/// Property data capacity of a property frame
pub const MAX_PROP_DATA_LEN: usize = 10;

/// Slot data capacity of a polling frame
pub const MAX_POLL_SLOTS: usize = 14;

pub(crate) const CTRL_OFFSET: usize = 0;
pub(crate) const SOURCE_OFFSET: usize = 1;
pub(crate) const DEST_OFFSET: usize = 3;
pub(crate) const NPCI_OFFSET: usize = 5;
pub(crate) const TPCI_OFFSET: usize = 6;
pub(crate) const APCI_OFFSET: usize = 7;

/// Routing counter field inside the npci byte
pub const NPCI_ROUTING_MASK: u8 = 0x70;
pub const NPCI_ROUTING_SHIFT: u8 = 4;
/// Length nibble inside the npci byte
pub const NPCI_LENGTH_MASK: u8 = 0x0f;

/// Repeat flag in the ctrl byte (cleared when the telegram is a repetition)
pub const CTRL_REPEAT_FLAG: u8 = 0x20;
pub const CTRL_PRIORITY_MASK: u8 = 0x0c;
pub const CTRL_PRIORITY_SHIFT: u8 = 2;

/// Telegram priority carried in ctrl bits 2..3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    System = 0,
    Normal = 1,
    Urgent = 2,
    Low = 3,
}

impl Priority {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Priority::System,
            1 => Priority::Normal,
            2 => Priority::Urgent,
            _ => Priority::Low,
        }
    }
}

/// Which layout the payload should be interpreted as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameKind {
    Standard,
    Property,
    Polling,
}

/// Explicit encode/decode contract for a payload layout
pub trait FrameLayout: Sized {
    /// Layout identifier
    const KIND: FrameKind;

    /// Write this layout's fields into the raw payload.
    ///
    /// Bytes outside the layout's fields are left untouched.
    fn encode(&self, raw: &mut RawFrame);

    /// Read this layout's fields out of the raw payload
    fn decode(raw: &RawFrame) -> Self;
}

/// Canonical 22-byte frame storage
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct RawFrame([u8; MSG_LEN]);

impl RawFrame {
    /// Size of the payload in bytes
    pub const SIZE: usize = MSG_LEN;

    /// Zeroed payload
    pub const fn zeroed() -> Self {
        Self([0; MSG_LEN])
    }

    pub const fn from_bytes(bytes: [u8; MSG_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy a payload out of a slice, failing unless it is exactly 22 bytes
    pub fn from_slice(bytes: &[u8]) -> crate::error::Result<Self> {
        let array: [u8; MSG_LEN] = bytes.try_into().map_err(|_| {
            crate::error::MsgError::invalid_parameter(
                "bytes",
                format!("frame payload must be {} bytes, got {}", MSG_LEN, bytes.len()),
            )
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; MSG_LEN] {
        &self.0
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8; MSG_LEN] {
        &mut self.0
    }

    pub fn into_bytes(self) -> [u8; MSG_LEN] {
        self.0
    }

    /// Zero every byte of the payload
    pub fn clear(&mut self) {
        self.0 = [0; MSG_LEN];
    }

    pub fn ctrl(&self) -> u8 {
        self.0[CTRL_OFFSET]
    }

    pub fn set_ctrl(&mut self, ctrl: u8) {
        self.0[CTRL_OFFSET] = ctrl;
    }

    /// Source address, high byte first
    pub fn source(&self) -> u16 {
        self.read_u16(SOURCE_OFFSET)
    }

    pub fn set_source(&mut self, address: u16) {
        self.write_u16(SOURCE_OFFSET, address);
    }

    /// Destination address (poll address for polling frames)
    pub fn dest(&self) -> u16 {
        self.read_u16(DEST_OFFSET)
    }

    pub fn set_dest(&mut self, address: u16) {
        self.write_u16(DEST_OFFSET, address);
    }

    pub fn npci(&self) -> u8 {
        self.0[NPCI_OFFSET]
    }

    pub fn set_npci(&mut self, npci: u8) {
        self.0[NPCI_OFFSET] = npci;
    }

    pub fn tpci(&self) -> u8 {
        self.0[TPCI_OFFSET]
    }

    pub fn apci(&self) -> u8 {
        self.0[APCI_OFFSET]
    }

    /// Routing (hop) counter, npci bits 4..6
    pub fn routing_count(&self) -> u8 {
        (self.npci() & NPCI_ROUTING_MASK) >> NPCI_ROUTING_SHIFT
    }

    /// Overwrite the routing counter, keeping the other npci bits
    pub fn set_routing_count(&mut self, count: u8) {
        let npci = self.npci() & !NPCI_ROUTING_MASK;
        self.set_npci(npci | ((count << NPCI_ROUTING_SHIFT) & NPCI_ROUTING_MASK));
    }

    /// Length nibble of the npci byte
    pub fn npdu_length(&self) -> u8 {
        self.npci() & NPCI_LENGTH_MASK
    }

    pub fn priority(&self) -> Priority {
        Priority::from_bits((self.ctrl() & CTRL_PRIORITY_MASK) >> CTRL_PRIORITY_SHIFT)
    }

    /// A telegram is a repetition when the repeat flag is cleared
    pub fn is_repeated(&self) -> bool {
        self.ctrl() & CTRL_REPEAT_FLAG == 0
    }

    /// Decode the payload as the given layout
    pub fn decode(&self, kind: FrameKind) -> Frame {
        match kind {
            FrameKind::Standard => Frame::Standard(StandardFrame::decode(self)),
            FrameKind::Property => Frame::Property(PropertyFrame::decode(self)),
            FrameKind::Polling => Frame::Polling(PollingFrame::decode(self)),
        }
    }

    /// Encode a typed frame over this payload
    pub fn encode(&mut self, frame: &Frame) {
        frame.encode(self);
    }

    fn read_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.0[offset], self.0[offset + 1]])
    }

    fn write_u16(&mut self, offset: usize, value: u16) {
        self.0[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }
}

impl From<[u8; MSG_LEN]> for RawFrame {
    fn from(bytes: [u8; MSG_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for RawFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for RawFrame {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// A payload interpreted as one of the three layouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    Standard(StandardFrame),
    Property(PropertyFrame),
    Polling(PollingFrame),
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Standard(_) => FrameKind::Standard,
            Frame::Property(_) => FrameKind::Property,
            Frame::Polling(_) => FrameKind::Polling,
        }
    }

    pub fn encode(&self, raw: &mut RawFrame) {
        match self {
            Frame::Standard(f) => f.encode(raw),
            Frame::Property(f) => f.encode(raw),
            Frame::Polling(f) => f.encode(raw),
        }
    }

    /// Encode onto a zeroed payload
    pub fn to_raw(&self) -> RawFrame {
        let mut raw = RawFrame::zeroed();
        self.encode(&mut raw);
        raw
    }
}

impl From<StandardFrame> for Frame {
    fn from(frame: StandardFrame) -> Self {
        Frame::Standard(frame)
    }
}

impl From<PropertyFrame> for Frame {
    fn from(frame: PropertyFrame) -> Self {
        Frame::Property(frame)
    }
}

impl From<PollingFrame> for Frame {
    fn from(frame: PollingFrame) -> Self {
        Frame::Polling(frame)
    }
}

/// Copy `src` into the front of `dst`, zero-filling the rest
pub(crate) fn copy_data<const N: usize>(dst: &mut [u8; N], src: &[u8]) -> crate::error::Result<()> {
    if src.len() > N {
        return Err(crate::error::MsgError::invalid_parameter(
            "data",
            format!("{} bytes exceed capacity of {}", src.len(), N),
        ));
    }
    dst[..src.len()].copy_from_slice(src);
    dst[src.len()..].fill(0);
    Ok(())
}
