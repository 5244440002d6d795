//! Polling frame layout

use serde::{Deserialize, Serialize};

use super::{copy_data, FrameKind, FrameLayout, RawFrame, MAX_POLL_SLOTS};
use crate::error::Result;

const NUM_SLOTS_OFFSET: usize = 5;
const SLOTS_OFFSET: usize = 6;

/// Polling telegram. Only the first 20 payload bytes belong to this layout.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PollingFrame {
    pub ctrl: u8,
    pub source: u16,
    pub poll_addr: u16,
    pub num_slots: u8,
    pub slots: [u8; MAX_POLL_SLOTS],
}

impl PollingFrame {
    pub fn new(ctrl: u8, source: u16, poll_addr: u16) -> Self {
        Self {
            ctrl,
            source,
            poll_addr,
            ..Default::default()
        }
    }

    /// Replace the slot data and set `num_slots` to its length
    pub fn with_slots(mut self, slots: &[u8]) -> Result<Self> {
        copy_data(&mut self.slots, slots)?;
        self.num_slots = slots.len() as u8;
        Ok(self)
    }

    /// The slot bytes that are in use according to `num_slots`
    pub fn active_slots(&self) -> &[u8] {
        let n = (self.num_slots as usize).min(MAX_POLL_SLOTS);
        &self.slots[..n]
    }
}

impl FrameLayout for PollingFrame {
    const KIND: FrameKind = FrameKind::Polling;

    fn encode(&self, raw: &mut RawFrame) {
        raw.set_ctrl(self.ctrl);
        raw.set_source(self.source);
        raw.set_dest(self.poll_addr);
        let bytes = raw.as_bytes_mut();
        bytes[NUM_SLOTS_OFFSET] = self.num_slots;
        bytes[SLOTS_OFFSET..SLOTS_OFFSET + MAX_POLL_SLOTS].copy_from_slice(&self.slots);
    }

    fn decode(raw: &RawFrame) -> Self {
        let bytes = raw.as_bytes();
        let mut slots = [0u8; MAX_POLL_SLOTS];
        slots.copy_from_slice(&bytes[SLOTS_OFFSET..SLOTS_OFFSET + MAX_POLL_SLOTS]);
        Self {
            ctrl: raw.ctrl(),
            source: raw.source(),
            poll_addr: raw.dest(),
            num_slots: bytes[NUM_SLOTS_OFFSET],
            slots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polling_leaves_trailing_bytes() {
        let mut raw = RawFrame::from_bytes([0xee; 22]);
        let frame = PollingFrame::new(0xf0, 0x1001, 0x2233)
            .with_slots(&[0x01, 0x02, 0x03])
            .unwrap();
        frame.encode(&mut raw);

        let bytes = raw.as_bytes();
        assert_eq!(&bytes[3..6], &[0x22, 0x33, 3]);
        assert_eq!(&bytes[20..], &[0xee, 0xee]);
        assert_eq!(PollingFrame::decode(&raw).active_slots(), &[0x01, 0x02, 0x03]);
    }
}
