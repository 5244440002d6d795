//! Standard data frame layout

use serde::{Deserialize, Serialize};

use super::{copy_data, FrameKind, FrameLayout, RawFrame, MAX_APDU_LEN};
use crate::error::Result;

const DATA_OFFSET: usize = 8;

/// Standard telegram: addressing header plus up to 14 bytes of APDU data
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StandardFrame {
    pub ctrl: u8,
    pub source: u16,
    pub dest: u16,
    pub npci: u8,
    pub tpci: u8,
    pub apci: u8,
    pub data: [u8; MAX_APDU_LEN],
}

impl StandardFrame {
    /// Create a frame with the addressing header set and empty data
    pub fn new(ctrl: u8, source: u16, dest: u16) -> Self {
        Self {
            ctrl,
            source,
            dest,
            ..Default::default()
        }
    }

    /// Set the protocol control fields
    pub fn with_control(mut self, npci: u8, tpci: u8, apci: u8) -> Self {
        self.npci = npci;
        self.tpci = tpci;
        self.apci = apci;
        self
    }

    /// Replace the APDU data, zero-filling unused bytes
    pub fn with_data(mut self, data: &[u8]) -> Result<Self> {
        copy_data(&mut self.data, data)?;
        Ok(self)
    }
}

impl FrameLayout for StandardFrame {
    const KIND: FrameKind = FrameKind::Standard;

    fn encode(&self, raw: &mut RawFrame) {
        raw.set_ctrl(self.ctrl);
        raw.set_source(self.source);
        raw.set_dest(self.dest);
        let bytes = raw.as_bytes_mut();
        bytes[5] = self.npci;
        bytes[6] = self.tpci;
        bytes[7] = self.apci;
        bytes[DATA_OFFSET..DATA_OFFSET + MAX_APDU_LEN].copy_from_slice(&self.data);
    }

    fn decode(raw: &RawFrame) -> Self {
        let mut data = [0u8; MAX_APDU_LEN];
        data.copy_from_slice(&raw.as_bytes()[DATA_OFFSET..DATA_OFFSET + MAX_APDU_LEN]);
        Self {
            ctrl: raw.ctrl(),
            source: raw.source(),
            dest: raw.dest(),
            npci: raw.npci(),
            tpci: raw.tpci(),
            apci: raw.apci(),
            data,
        }
    }
}
