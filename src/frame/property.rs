//! Property-access frame layout

use serde::{Deserialize, Serialize};

use super::{copy_data, FrameKind, FrameLayout, RawFrame, MAX_PROP_DATA_LEN};
use crate::error::Result;

const OBJ_ID_OFFSET: usize = 8;
const PROP_ID_OFFSET: usize = 9;
const NUM_ELEMS_OFFSET: usize = 10;
const START_INDEX_OFFSET: usize = 11;
const DATA_OFFSET: usize = 12;

/// Property read/write telegram addressing an interface object property
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertyFrame {
    pub ctrl: u8,
    pub source: u16,
    pub dest: u16,
    pub npci: u8,
    pub tpci: u8,
    pub apci: u8,
    pub obj_id: u8,
    pub prop_id: u8,
    pub num_elems: u8,
    pub start_index: u8,
    pub data: [u8; MAX_PROP_DATA_LEN],
}

impl PropertyFrame {
    pub fn new(ctrl: u8, source: u16, dest: u16) -> Self {
        Self {
            ctrl,
            source,
            dest,
            ..Default::default()
        }
    }

    pub fn with_control(mut self, npci: u8, tpci: u8, apci: u8) -> Self {
        self.npci = npci;
        self.tpci = tpci;
        self.apci = apci;
        self
    }

    /// Address a property: object, property, element count and start index
    pub fn with_property(mut self, obj_id: u8, prop_id: u8, num_elems: u8, start_index: u8) -> Self {
        self.obj_id = obj_id;
        self.prop_id = prop_id;
        self.num_elems = num_elems;
        self.start_index = start_index;
        self
    }

    pub fn with_data(mut self, data: &[u8]) -> Result<Self> {
        copy_data(&mut self.data, data)?;
        Ok(self)
    }
}

impl FrameLayout for PropertyFrame {
    const KIND: FrameKind = FrameKind::Property;

    fn encode(&self, raw: &mut RawFrame) {
        raw.set_ctrl(self.ctrl);
        raw.set_source(self.source);
        raw.set_dest(self.dest);
        let bytes = raw.as_bytes_mut();
        bytes[5] = self.npci;
        bytes[6] = self.tpci;
        bytes[7] = self.apci;
        bytes[OBJ_ID_OFFSET] = self.obj_id;
        bytes[PROP_ID_OFFSET] = self.prop_id;
        bytes[NUM_ELEMS_OFFSET] = self.num_elems;
        bytes[START_INDEX_OFFSET] = self.start_index;
        bytes[DATA_OFFSET..DATA_OFFSET + MAX_PROP_DATA_LEN].copy_from_slice(&self.data);
    }

    fn decode(raw: &RawFrame) -> Self {
        let bytes = raw.as_bytes();
        let mut data = [0u8; MAX_PROP_DATA_LEN];
        data.copy_from_slice(&bytes[DATA_OFFSET..DATA_OFFSET + MAX_PROP_DATA_LEN]);
        Self {
            ctrl: raw.ctrl(),
            source: raw.source(),
            dest: raw.dest(),
            npci: raw.npci(),
            tpci: raw.tpci(),
            apci: raw.apci(),
            obj_id: bytes[OBJ_ID_OFFSET],
            prop_id: bytes[PROP_ID_OFFSET],
            num_elems: bytes[NUM_ELEMS_OFFSET],
            start_index: bytes[START_INDEX_OFFSET],
            data,
        }
    }
}
