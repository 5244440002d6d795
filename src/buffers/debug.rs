//! Read-only diagnostics over a message pool

use serde::{Deserialize, Serialize};

use super::{
    pool::{MessagePool, NUM_BUFFERS},
    slot::{BufferSlot, SLOT_RECORD_LEN},
    stats::CounterSnapshot,
};

/// Size of the packed dump of all slots
pub const POOL_DUMP_LEN: usize = NUM_BUFFERS * SLOT_RECORD_LEN;

/// Copy of the whole pool taken under one lock acquisition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDump {
    pub initialized: bool,
    pub counters: CounterSnapshot,
    pub free_head: u8,
    pub slots: [BufferSlot; NUM_BUFFERS],
    /// Posted slot numbers, oldest first
    pub posted: Vec<u8>,
}

impl PoolDump {
    /// The slots as contiguous 27-byte records
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(POOL_DUMP_LEN);
        for slot in &self.slots {
            out.extend_from_slice(&slot.to_bytes());
        }
        out
    }
}

impl MessagePool {
    /// Free/used counters at the instant of the call
    pub fn counters(&self) -> CounterSnapshot {
        let state = self.lock();
        CounterSnapshot {
            free: state.free,
            used: state.used,
        }
    }

    /// Copy of every slot, free ones included. Free slots keep whatever
    /// their last owner left in them.
    pub fn buffers(&self) -> [BufferSlot; NUM_BUFFERS] {
        self.lock().slots
    }

    pub fn dump(&self) -> PoolDump {
        let state = self.lock();
        PoolDump {
            initialized: state.initialized,
            counters: CounterSnapshot {
                free: state.free,
                used: state.used,
            },
            free_head: state.free_head,
            slots: state.slots,
            posted: state.posted.iter().copied().collect(),
        }
    }

    /// Walk the free list and panic if it disagrees with the counters
    pub fn verify(&self) {
        self.lock().verify();
    }
}
