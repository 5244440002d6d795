//! Routing layer: posting buffers to a service access point and the
//! per-buffer routing accessors

use log::{trace, warn};

use crate::{
    error::{MsgError, Result, StatusCode},
    frame::MSG_LEN,
};

use super::{
    pool::MessagePool,
    slot::{BufferHandle, Service, SlotState},
};

impl MessagePool {
    /// Hand an allocated buffer to the routing layer.
    ///
    /// The buffer is queued behind earlier posts and can be picked up with
    /// [`MessagePool::get`] using its `sap`. Anything other than an allocated
    /// buffer, including the null handle, is rejected as `InvalidBuffer`.
    pub fn post(&self, handle: BufferHandle) -> Result<()> {
        let mut state = self.lock();
        if !state.initialized {
            return Err(self.report(Service::Post, MsgError::Uninit));
        }
        if handle.is_null() {
            return Err(self.report(
                Service::Post,
                MsgError::invalid_buffer(handle.slot(), "null handle"),
            ));
        }

        let idx = state.resolve(handle).map_err(|e| self.report(Service::Post, e))?;
        if state.slots[idx].state != SlotState::Allocated {
            let error = MsgError::invalid_buffer(handle.slot(), "buffer is not allocated");
            state.stamp(idx, Service::Post, error.status());
            return Err(self.report(Service::Post, error));
        }

        state.slots[idx].state = SlotState::Posted;
        state.posted.push_back(idx as u8);
        state.stamp(idx, Service::Post, StatusCode::Ok);
        self.stats_recorder().record_post();
        trace!("{}: posted slot {} to sap 0x{:02x}", self.config().name, idx, state.slots[idx].sap);
        Ok(())
    }

    /// Take the oldest buffer posted for `sap`.
    ///
    /// The buffer leaves the routing queue and belongs to the caller, who
    /// must release it eventually. Returns `None` when nothing is pending.
    pub fn get(&self, sap: u8) -> Option<BufferHandle> {
        let mut state = self.lock();
        if !state.initialized {
            self.report(Service::Get, MsgError::Uninit);
            return None;
        }

        let position = state
            .posted
            .iter()
            .position(|&idx| state.slots[idx as usize].sap == sap)?;
        let idx = state.posted.remove(position)? as usize;

        state.slots[idx].state = SlotState::Allocated;
        state.stamp(idx, Service::Get, StatusCode::Ok);
        self.stats_recorder().record_get();
        trace!("{}: sap 0x{:02x} took slot {}", self.config().name, sap, idx);
        Some(state.handle(idx))
    }

    /// Number of buffers waiting in the routing queue
    pub fn pending(&self) -> usize {
        self.lock().posted.len()
    }

    /// Set the logical payload length.
    ///
    /// Lengths beyond the 22-byte payload are rejected: `len` keeps its
    /// previous value and the slot status becomes `InvalidBuffer`.
    pub fn set_len(&self, handle: BufferHandle, len: u8) {
        let mut state = self.lock();
        let idx = match state.owned(handle) {
            Ok(idx) => idx,
            Err(e) => {
                self.report(Service::SetLen, e);
                return;
            }
        };

        if len as usize > MSG_LEN {
            state.stamp(idx, Service::SetLen, StatusCode::InvalidBuffer);
            warn!(
                "{}: length {} exceeds payload of {} bytes (slot {})",
                self.config().name,
                len,
                MSG_LEN,
                idx
            );
            return;
        }

        state.slots[idx].len = len;
        state.stamp(idx, Service::SetLen, StatusCode::Ok);
    }

    pub fn len(&self, handle: BufferHandle) -> Option<u8> {
        let state = self.lock();
        match state.owned(handle) {
            Ok(idx) => Some(state.slots[idx].len),
            Err(e) => {
                self.report(Service::GetLen, e);
                None
            }
        }
    }

    /// Routing (hop) counter carried in the npci byte
    pub fn routing_count(&self, handle: BufferHandle) -> Option<u8> {
        let state = self.lock();
        match state.owned(handle) {
            Ok(idx) => Some(state.slots[idx].frame.routing_count()),
            Err(e) => {
                self.report(Service::GetRoutingCount, e);
                None
            }
        }
    }

    /// Load the configured routing counter into the npci byte.
    ///
    /// The counter is set to a fixed value, so repeated calls never lower it.
    pub fn set_routing_count(&self, handle: BufferHandle) {
        let count = self.config().routing_count;
        match self.with_slot(handle, Service::SetRoutingCount, |slot| {
            slot.frame.set_routing_count(count);
        }) {
            Ok(()) => trace!("{}: routing count set to {}", self.config().name, count),
            // already reported by `with_slot`
            Err(_) => {}
        }
    }

    /// Write routing-control flags into the frame's ctrl byte
    pub fn set_routing_ctrl(&self, handle: BufferHandle, ctrl: u8) {
        match self.with_slot(handle, Service::SetRoutingCtrl, |slot| slot.frame.set_ctrl(ctrl)) {
            Ok(()) => trace!("{}: routing ctrl set to {:#04x}", self.config().name, ctrl),
            // already reported by `with_slot`
            Err(_) => {}
        }
    }
}
