//! Fixed-capacity message pool: lifecycle, allocation and slot access

use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use log::{debug, trace, warn};

use crate::{
    error::{MsgError, Result, StatusCode},
    frame::{Frame, FrameKind, RawFrame},
};

use super::{
    config::MessagePoolConfig,
    slot::{BufferHandle, BufferSlot, Service, SlotState, NO_NEXT},
    stats::{AtomicPoolStats, PoolStats},
};

/// Number of slots in every pool
pub const NUM_BUFFERS: usize = 4;

/// Everything guarded by the pool lock
#[derive(Debug)]
pub(super) struct PoolState {
    pub(super) initialized: bool,
    /// Bumped on every init/deinit so older handles stop resolving
    pub(super) generation: u32,
    pub(super) slots: [BufferSlot; NUM_BUFFERS],
    pub(super) free_head: u8,
    pub(super) free: u8,
    pub(super) used: u8,
    /// Posted slot indices, oldest first
    pub(super) posted: VecDeque<u8>,
}

impl PoolState {
    fn new() -> Self {
        let mut state = Self {
            initialized: false,
            generation: 0,
            slots: [BufferSlot::default(); NUM_BUFFERS],
            free_head: NO_NEXT,
            free: 0,
            used: 0,
            posted: VecDeque::with_capacity(NUM_BUFFERS),
        };
        state.reset();
        state
    }

    /// Link every slot into the free list in index order
    fn reset(&mut self) {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            let next = if idx + 1 < NUM_BUFFERS {
                (idx + 1) as u8
            } else {
                NO_NEXT
            };
            *slot = BufferSlot::free(next);
        }
        self.free_head = 0;
        self.free = NUM_BUFFERS as u8;
        self.used = 0;
        self.posted.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    pub(super) fn handle(&self, idx: usize) -> BufferHandle {
        BufferHandle::new(idx as u8, self.generation)
    }

    /// Map a handle to a slot index without looking at the slot state
    pub(super) fn resolve(&self, handle: BufferHandle) -> Result<usize> {
        if !self.initialized {
            return Err(MsgError::Uninit);
        }
        if handle.is_null() {
            return Err(MsgError::NullPtr);
        }
        let idx = handle.slot() as usize;
        if idx >= NUM_BUFFERS {
            return Err(MsgError::invalid_buffer(handle.slot(), "slot index out of range"));
        }
        if handle.generation() != self.generation {
            return Err(MsgError::invalid_buffer(handle.slot(), "handle predates pool reset"));
        }
        Ok(idx)
    }

    /// Resolve a handle to a slot that is allocated or posted
    pub(super) fn owned(&self, handle: BufferHandle) -> Result<usize> {
        let idx = self.resolve(handle)?;
        if self.slots[idx].is_free() {
            return Err(MsgError::not_allocated(handle.slot()));
        }
        Ok(idx)
    }

    fn pop_free(&mut self) -> Option<usize> {
        if self.free_head == NO_NEXT {
            assert_eq!(self.free, 0, "free list empty but free counter is {}", self.free);
            return None;
        }
        let idx = self.free_head as usize;
        let slot = &mut self.slots[idx];
        assert!(slot.is_free(), "free list head {} is not a free slot", idx);

        self.free_head = slot.next;
        slot.next = NO_NEXT;
        slot.state = SlotState::Allocated;
        self.free -= 1;
        self.used += 1;
        Some(idx)
    }

    fn push_free(&mut self, idx: usize) {
        let slot = &mut self.slots[idx];
        slot.next = self.free_head;
        slot.state = SlotState::Free;
        self.free_head = idx as u8;
        self.free += 1;
        self.used -= 1;
    }

    pub(super) fn stamp(&mut self, idx: usize, service: Service, status: StatusCode) {
        let slot = &mut self.slots[idx];
        slot.service = service as u8;
        slot.status = status as u8;
    }

    /// Walk the free list and check it against the counters and slot states.
    ///
    /// Panics on any mismatch: a corrupted pool cannot be recovered.
    pub(super) fn verify(&self) {
        assert_eq!(
            self.free as usize + self.used as usize,
            NUM_BUFFERS,
            "free ({}) + used ({}) != capacity",
            self.free,
            self.used
        );

        let mut cursor = self.free_head;
        let mut length = 0usize;
        while cursor != NO_NEXT {
            assert!(length < NUM_BUFFERS, "free list cycle detected");
            let slot = &self.slots[cursor as usize];
            assert!(slot.is_free(), "slot {} linked in free list while {:?}", cursor, slot.state);
            length += 1;
            cursor = slot.next;
        }
        assert_eq!(length, self.free as usize, "free list length != free counter");

        let free_slots = self.slots.iter().filter(|s| s.is_free()).count();
        assert_eq!(free_slots, length, "free slot missing from free list");
    }
}

/// A fixed pool of message buffers shared by the protocol layers
///
/// The pool starts uninitialized; call [`MessagePool::init`] before use. All
/// mutating operations take the internal lock, so a pool can be shared
/// between threads behind an `Arc`.
///
/// Result shapes differ on purpose: `allocate`, `release`, `clear_buffer` and
/// `post` report a [`MsgError`], while `allocate_blocking` and `get` report
/// failure as `None`.
#[derive(Debug)]
pub struct MessagePool {
    config: MessagePoolConfig,
    state: Mutex<PoolState>,
    /// Signalled when a slot returns to the free list or the pool is reset
    available: Condvar,
    stats: AtomicPoolStats,
}

impl MessagePool {
    /// Create a new, uninitialized pool
    pub fn new(config: MessagePoolConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            state: Mutex::new(PoolState::new()),
            available: Condvar::new(),
            stats: AtomicPoolStats::new(),
        })
    }

    /// Get pool configuration
    pub fn config(&self) -> &MessagePoolConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        NUM_BUFFERS
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    /// Get current statistics
    pub fn stats(&self) -> PoolStats {
        self.stats.snapshot()
    }

    /// Reset every slot to free and rebuild the free list in index order.
    ///
    /// Handles issued before the call become invalid.
    pub fn init(&self) {
        let mut state = self.lock();
        state.reset();
        state.initialized = true;
        debug!("{}: initialized {} buffers", self.config.name, NUM_BUFFERS);
        drop(state);

        self.available.notify_all();
    }

    /// Invalidate the pool. Later operations report `Uninit`.
    pub fn deinit(&self) {
        let mut state = self.lock();
        state.reset();
        state.initialized = false;
        debug!("{}: deinitialized", self.config.name);
        drop(state);

        self.available.notify_all();
    }

    /// Take a slot off the free list
    pub fn allocate(&self) -> Result<BufferHandle> {
        let mut state = self.lock();
        if !state.initialized {
            return Err(self.report(Service::AllocateBuffer, MsgError::Uninit));
        }

        match state.pop_free() {
            Some(idx) => {
                state.stamp(idx, Service::AllocateBuffer, StatusCode::Ok);
                self.stats.record_allocation(state.used as usize);
                trace!("{}: allocated slot {}", self.config.name, idx);
                Ok(state.handle(idx))
            }
            None => {
                self.stats.record_failure();
                debug!("{}: no buffer available", self.config.name);
                Err(MsgError::no_buffer_avail(NUM_BUFFERS))
            }
        }
    }

    /// Allocate, waiting up to the configured `allocation_timeout` for a
    /// slot to be released. Returns `None` on timeout or when the pool is
    /// not initialized.
    ///
    /// A timeout too large to express as an `Instant` waits without a bound.
    pub fn allocate_blocking(&self) -> Option<BufferHandle> {
        let timeout = self.config.allocation_timeout.unwrap_or(Duration::ZERO);
        self.allocate_waiting(Instant::now().checked_add(timeout))
    }

    /// Allocate, waiting until `deadline` at the latest
    pub fn allocate_blocking_until(&self, deadline: Instant) -> Option<BufferHandle> {
        self.allocate_waiting(Some(deadline))
    }

    /// Blocking allocation loop; `None` deadline means wait until a slot
    /// frees up or the pool is deinitialized
    fn allocate_waiting(&self, deadline: Option<Instant>) -> Option<BufferHandle> {
        let mut state = self.lock();
        loop {
            if !state.initialized {
                self.report(Service::AllocateBufferWrapper, MsgError::Uninit);
                return None;
            }

            if let Some(idx) = state.pop_free() {
                state.stamp(idx, Service::AllocateBufferWrapper, StatusCode::Ok);
                self.stats.record_allocation(state.used as usize);
                trace!("{}: allocated slot {} (blocking)", self.config.name, idx);
                return Some(state.handle(idx));
            }

            let now = Instant::now();
            if deadline.map_or(false, |deadline| now >= deadline) {
                self.stats.record_failure();
                debug!("{}: gave up waiting for a buffer", self.config.name);
                return None;
            }

            self.stats.record_wait();
            state = match deadline {
                Some(deadline) => {
                    self.available
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    /// Return an allocated or posted slot to the head of the free list
    pub fn release(&self, handle: BufferHandle) -> Result<()> {
        let mut state = self.lock();
        let idx = state
            .owned(handle)
            .map_err(|e| self.report(Service::ReleaseBuffer, e))?;

        if state.slots[idx].state == SlotState::Posted {
            state.posted.retain(|&posted| posted as usize != idx);
        }
        state.push_free(idx);
        state.stamp(idx, Service::ReleaseBuffer, StatusCode::Ok);
        self.stats.record_release();
        trace!("{}: released slot {}", self.config.name, idx);

        #[cfg(debug_assertions)]
        state.verify();
        drop(state);

        self.available.notify_one();
        Ok(())
    }

    /// Zero payload and metadata of an owned slot without changing its state
    pub fn clear_buffer(&self, handle: BufferHandle) -> Result<()> {
        let mut state = self.lock();
        let idx = state
            .owned(handle)
            .map_err(|e| self.report(Service::ClearBuffer, e))?;
        state.slots[idx].clear();
        Ok(())
    }

    /// Zero only the 22-byte frame, keeping len, sap and the other metadata
    pub fn clear_message(&self, handle: BufferHandle) -> Result<()> {
        self.with_slot(handle, Service::ClearMessageBuffer, |slot| {
            slot.frame.clear();
        })
    }

    /// Slot number of a handle
    pub fn buffer_number(&self, handle: BufferHandle) -> Option<u8> {
        let state = self.lock();
        match state.owned(handle) {
            Ok(idx) => Some(idx as u8),
            Err(e) => {
                self.report(Service::GetBufferNumber, e);
                None
            }
        }
    }

    /// Handle for a slot number, provided the slot is not free
    pub fn handle_for(&self, number: u8) -> Option<BufferHandle> {
        let state = self.lock();
        if !state.initialized {
            self.report(Service::GetBufferAddress, MsgError::Uninit);
            return None;
        }
        let idx = number as usize;
        if idx >= NUM_BUFFERS || state.slots[idx].is_free() {
            return None;
        }
        Some(state.handle(idx))
    }

    /// Set the service access point the buffer is addressed to
    pub fn set_sap(&self, handle: BufferHandle, sap: u8) -> Result<()> {
        let mut state = self.lock();
        let idx = state.owned(handle)?;
        state.slots[idx].sap = sap;
        Ok(())
    }

    pub fn sap(&self, handle: BufferHandle) -> Result<u8> {
        let state = self.lock();
        let idx = state.owned(handle)?;
        Ok(state.slots[idx].sap)
    }

    /// Encode a typed frame into the slot payload
    pub fn write_frame(&self, handle: BufferHandle, frame: &Frame) -> Result<()> {
        let mut state = self.lock();
        let idx = state.owned(handle)?;
        frame.encode(&mut state.slots[idx].frame);
        Ok(())
    }

    /// Decode the slot payload as `kind`
    pub fn read_frame(&self, handle: BufferHandle, kind: FrameKind) -> Result<Frame> {
        let state = self.lock();
        let idx = state.owned(handle)?;
        Ok(state.slots[idx].frame.decode(kind))
    }

    /// Copy of the raw slot payload
    pub fn raw_frame(&self, handle: BufferHandle) -> Result<RawFrame> {
        let state = self.lock();
        let idx = state.owned(handle)?;
        Ok(state.slots[idx].frame)
    }

    /// Run `f` against the slot payload while holding the pool lock
    pub fn with_frame_mut<R>(
        &self,
        handle: BufferHandle,
        f: impl FnOnce(&mut RawFrame) -> R,
    ) -> Result<R> {
        let mut state = self.lock();
        let idx = state.owned(handle)?;
        Ok(f(&mut state.slots[idx].frame))
    }

    /// Copy of the whole slot record
    pub fn slot(&self, handle: BufferHandle) -> Result<BufferSlot> {
        let state = self.lock();
        let idx = state.owned(handle)?;
        Ok(state.slots[idx])
    }

    /// Handle for a slot number in the current generation, whatever its
    /// state. `NO_NEXT` maps to the null handle.
    pub(crate) fn handle_at(&self, number: u8) -> BufferHandle {
        if number == NO_NEXT {
            return BufferHandle::NULL;
        }
        BufferHandle::new(number, self.lock().generation)
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn stats_recorder(&self) -> &AtomicPoolStats {
        &self.stats
    }

    /// Apply a mutation to an owned slot and stamp it with `service`
    pub(super) fn with_slot(
        &self,
        handle: BufferHandle,
        service: Service,
        f: impl FnOnce(&mut BufferSlot),
    ) -> Result<()> {
        let mut state = self.lock();
        let idx = state.owned(handle).map_err(|e| self.report(service, e))?;
        f(&mut state.slots[idx]);
        state.stamp(idx, service, StatusCode::Ok);
        Ok(())
    }

    /// Log a rejected operation and hand the error back
    pub(super) fn report(&self, service: Service, error: MsgError) -> MsgError {
        warn!(
            "{}: {:?} (0x{:02x}) rejected: {} [status 0x{:02x}]",
            self.config.name,
            service,
            service as u8,
            error,
            error.status() as u8
        );
        error
    }
}

impl Default for MessagePool {
    fn default() -> Self {
        Self {
            config: MessagePoolConfig::default(),
            state: Mutex::new(PoolState::new()),
            available: Condvar::new(),
            stats: AtomicPoolStats::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    fn pool() -> MessagePool {
        let pool = MessagePool::new(MessagePoolConfig::new("unit")).unwrap();
        pool.init();
        pool
    }

    #[test]
    fn test_uninitialized_pool() {
        let pool = MessagePool::new(MessagePoolConfig::default()).unwrap();
        assert!(!pool.is_initialized());
        assert_eq!(pool.allocate(), Err(MsgError::Uninit));
        assert_eq!(pool.allocate_blocking(), None);
    }

    #[test]
    fn test_fresh_pool_hands_out_slots_in_order() {
        let pool = pool();
        let slots: Vec<u8> = (0..NUM_BUFFERS)
            .map(|_| pool.allocate().unwrap().slot())
            .collect();
        assert_eq!(slots, vec![0, 1, 2, 3]);
        assert!(matches!(pool.allocate(), Err(MsgError::NoBufferAvail { .. })));
    }

    #[test]
    fn test_release_is_lifo() {
        let pool = pool();
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        pool.release(a).unwrap();
        pool.release(b).unwrap();

        assert_eq!(pool.allocate().unwrap().slot(), b.slot());
        assert_eq!(pool.allocate().unwrap().slot(), a.slot());
    }

    #[test]
    fn test_double_release_detected() {
        let pool = pool();
        let handle = pool.allocate().unwrap();
        assert!(pool.release(handle).is_ok());
        assert_eq!(pool.release(handle), Err(MsgError::not_allocated(handle.slot())));
        pool.lock().verify();
    }

    #[test]
    fn test_null_and_stale_handles() {
        let pool = pool();
        assert_eq!(pool.release(BufferHandle::NULL), Err(MsgError::NullPtr));
        assert_eq!(pool.clear_buffer(BufferHandle::NULL), Err(MsgError::NullPtr));

        let handle = pool.allocate().unwrap();
        pool.init();
        assert!(matches!(pool.release(handle), Err(MsgError::InvalidBuffer { .. })));
    }

    #[test]
    fn test_operations_after_deinit() {
        let pool = pool();
        let handle = pool.allocate().unwrap();
        pool.deinit();
        assert_eq!(pool.release(handle), Err(MsgError::Uninit));
        assert_eq!(pool.allocate(), Err(MsgError::Uninit));
    }

    #[test]
    fn test_clear_keeps_ownership() {
        let pool = pool();
        let handle = pool.allocate().unwrap();
        pool.set_sap(handle, 0x21).unwrap();
        pool.with_frame_mut(handle, |raw| raw.set_ctrl(0xbc)).unwrap();

        pool.clear_buffer(handle).unwrap();
        let slot = pool.slot(handle).unwrap();
        assert_eq!(slot.state, SlotState::Allocated);
        assert_eq!(slot.sap, 0);
        assert_eq!(slot.service, 0);
        assert_eq!(slot.frame, RawFrame::zeroed());
    }

    #[test]
    fn test_clear_message_keeps_metadata() {
        let pool = pool();
        let handle = pool.allocate().unwrap();
        pool.set_sap(handle, 0x21).unwrap();
        pool.with_frame_mut(handle, |raw| raw.set_ctrl(0xbc)).unwrap();

        pool.clear_message(handle).unwrap();
        let slot = pool.slot(handle).unwrap();
        assert_eq!(slot.sap, 0x21);
        assert_eq!(slot.last_service(), Some(Service::ClearMessageBuffer));
        assert_eq!(slot.frame, RawFrame::zeroed());
    }

    #[test]
    fn test_buffer_number_lookup() {
        let pool = pool();
        let _ = pool.allocate().unwrap();
        let handle = pool.allocate().unwrap();
        assert_eq!(pool.buffer_number(handle), Some(1));
        assert_eq!(pool.handle_for(1), Some(handle));
        assert_eq!(pool.handle_for(2), None);
        assert_eq!(pool.handle_for(9), None);
    }

    #[test]
    fn test_blocking_allocate_times_out() {
        let config = MessagePoolConfig::new("blocking").with_timeout(Some(Duration::from_millis(5)));
        let pool = MessagePool::new(config).unwrap();
        pool.init();
        for _ in 0..NUM_BUFFERS {
            assert!(pool.allocate_blocking().is_some());
        }
        assert_eq!(pool.allocate_blocking(), None);
        assert_eq!(pool.stats().allocation_failures, 1);
    }

    #[test]
    fn test_blocking_allocate_with_unbounded_timeout() {
        let config = MessagePoolConfig::new("unbounded").with_timeout(Some(Duration::MAX));
        let pool = Arc::new(MessagePool::new(config).unwrap());
        pool.init();

        let held: Vec<_> = (0..NUM_BUFFERS)
            .map(|_| pool.allocate_blocking().unwrap())
            .collect();

        let releaser = {
            let pool = Arc::clone(&pool);
            let handle = held[2];
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                pool.release(handle).unwrap();
            })
        };

        let handle = pool.allocate_blocking().unwrap();
        assert_eq!(handle.slot(), held[2].slot());
        releaser.join().unwrap();
    }

    #[test]
    fn test_blocking_allocate_until_deadline() {
        let pool = Arc::new(pool());
        let held: Vec<_> = (0..NUM_BUFFERS).map(|_| pool.allocate().unwrap()).collect();

        let deadline = Instant::now() + Duration::from_millis(10);
        assert_eq!(pool.allocate_blocking_until(deadline), None);
        assert!(Instant::now() >= deadline);

        let releaser = {
            let pool = Arc::clone(&pool);
            let handle = held[1];
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                pool.release(handle).unwrap();
            })
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        let handle = pool.allocate_blocking_until(deadline).unwrap();
        assert_eq!(handle.slot(), held[1].slot());
        assert!(Instant::now() < deadline);
        releaser.join().unwrap();
    }

    #[test]
    #[should_panic(expected = "free list cycle detected")]
    fn test_verify_detects_free_list_cycle() {
        let mut state = PoolState::new();
        state.slots[1].next = 0;
        state.verify();
    }

    #[test]
    #[should_panic(expected = "!= capacity")]
    fn test_verify_detects_counter_mismatch() {
        let mut state = PoolState::new();
        state.used = 1;
        state.verify();
    }

    #[test]
    #[should_panic(expected = "free slot missing from free list")]
    fn test_verify_detects_unlinked_free_slot() {
        let mut state = PoolState::new();
        // Unlink slot 3 from the list while keeping it FREE
        state.slots[2].next = NO_NEXT;
        state.free = 3;
        state.used = 1;
        state.verify();
    }
}
