//! Buffer pool lifecycle and allocation tests

use std::time::Duration;

use knx_msgbuf::{
    buffers::{MessagePool, MessagePoolConfig, SlotState, NUM_BUFFERS},
    error::MsgError,
    BufferHandle, CounterSnapshot, Service,
};

fn initialized_pool(name: &str) -> MessagePool {
    let pool = MessagePool::new(MessagePoolConfig::new(name)).unwrap();
    pool.init();
    pool
}

#[cfg(test)]
mod pool_tests {
    use super::*;

    /// Test: Counters after init and after one allocation
    #[test]
    fn counters_after_init_and_allocate() {
        let pool = initialized_pool("counters");
        assert_eq!(pool.counters(), CounterSnapshot { free: 4, used: 0 });

        let _buffer = pool.allocate().unwrap();
        assert_eq!(pool.counters(), CounterSnapshot { free: 3, used: 1 });
    }

    /// Test: Four allocations succeed, the fifth reports exhaustion
    #[test]
    fn fifth_allocation_fails() {
        let pool = initialized_pool("exhaust");
        let handles: Vec<BufferHandle> = (0..NUM_BUFFERS).map(|_| pool.allocate().unwrap()).collect();
        assert_eq!(handles.len(), 4);

        let result = pool.allocate();
        assert!(matches!(result, Err(MsgError::NoBufferAvail { capacity: 4 })));
        assert_eq!(pool.counters(), CounterSnapshot { free: 0, used: 4 });
        assert_eq!(pool.stats().allocation_failures, 1);
    }

    /// Test: used + free stays at capacity across a mixed sequence
    #[test]
    fn capacity_invariant_holds() {
        let pool = initialized_pool("invariant");
        let mut held = Vec::new();

        // Deterministic mix of allocations and releases
        let pattern = [true, true, false, true, true, true, false, false, true, false, false, false];
        for allocate in pattern {
            if allocate {
                if let Ok(handle) = pool.allocate() {
                    held.push(handle);
                }
            } else if let Some(handle) = held.pop() {
                pool.release(handle).unwrap();
            }

            let counters = pool.counters();
            assert_eq!(counters.total(), NUM_BUFFERS);
            assert_eq!(counters.used as usize, held.len());
            pool.verify();
        }
    }

    /// Test: Double release is rejected and does not double-count
    #[test]
    fn double_release_rejected() {
        let pool = initialized_pool("double");
        let handle = pool.allocate().unwrap();

        assert_eq!(pool.release(handle), Ok(()));
        let free_after_first = pool.counters().free;

        let second = pool.release(handle);
        assert!(matches!(second, Err(MsgError::NotAllocated { .. })));
        assert_eq!(pool.counters().free, free_after_first);
        pool.verify();

        // Free list still hands out each slot exactly once
        let mut slots: Vec<u8> = (0..NUM_BUFFERS).map(|_| pool.allocate().unwrap().slot()).collect();
        slots.sort_unstable();
        assert_eq!(slots, vec![0, 1, 2, 3]);
    }

    /// Test: Null handle is reported as such
    #[test]
    fn null_handle_rejected() {
        let pool = initialized_pool("null");
        assert_eq!(pool.release(BufferHandle::null()), Err(MsgError::NullPtr));
        assert_eq!(pool.clear_buffer(BufferHandle::null()), Err(MsgError::NullPtr));
        assert_eq!(pool.counters().free, 4);
    }

    /// Test: Operations before init and after deinit report Uninit
    #[test]
    fn lifecycle_errors() {
        let pool = MessagePool::new(MessagePoolConfig::new("lifecycle")).unwrap();
        assert_eq!(pool.allocate(), Err(MsgError::Uninit));
        assert_eq!(pool.allocate_blocking(), None);
        assert_eq!(pool.get(0), None);

        pool.init();
        let handle = pool.allocate().unwrap();
        pool.deinit();

        assert_eq!(pool.release(handle), Err(MsgError::Uninit));
        assert_eq!(pool.post(handle), Err(MsgError::Uninit));
        assert_eq!(pool.len(handle), None);

        // A second init starts over and leaves old handles dangling
        pool.init();
        assert_eq!(pool.counters(), CounterSnapshot { free: 4, used: 0 });
        assert!(matches!(pool.release(handle), Err(MsgError::InvalidBuffer { .. })));
    }

    /// Test: Init is idempotent
    #[test]
    fn repeated_init() {
        let pool = initialized_pool("reinit");
        let _ = pool.allocate().unwrap();
        pool.init();
        pool.init();
        assert_eq!(pool.counters(), CounterSnapshot { free: 4, used: 0 });
        assert_eq!(pool.allocate().unwrap().slot(), 0);
    }

    /// Test: Clear zeroes payload and metadata but keeps ownership
    #[test]
    fn clear_buffer_keeps_owner() {
        let pool = initialized_pool("clear");
        let handle = pool.allocate().unwrap();
        pool.set_sap(handle, 0x33).unwrap();
        pool.set_len(handle, 10);
        pool.with_frame_mut(handle, |raw| raw.as_bytes_mut().fill(0xaa)).unwrap();

        pool.clear_buffer(handle).unwrap();

        let slot = pool.slot(handle).unwrap();
        assert_eq!(slot.state, SlotState::Allocated);
        assert_eq!((slot.len, slot.service, slot.sap, slot.status), (0, 0, 0, 0));
        assert!(slot.frame.as_bytes().iter().all(|&b| b == 0));
        assert_eq!(pool.counters().used, 1);

        pool.release(handle).unwrap();
        assert!(matches!(pool.clear_buffer(handle), Err(MsgError::NotAllocated { .. })));
    }

    /// Test: Slots record the last pool operation
    #[test]
    fn service_stamps() {
        let pool = initialized_pool("service");
        let handle = pool.allocate().unwrap();
        assert_eq!(pool.slot(handle).unwrap().last_service(), Some(Service::AllocateBuffer));

        pool.post(handle).unwrap();
        let handle = pool.get(0).unwrap();
        assert_eq!(pool.slot(handle).unwrap().last_service(), Some(Service::Get));

        pool.release(handle).unwrap();
        let slots = pool.buffers();
        assert_eq!(slots[handle.slot() as usize].last_service(), Some(Service::ReleaseBuffer));
    }

    /// Test: Free slots keep stale contents in the diagnostic copy
    #[test]
    fn released_slot_contents_visible() {
        let pool = initialized_pool("stale");
        let handle = pool.allocate().unwrap();
        pool.with_frame_mut(handle, |raw| raw.set_ctrl(0xbc)).unwrap();
        pool.release(handle).unwrap();

        let slots = pool.buffers();
        assert_eq!(slots[0].state, SlotState::Free);
        assert_eq!(slots[0].frame.ctrl(), 0xbc);
    }

    /// Test: Blocking allocation gives up after its timeout
    #[test]
    fn blocking_allocation_timeout() {
        let config = MessagePoolConfig::new("timeout").with_timeout(Some(Duration::from_millis(20)));
        let pool = MessagePool::new(config).unwrap();
        pool.init();

        let held: Vec<_> = (0..NUM_BUFFERS).map(|_| pool.allocate_blocking().unwrap()).collect();
        let start = std::time::Instant::now();
        assert_eq!(pool.allocate_blocking(), None);
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(held.len(), 4);

        let stats = pool.stats();
        assert!(stats.blocking_waits >= 1);
        assert_eq!(stats.peak_usage, 4);
    }

    /// Test: Without a timeout the blocking variant tries exactly once
    #[test]
    fn blocking_allocation_without_timeout() {
        let config = MessagePoolConfig::new("once").with_timeout(None);
        let pool = MessagePool::new(config).unwrap();
        pool.init();

        for _ in 0..NUM_BUFFERS {
            assert!(pool.allocate_blocking().is_some());
        }
        assert_eq!(pool.allocate_blocking(), None);
        assert_eq!(pool.stats().blocking_waits, 0);
    }
}
