//! Routing layer tests: post/get ordering and the per-buffer accessors

use knx_msgbuf::{
    buffers::{MessagePool, MessagePoolConfig},
    error::{MsgError, StatusCode},
    frame::{Frame, FrameKind, StandardFrame},
    BufferHandle,
};

fn initialized_pool(config: MessagePoolConfig) -> MessagePool {
    let pool = MessagePool::new(config).unwrap();
    pool.init();
    pool
}

fn post_to(pool: &MessagePool, sap: u8, marker: u8) -> BufferHandle {
    let handle = pool.allocate().unwrap();
    let frame = StandardFrame::new(0xbc, 0x1101, 0x0001).with_data(&[marker]).unwrap();
    pool.write_frame(handle, &Frame::from(frame)).unwrap();
    pool.set_sap(handle, sap).unwrap();
    pool.post(handle).unwrap();
    handle
}

fn marker(pool: &MessagePool, handle: BufferHandle) -> u8 {
    match pool.read_frame(handle, FrameKind::Standard).unwrap() {
        Frame::Standard(frame) => frame.data[0],
        other => panic!("unexpected frame {:?}", other),
    }
}

#[cfg(test)]
mod routing_tests {
    use super::*;

    /// Test: A posted buffer comes back through get with its contents
    #[test]
    fn post_then_get_returns_contents() {
        let pool = initialized_pool(MessagePoolConfig::new("post_get"));
        let posted = post_to(&pool, 0x02, 0x5a);

        let received = pool.get(0x02).expect("buffer should be pending");
        assert_eq!(received, posted);
        assert_eq!(marker(&pool, received), 0x5a);
        assert_eq!(pool.counters().used, 1);
    }

    /// Test: get with another sap leaves the buffer queued
    #[test]
    fn get_with_other_sap_returns_none() {
        let pool = initialized_pool(MessagePoolConfig::new("other_sap"));
        post_to(&pool, 0x02, 1);

        assert_eq!(pool.get(0x03), None);
        assert_eq!(pool.pending(), 1);
        assert!(pool.get(0x02).is_some());
        assert_eq!(pool.pending(), 0);
    }

    /// Test: Buffers for one sap come out in posting order
    #[test]
    fn fifo_per_sap() {
        let pool = initialized_pool(MessagePoolConfig::new("fifo"));
        post_to(&pool, 0x07, 0xa0);
        post_to(&pool, 0x09, 0xff);
        post_to(&pool, 0x07, 0xb0);

        let first = pool.get(0x07).unwrap();
        let second = pool.get(0x07).unwrap();
        assert_eq!(marker(&pool, first), 0xa0);
        assert_eq!(marker(&pool, second), 0xb0);
        assert_eq!(pool.get(0x07), None);

        let other = pool.get(0x09).unwrap();
        assert_eq!(marker(&pool, other), 0xff);
    }

    /// Test: A buffer is delivered only once
    #[test]
    fn get_hands_out_once() {
        let pool = initialized_pool(MessagePoolConfig::new("once"));
        post_to(&pool, 0x01, 0);
        assert!(pool.get(0x01).is_some());
        assert!(pool.get(0x01).is_none());
    }

    /// Test: Post rejects buffers that are not allocated
    #[test]
    fn post_rejects_invalid_buffers() {
        let pool = initialized_pool(MessagePoolConfig::new("post_invalid"));
        assert!(matches!(pool.post(BufferHandle::NULL), Err(MsgError::InvalidBuffer { .. })));

        let handle = post_to(&pool, 0x01, 0);
        assert!(matches!(pool.post(handle), Err(MsgError::InvalidBuffer { .. })));
        assert_eq!(pool.slot(handle).unwrap().status, StatusCode::InvalidBuffer as u8);
        assert_eq!(pool.pending(), 1);
    }

    /// Test: Retrieved buffers can be posted again
    #[test]
    fn repost_after_get() {
        let pool = initialized_pool(MessagePoolConfig::new("repost"));
        post_to(&pool, 0x01, 0x11);
        let handle = pool.get(0x01).unwrap();
        pool.set_sap(handle, 0x04).unwrap();
        pool.post(handle).unwrap();
        assert_eq!(pool.get(0x04), Some(handle));
    }

    /// Test: Releasing a posted buffer removes it from the queue
    #[test]
    fn release_posted_buffer() {
        let pool = initialized_pool(MessagePoolConfig::new("release_posted"));
        let handle = post_to(&pool, 0x01, 0);
        pool.release(handle).unwrap();
        assert_eq!(pool.pending(), 0);
        assert_eq!(pool.counters().free, 4);
        pool.verify();
    }

    /// Test: Oversized length is rejected and the old value kept
    #[test]
    fn set_len_rejects_oversize() {
        let pool = initialized_pool(MessagePoolConfig::new("len"));
        let handle = pool.allocate().unwrap();

        pool.set_len(handle, 12);
        assert_eq!(pool.len(handle), Some(12));

        pool.set_len(handle, 25);
        assert_eq!(pool.len(handle), Some(12));
        assert_eq!(pool.slot(handle).unwrap().status, StatusCode::InvalidBuffer as u8);
    }

    /// Test: Accessors on a null handle are harmless
    #[test]
    fn accessors_on_null_handle() {
        let pool = initialized_pool(MessagePoolConfig::new("null_access"));
        pool.set_len(BufferHandle::NULL, 3);
        pool.set_routing_count(BufferHandle::NULL);
        pool.set_routing_ctrl(BufferHandle::NULL, 0xff);
        assert_eq!(pool.len(BufferHandle::NULL), None);
        assert_eq!(pool.routing_count(BufferHandle::NULL), None);
        assert_eq!(pool.counters().free, 4);
    }

    /// Test: Routing count uses the configured value and never decreases
    #[test]
    fn routing_count_configured_and_monotonic() {
        let pool = initialized_pool(MessagePoolConfig::new("hops").with_routing_count(5));
        let handle = pool.allocate().unwrap();
        pool.with_frame_mut(handle, |raw| raw.set_npci(0x81)).unwrap();

        let mut last = pool.routing_count(handle).unwrap();
        for _ in 0..3 {
            pool.set_routing_count(handle);
            let now = pool.routing_count(handle).unwrap();
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, 5);

        // Length nibble and the top bit survive
        assert_eq!(pool.raw_frame(handle).unwrap().npci(), 0xd1);
    }

    /// Test: Routing control lands in the ctrl byte only
    #[test]
    fn routing_ctrl_sets_ctrl_byte() {
        let pool = initialized_pool(MessagePoolConfig::new("ctrl"));
        let handle = pool.allocate().unwrap();
        pool.with_frame_mut(handle, |raw| raw.set_source(0x1234)).unwrap();

        pool.set_routing_ctrl(handle, 0x9c);
        let raw = pool.raw_frame(handle).unwrap();
        assert_eq!(raw.ctrl(), 0x9c);
        assert_eq!(raw.source(), 0x1234);
    }
}
