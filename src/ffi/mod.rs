//! C Foreign Function Interface (FFI)
//!
//! A C-compatible surface over one process-wide [`MessagePool`](crate::MessagePool).
//! Buffers are passed as slot numbers, with `KNXMSG_NULL_BUFFER` (0xFF) as
//! the null buffer.

pub mod messaging;
pub mod types;
pub mod version;

pub use types::{
    KnxMsgBuffer, KnxMsgBufferNumber, KnxMsgDebugBufferCounters, KnxMsgStatus,
    KNXMSG_NULL_BUFFER, KNXMSG_OK,
};

pub use messaging::{
    knxmsg_allocate_buffer, knxmsg_allocate_buffer_wrapper, knxmsg_clear_buffer,
    knxmsg_debug_get_buffer_counters, knxmsg_debug_get_buffers, knxmsg_deinit, knxmsg_get,
    knxmsg_get_len, knxmsg_get_routing_count, knxmsg_init, knxmsg_post, knxmsg_read_msg,
    knxmsg_release_buffer, knxmsg_set_len, knxmsg_set_routing_count, knxmsg_set_routing_ctrl,
    knxmsg_set_sap, knxmsg_write_msg, GLOBAL_POOL,
};

pub use version::{
    knxmsg_version, knxmsg_version_compatible, knxmsg_version_major, knxmsg_version_minor,
    knxmsg_version_patch,
};
