//! # knx-msgbuf - Message Buffer Manager for KNX Protocol Stacks
//!
//! A fixed-capacity pool of telegram buffers shared by the layers of a KNX
//! field-bus stack. Upper layers allocate a buffer, fill in its frame and
//! metadata, post it to a service access point, and the layer listening on
//! that access point picks it up, processes it and releases it.
//!
//! ## Features
//!
//! - **Fixed slab**: four 27-byte slots, index-linked free list, LIFO reuse
//! - **Frame codec**: standard, property-access and polling layouts over one 22-byte payload
//! - **Routing queue**: FIFO delivery per service access point
//! - **Blocking allocation**: condition-variable wait with a configurable bound
//! - **Diagnostics**: counters and raw slot dumps, never mutating the pool
//! - **C API**: optional `c-api` feature exposing a process-wide pool
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  MessagePool                     │
//! ├──────────────────────────────────────────────────┤
//! │  Free list (next idx)  │  Routing queue (by sap) │
//! │  used / free counters  │  len / routing count    │
//! ├──────────────────────────────────────────────────┤
//! │   slot 0   │   slot 1   │   slot 2   │   slot 3  │
//! │ next len service sap status | frame[22]          │
//! └──────────────────────────────────────────────────┘
//!           │                         │
//!           ▼                         ▼
//! ┌─────────────────┐    ┌─────────────────────────┐
//! │   C API Layer   │    │     Rust Native API     │
//! └─────────────────┘    └─────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use knx_msgbuf::{Frame, FrameKind, MessagePool, MessagePoolConfig, StandardFrame};
//!
//! # fn main() -> knx_msgbuf::Result<()> {
//! let pool = MessagePool::new(MessagePoolConfig::new("link-layer"))?;
//! pool.init();
//!
//! let buffer = pool.allocate()?;
//! let frame = StandardFrame::new(0xbc, 0x1101, 0x0902).with_data(&[0x80])?;
//! pool.write_frame(buffer, &Frame::from(frame))?;
//! pool.set_sap(buffer, 0x02)?;
//! pool.post(buffer)?;
//!
//! let received = pool.get(0x02).expect("posted buffer");
//! assert!(matches!(pool.read_frame(received, FrameKind::Standard)?, Frame::Standard(_)));
//! pool.release(received)?;
//! # Ok(())
//! # }
//! ```

pub mod buffers;
pub mod error;
pub mod frame;

#[cfg(feature = "c-api")]
pub mod ffi;

// Main API re-exports
pub use buffers::{
    BufferHandle, BufferSlot, CounterSnapshot, MessagePool, MessagePoolConfig,
    MessagePoolConfigBuilder, PoolDump, PoolStats, Service, SlotState, NUM_BUFFERS,
};
pub use error::{MsgError, Result, StatusCode};
pub use frame::{
    Frame, FrameKind, FrameLayout, PollingFrame, Priority, PropertyFrame, RawFrame, StandardFrame,
    MAX_APDU_LEN, MAX_PROP_DATA_LEN, MSG_LEN,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 3;
pub const VERSION_PATCH: u32 = 0;
