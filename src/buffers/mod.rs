//! Message buffer pool
//!
//! A fixed array of [`NUM_BUFFERS`] slots shared by the protocol layers.
//! Slots move between three states:
//!
//! ```text
//!            allocate              post
//!   FREE ───────────────▶ ALLOCATED ─────▶ POSTED
//!     ▲                     │  ▲             │
//!     │      release        │  └──── get ────┤
//!     └─────────────────────┴────────────────┘
//!                            release
//! ```

pub mod config;
pub mod debug;
pub mod pool;
pub mod routing;
pub mod slot;
pub mod stats;

// Re-export main types
pub use config::{MessagePoolConfig, MessagePoolConfigBuilder, DEFAULT_ROUTING_COUNT, MAX_ROUTING_COUNT};
pub use debug::{PoolDump, POOL_DUMP_LEN};
pub use pool::{MessagePool, NUM_BUFFERS};
pub use slot::{BufferHandle, BufferSlot, Service, SlotState, NO_NEXT, SLOT_RECORD_LEN};
pub use stats::{AtomicPoolStats, CounterSnapshot, PoolStats};
