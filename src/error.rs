//! Error types and status codes for the message buffer manager

use serde::{Deserialize, Serialize};

/// Result type alias for buffer manager operations
pub type Result<T> = std::result::Result<T, MsgError>;

/// Errors reported by the message buffer manager
///
/// Every variant except `InvalidParameter` maps one-to-one onto a
/// [`StatusCode`] so that callers speaking the numeric status domain can
/// translate without loss.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MsgError {
    /// Pool used before `init` or after `deinit`
    #[error("Message pool is not initialized")]
    Uninit,

    /// Null buffer handle passed to an operation
    #[error("Null buffer handle")]
    NullPtr,

    /// No free slot left in the pool
    #[error("No buffer available (capacity {capacity})")]
    NoBufferAvail { capacity: usize },

    /// Handle does not refer to a slot in the expected ownership state
    #[error("Invalid buffer: slot {slot} - {reason}")]
    InvalidBuffer { slot: u8, reason: &'static str },

    /// Handle refers to a slot that is currently free
    #[error("Buffer not allocated: slot {slot}")]
    NotAllocated { slot: u8 },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },
}

impl MsgError {
    /// Create a no-buffer-available error
    pub fn no_buffer_avail(capacity: usize) -> Self {
        Self::NoBufferAvail { capacity }
    }

    /// Create an invalid buffer error
    pub fn invalid_buffer(slot: u8, reason: &'static str) -> Self {
        Self::InvalidBuffer { slot, reason }
    }

    /// Create a not-allocated error
    pub fn not_allocated(slot: u8) -> Self {
        Self::NotAllocated { slot }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Project the error onto the numeric status domain
    pub fn status(&self) -> StatusCode {
        match self {
            MsgError::Uninit => StatusCode::Uninit,
            MsgError::NullPtr => StatusCode::NullPtr,
            MsgError::NoBufferAvail { .. } => StatusCode::NoBufferAvail,
            MsgError::InvalidBuffer { .. } => StatusCode::InvalidBuffer,
            MsgError::NotAllocated { .. } => StatusCode::NotAllocated,
            MsgError::InvalidParameter { .. } => StatusCode::InvalidBuffer,
        }
    }
}

/// Numeric status codes as stored in a slot's `status` byte
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    Ok = 0x00,
    Uninit = 0x01,
    NullPtr = 0x02,
    NoBufferAvail = 0x03,
    InvalidBuffer = 0x04,
    NotAllocated = 0x05,
}

impl StatusCode {
    /// Decode a raw status byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(StatusCode::Ok),
            0x01 => Some(StatusCode::Uninit),
            0x02 => Some(StatusCode::NullPtr),
            0x03 => Some(StatusCode::NoBufferAvail),
            0x04 => Some(StatusCode::InvalidBuffer),
            0x05 => Some(StatusCode::NotAllocated),
            _ => None,
        }
    }

    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }
}

impl From<&MsgError> for StatusCode {
    fn from(error: &MsgError) -> Self {
        error.status()
    }
}

impl From<MsgError> for StatusCode {
    fn from(error: MsgError) -> Self {
        error.status()
    }
}

impl<T> From<&Result<T>> for StatusCode {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => StatusCode::Ok,
            Err(e) => e.status(),
        }
    }
}
