//! # Device Error Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  open()  fails ──► OpenFailed   ──► session state Faulted(reason)       │
//! │  write() fails ──► WriteFailed  ──► session state Faulted(reason)       │
//! │  read()  fails ──► ReadFailed   ──► session state Faulted(reason)       │
//! │  submit() while not Open ──► NotConnected (state unchanged)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No error here triggers a retry. The operator reconnects by writing the
//! device configuration again.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The serial line could not be opened or configured.
    #[error("Failed to open {path}: {reason}")]
    OpenFailed { path: String, reason: String },

    /// No open session for this role.
    #[error("Device not connected")]
    NotConnected,

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    /// Configuration rejected before any device was touched.
    #[error("Invalid device configuration: {0}")]
    InvalidConfig(String),
}

impl DeviceError {
    pub fn open_failed(path: impl Into<String>, reason: impl ToString) -> Self {
        DeviceError::OpenFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;
