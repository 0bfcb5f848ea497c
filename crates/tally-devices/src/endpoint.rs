//! Endpoint identity and session state shared by both channels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A serial connection candidate. Identifies hardware; never a live handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    /// Device node, e.g. `/dev/ttyUSB0`.
    pub path: String,
    /// USB vendor id (hex, as reported by the kernel).
    pub vendor_id: Option<String>,
    pub product_id: Option<String>,
    pub serial_number: Option<String>,
}

impl DeviceEndpoint {
    /// An endpoint known only by its path.
    pub fn from_path(path: impl Into<String>) -> Self {
        DeviceEndpoint {
            path: path.into(),
            vendor_id: None,
            product_id: None,
            serial_number: None,
        }
    }
}

impl fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        if let (Some(vid), Some(pid)) = (&self.vendor_id, &self.product_id) {
            write!(f, " [{}:{}]", vid, pid)?;
        }
        if let Some(serial) = &self.serial_number {
            write!(f, " s/n {}", serial)?;
        }
        Ok(())
    }
}

/// Logical device role. One live session per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    Scanner,
    Printer,
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceRole::Scanner => write!(f, "scanner"),
            DeviceRole::Printer => write!(f, "printer"),
        }
    }
}

/// Session lifecycle.
///
/// ```text
/// Closed ──connect──► Opening ──ok──► Open ──I/O error──► Faulted(reason)
///   ▲                    │                                     │
///   │                    └──open error──► Faulted(reason)      │
///   └────────── disconnect / connect (close-before-open) ──────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opening,
    Open,
    Faulted(String),
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        matches!(self, SessionState::Open)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Closed => write!(f, "closed"),
            SessionState::Opening => write!(f, "opening"),
            SessionState::Open => write!(f, "open"),
            SessionState::Faulted(reason) => write!(f, "faulted: {}", reason),
        }
    }
}
