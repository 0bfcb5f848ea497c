//! # Device Configuration
//!
//! Which endpoint serves each role, and at what speed. Stored as JSON in the
//! key-value store under [`DEVICE_CONFIG_KEY`]; writing it reconnects both
//! channels.
//!
//! ```json
//! { "scanner_endpoint": "/dev/ttyACM0", "printer_endpoint": "/dev/ttyUSB0",
//!   "scanner_baud": 9600, "printer_baud": 19200 }
//! ```
//!
//! Absent fields take their defaults: no endpoint, 9600 baud.

use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, DeviceResult};

/// Key under which the configuration is persisted.
pub const DEVICE_CONFIG_KEY: &str = "device_config";

pub const DEFAULT_BAUD: u32 = 9_600;

fn default_baud() -> u32 {
    DEFAULT_BAUD
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub scanner_endpoint: Option<String>,

    #[serde(default)]
    pub printer_endpoint: Option<String>,

    #[serde(default = "default_baud")]
    pub scanner_baud: u32,

    #[serde(default = "default_baud")]
    pub printer_baud: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            scanner_endpoint: None,
            printer_endpoint: None,
            scanner_baud: DEFAULT_BAUD,
            printer_baud: DEFAULT_BAUD,
        }
    }
}

impl DeviceConfig {
    /// Rejects unsupported baud rates and empty endpoint paths.
    pub fn validate(&self) -> DeviceResult<()> {
        for baud in [self.scanner_baud, self.printer_baud] {
            tally_core::validation::validate_baud(baud)
                .map_err(|e| DeviceError::InvalidConfig(e.to_string()))?;
        }
        for endpoint in [&self.scanner_endpoint, &self.printer_endpoint].into_iter().flatten() {
            if endpoint.trim().is_empty() {
                return Err(DeviceError::InvalidConfig("endpoint path is empty".to_string()));
            }
        }
        if self.scanner_endpoint.is_some() && self.scanner_endpoint == self.printer_endpoint {
            return Err(DeviceError::InvalidConfig(
                "scanner and printer cannot share an endpoint".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> DeviceResult<Self> {
        serde_json::from_str(json).map_err(|e| DeviceError::InvalidConfig(e.to_string()))
    }

    pub fn to_json(&self) -> DeviceResult<String> {
        serde_json::to_string(self).map_err(|e| DeviceError::InvalidConfig(e.to_string()))
    }
}
