//! # Device Manager
//!
//! Owns both device channels and the persisted device configuration.
//!
//! ## Reconfiguration
//! ```text
//! configure(config)
//!      │
//!      ├── validate (baud rates, paths)      rejected: nothing changes
//!      ├── store.set("device_config", json)  failure: Warning::Persistence
//!      └── for each role:
//!            endpoint set   ──► channel.connect()  (closes old session first)
//!            endpoint unset ──► channel.disconnect()
//! ```
//!
//! A failed open is not a command error: the channel is left `Faulted` with
//! the reason, which the returned status shows.

use serde::Serialize;
use std::sync::Arc;
use tally_db::KeyValueStore;
use tally_devices::{
    DeviceConfig, DeviceEndpoint, DeviceRegistry, PortOpener, PrinterChannel, ScannerChannel, SessionState,
    DEVICE_CONFIG_KEY,
};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::error::{CommandResult, Outcome, Warning};

/// Session state of one role, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleStatus {
    pub endpoint: Option<String>,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub scanner: RoleStatus,
    pub printer: RoleStatus,
}

pub struct DeviceManager {
    scanner: ScannerChannel,
    printer: Arc<PrinterChannel>,
    registry: Arc<dyn DeviceRegistry>,
    store: Arc<dyn KeyValueStore>,
    /// Held for the whole of `configure` so two reconfigurations never mix.
    config: Mutex<DeviceConfig>,
}

impl DeviceManager {
    /// Returns the manager and the receiver scanned barcodes arrive on.
    pub fn new(
        opener: Arc<dyn PortOpener>,
        registry: Arc<dyn DeviceRegistry>,
        store: Arc<dyn KeyValueStore>,
    ) -> (Self, mpsc::Receiver<String>) {
        let (scanner, barcodes) = ScannerChannel::new(opener.clone());
        let manager = DeviceManager {
            scanner,
            printer: Arc::new(PrinterChannel::new(opener)),
            registry,
            store,
            config: Mutex::new(DeviceConfig::default()),
        };
        (manager, barcodes)
    }

    pub fn printer(&self) -> Arc<PrinterChannel> {
        self.printer.clone()
    }

    pub fn list_endpoints(&self) -> Vec<DeviceEndpoint> {
        self.registry.list_endpoints()
    }

    pub async fn config(&self) -> DeviceConfig {
        self.config.lock().await.clone()
    }

    /// Reads the stored configuration and connects what it names. A missing
    /// or unreadable entry falls back to defaults (nothing connected).
    pub async fn load(&self) -> Outcome<DeviceStatus> {
        let mut warnings = Vec::new();
        let config = match self.store.get(DEVICE_CONFIG_KEY).await {
            Ok(Some(json)) => match DeviceConfig::from_json(&json).and_then(|c| c.validate().map(|()| c)) {
                Ok(config) => config,
                Err(e) => {
                    warn!(error = %e, "Stored device configuration ignored");
                    warnings.push(Warning::Persistence(e.to_string()));
                    DeviceConfig::default()
                }
            },
            Ok(None) => {
                debug!("No stored device configuration");
                DeviceConfig::default()
            }
            Err(e) => {
                warn!(error = %e, "Device configuration could not be read");
                warnings.push(Warning::Persistence(e.to_string()));
                DeviceConfig::default()
            }
        };

        let mut current = self.config.lock().await;
        *current = config;
        self.apply(&current).await;
        Outcome::with_warnings(self.status().await, warnings)
    }

    /// Validates, stores and applies a new configuration. Both channels are
    /// reconnected even if their endpoint did not change, which is how the
    /// operator recovers a faulted device.
    pub async fn configure(&self, config: DeviceConfig) -> CommandResult<Outcome<DeviceStatus>> {
        config.validate()?;

        let mut current = self.config.lock().await;
        let mut warnings = Vec::new();
        match config.to_json() {
            Ok(json) => {
                if let Err(e) = self.store.set(DEVICE_CONFIG_KEY, &json).await {
                    warn!(error = %e, "Device configuration not saved");
                    warnings.push(Warning::Persistence(e.to_string()));
                }
            }
            Err(e) => warnings.push(Warning::Persistence(e.to_string())),
        }

        *current = config;
        info!(
            scanner = ?current.scanner_endpoint,
            printer = ?current.printer_endpoint,
            "Device configuration changed"
        );
        self.apply(&current).await;

        Ok(Outcome::with_warnings(self.status().await, warnings))
    }

    pub async fn status(&self) -> DeviceStatus {
        DeviceStatus {
            scanner: RoleStatus {
                endpoint: self.scanner.endpoint().await.map(|e| e.path),
                state: self.scanner.state().await.to_string(),
            },
            printer: RoleStatus {
                endpoint: self.printer.endpoint().await.map(|e| e.path),
                state: self.printer.state().await.to_string(),
            },
        }
    }

    pub async fn printer_state(&self) -> SessionState {
        self.printer.state().await
    }

    pub async fn shutdown(&self) {
        self.scanner.disconnect().await;
        self.printer.disconnect().await;
    }

    async fn apply(&self, config: &DeviceConfig) {
        match &config.scanner_endpoint {
            // Open errors are already recorded in the channel state
            Some(path) => {
                let _ = self
                    .scanner
                    .connect(&self.endpoint_for(path), config.scanner_baud)
                    .await;
            }
            None => self.scanner.disconnect().await,
        }
        match &config.printer_endpoint {
            Some(path) => {
                let _ = self
                    .printer
                    .connect(&self.endpoint_for(path), config.printer_baud)
                    .await;
            }
            None => self.printer.disconnect().await,
        }
    }

    /// The enumerated endpoint for `path` if the registry knows it, so logs
    /// carry the USB identity.
    fn endpoint_for(&self, path: &str) -> DeviceEndpoint {
        self.registry
            .list_endpoints()
            .into_iter()
            .find(|e| e.path == path)
            .unwrap_or_else(|| DeviceEndpoint::from_path(path))
    }
}
