//! # Device Commands
//!
//! Endpoint discovery, device configuration and the printer self-test.
//! `test_print` never touches the cart or the sales ledger.

use tally_core::receipt;
use tally_devices::{DeviceConfig, DeviceEndpoint, PrinterChannel};
use tracing::{debug, info};

use crate::checkout::ReceiptSettings;
use crate::error::{CommandResult, Outcome};
use crate::state::{DeviceManager, DeviceStatus};

/// Sends the fixed diagnostic page through the printer channel.
pub async fn test_print(printer: &PrinterChannel, receipt: &ReceiptSettings) -> CommandResult<()> {
    debug!("test_print command");
    let document = receipt::test_page(&receipt.profile, receipt.target);
    printer.submit(&document).await?;
    info!(bytes = document.len(), "Test page printed");
    Ok(())
}

pub fn list_devices(devices: &DeviceManager) -> Vec<DeviceEndpoint> {
    let endpoints = devices.list_endpoints();
    debug!(count = endpoints.len(), "list_devices command");
    endpoints
}

/// Stores the configuration and reconnects both roles.
pub async fn configure_devices(
    devices: &DeviceManager,
    config: DeviceConfig,
) -> CommandResult<Outcome<DeviceStatus>> {
    debug!(?config, "configure_devices command");
    devices.configure(config).await
}

pub async fn device_status(devices: &DeviceManager) -> DeviceStatus {
    devices.status().await
}
