//! # Terminal Context
//!
//! One owned object holding everything a running terminal needs. There are
//! no globals: the binary builds a `Terminal` from real collaborators, tests
//! build one from the in-memory doubles.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Services { store, catalog, ledger, opener, registry }                  │
//! │                          │                                              │
//! │                          ▼                                              │
//! │  Terminal ─┬─ CartStore ◄──────────── scan forwarder ◄── barcodes rx   │
//! │            ├─ CheckoutController ──► SaleSink, PrinterChannel           │
//! │            └─ DeviceManager ───────► ScannerChannel, PrinterChannel     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tally_db::{Catalog, KeyValueStore, SaleSink};
use tally_devices::{DeviceRegistry, PortOpener};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::checkout::{CheckoutController, ReceiptSettings};
use crate::commands;
use crate::error::{CommandResult, Outcome, Warning};
use crate::state::{CartStore, CartView, DeviceManager, TerminalConfig};

/// External collaborators the terminal is built from.
pub struct Services {
    pub store: Arc<dyn KeyValueStore>,
    pub catalog: Arc<dyn Catalog>,
    pub ledger: Arc<dyn SaleSink>,
    pub opener: Arc<dyn PortOpener>,
    pub registry: Arc<dyn DeviceRegistry>,
}

pub struct Terminal {
    config: TerminalConfig,
    receipt: ReceiptSettings,
    cart: Arc<CartStore>,
    catalog: Arc<dyn Catalog>,
    checkout: CheckoutController,
    devices: DeviceManager,
}

impl Terminal {
    /// Wires the context together. Nothing is opened or read until
    /// [`Terminal::start`]. The receiver yields scanned barcodes.
    pub fn new(config: TerminalConfig, services: Services) -> (Self, mpsc::Receiver<String>) {
        let cart = Arc::new(CartStore::new(services.store.clone(), config.tax_rate()));
        let (devices, barcodes) = DeviceManager::new(services.opener, services.registry, services.store);
        let receipt = ReceiptSettings {
            profile: config.store.clone(),
            target: config.receipt_target,
            cashier: config.cashier.clone(),
        };
        let checkout = CheckoutController::new(
            cart.clone(),
            services.ledger,
            devices.printer(),
            receipt.clone(),
        );

        let terminal = Terminal {
            config,
            receipt,
            cart,
            catalog: services.catalog,
            checkout,
            devices,
        };
        (terminal, barcodes)
    }

    /// Restores the cart snapshot and connects the configured devices.
    pub async fn start(&self) -> Vec<Warning> {
        let cart = self.cart.restore().await;
        info!(lines = cart.value.items.len(), "Cart restored");

        let devices = self.devices.load().await;
        info!(
            scanner = %devices.value.scanner.state,
            printer = %devices.value.printer.state,
            "Devices loaded"
        );

        cart.warnings.into_iter().chain(devices.warnings).collect()
    }

    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    pub fn receipt(&self) -> &ReceiptSettings {
        &self.receipt
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn checkout(&self) -> &CheckoutController {
        &self.checkout
    }

    pub fn devices(&self) -> &DeviceManager {
        &self.devices
    }

    /// A barcode from the scanner. Scanner input never carries a weight.
    pub async fn on_barcode(&self, code: &str) -> CommandResult<Outcome<CartView>> {
        commands::cart::scan_barcode(&self.cart, self.catalog.as_ref(), code, None).await
    }

    pub async fn shutdown(&self) {
        self.devices.shutdown().await;
        info!("Terminal stopped");
    }
}

/// Feeds scanner barcodes into the cart until the channel closes.
///
/// A failed scan is logged and skipped; the scanner keeps going.
pub fn spawn_scan_forwarder(terminal: Arc<Terminal>, mut barcodes: mpsc::Receiver<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(code) = barcodes.recv().await {
            match terminal.on_barcode(&code).await {
                Ok(outcome) => {
                    for warning in &outcome.warnings {
                        warn!(barcode = %code, %warning, "Scan applied with warning");
                    }
                    info!(
                        barcode = %code,
                        lines = outcome.value.items.len(),
                        total = %outcome.value.totals.total,
                        "Scan added"
                    );
                }
                Err(e) => warn!(barcode = %code, error = %e, "Scan rejected"),
            }
        }
    })
}
