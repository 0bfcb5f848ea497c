//! # tally-devices: Serial Peripherals for Tally POS
//!
//! Barcode scanner input and receipt printer output over serial lines
//! (USB-serial bridges, CDC-ACM, on-board UARTs, Bluetooth SPP).
//!
//! ## Architecture
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         tally-devices                                │
//! │                                                                      │
//! │  DeviceRegistry ──► DeviceEndpoint list (enumeration only)           │
//! │                                                                      │
//! │  DeviceConfig ──┬─► ScannerChannel ── reader task ── BarcodeFramer   │
//! │                 │        │                                           │
//! │                 │        └──► mpsc<String> barcodes ──► terminal     │
//! │                 │                                                    │
//! │                 └─► PrinterChannel ── worker task ◄── submit(doc)    │
//! │                                                                      │
//! │  PortOpener ──► TtyOpener (termios raw mode) / test doubles          │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each role has at most one live session. Sessions are never retried
//! automatically: a failed open or a dropped line leaves the channel
//! `Faulted` until the configuration is written again.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod framer;
pub mod port;
pub mod printer;
pub mod registry;
pub mod scanner;

/// Scripted port opener for tests in this and dependent crates.
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::{DeviceConfig, DEFAULT_BAUD, DEVICE_CONFIG_KEY};
pub use endpoint::{DeviceEndpoint, DeviceRole, SessionState};
pub use error::{DeviceError, DeviceResult};
pub use framer::BarcodeFramer;
pub use port::{PortOpener, SerialPort, TtyOpener};
pub use printer::PrinterChannel;
pub use registry::{DeviceRegistry, StaticRegistry, SysfsRegistry};
pub use scanner::ScannerChannel;
