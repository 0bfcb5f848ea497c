//! # State Module
//!
//! Long-lived state owned by the terminal context.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────────┐     │
//! │  │   CartStore      │ │  DeviceManager   │ │   TerminalConfig     │     │
//! │  │                  │ │                  │ │                      │     │
//! │  │  Mutex<Cart>     │ │  ScannerChannel  │ │  store profile       │     │
//! │  │  snapshot → KV   │ │  PrinterChannel  │ │  tax rate, cashier   │     │
//! │  │  held carts      │ │  device_config   │ │  db path, target     │     │
//! │  └──────────────────┘ └──────────────────┘ └──────────────────────┘     │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • CartStore: one async mutex is the cart's only critical section      │
//! │  • DeviceManager: channels own their sessions; config behind a mutex   │
//! │  • TerminalConfig: read-only after startup                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;
mod config;
mod devices;

pub use cart::{CartStore, CartView, CART_SNAPSHOT_KEY, HELD_PREFIX};
pub use config::{ConfigError, TerminalConfig};
pub use devices::{DeviceManager, DeviceStatus, RoleStatus};
