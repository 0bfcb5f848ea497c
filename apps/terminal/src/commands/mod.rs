//! # Operator Commands
//!
//! Every action the operator can take, independent of how it is typed or
//! clicked.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── cart.rs     ◄─── scan, add, quantity, remove, clear, hold/recall
//! ├── sale.rs     ◄─── checkout
//! └── device.rs   ◄─── endpoints, configuration, test print
//! ```
//!
//! ## State Injection
//! Each command takes only the state it needs:
//! ```rust,ignore
//! // Only needs the cart
//! async fn clear_cart(cart: &CartStore)
//!
//! // Needs the cart and the catalog
//! async fn scan_barcode(cart: &CartStore, catalog: &dyn Catalog, code: &str, ..)
//!
//! // Only needs the printer
//! async fn test_print(printer: &PrinterChannel, receipt: &ReceiptSettings)
//! ```

pub mod cart;
pub mod device;
pub mod sale;
