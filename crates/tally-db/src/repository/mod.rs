//! # Repository Module
//!
//! SQLite implementations of the store seams.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CartStore / CheckoutController                                         │
//! │       │  Arc<dyn KeyValueStore>, Arc<dyn Catalog>, Arc<dyn SaleSink>    │
//! │       ▼                                                                 │
//! │  KvRepository          kv        (cart_snapshot, held:*, device_config) │
//! │  ProductRepository     products  (barcode lookup, seeding)              │
//! │  SaleLedgerRepository  sales     (append-only, ordered by seq)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Queries are plain runtime `sqlx::query` calls with bound parameters.

pub mod kv;
pub mod product;
pub mod sale;
