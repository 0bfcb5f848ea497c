//! # tally-core: Pure Business Logic for Tally POS
//!
//! This crate is the transaction core of the terminal. Everything here is a
//! pure function or plain data: no database, no serial ports, no async.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/terminal (operator commands)               │   │
//! │  │    scan ──► CartStore ──► CheckoutController ──► PrinterChannel │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  money   │ │   cart   │ │ pricing  │ │     receipt      │  │   │
//! │  │   │  Money   │ │   Cart   │ │  Totals  │ │ ESC/POS + layout │  │   │
//! │  │   │  Weight  │ │ LineItem │ │ compute  │ │    encoder       │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO DEVICES • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, SaleRecord, PaymentMethod, ...)
//! - [`money`] - Money, TaxRate and Weight with integer arithmetic
//! - [`cart`] - Line items and the in-memory cart
//! - [`pricing`] - The price engine (subtotal, tax, discount, total)
//! - [`receipt`] - Sale record to printer document encoder
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::cart::Cart;
//! use tally_core::money::{Money, TaxRate};
//! use tally_core::pricing;
//!
//! let mut cart = Cart::new();
//! cart.add_ad_hoc_item("Gift wrap", Money::from_minor(10_000)).unwrap();
//!
//! let totals = pricing::compute(&cart, TaxRate::from_bps(1100), Money::zero()).unwrap();
//! assert_eq!(totals.tax.minor(), 1_100);
//! assert_eq!(totals.total.minor(), 11_100);
//! ```

pub mod cart;
pub mod error;
pub mod money;
pub mod pricing;
pub mod receipt;
pub mod types;
pub mod validation;

pub use cart::{Cart, LineItem, LineKind};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, TaxRate, Weight};
pub use pricing::Totals;
pub use types::*;

/// Maximum lines allowed in a single cart.
pub const MAX_CART_LINES: usize = 200;

/// Maximum quantity on a single line.
///
/// Guards against a mistyped quantity (1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Highest unit price a line may carry, in minor units.
///
/// A full cart of maxed-out lines at this price, with 100% tax, still fits
/// in an `i64`.
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000_000;
