//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Cart, pricing and payment rule violations      │
//! │  └── ValidationError  - Malformed operator input                       │
//! │                                                                         │
//! │  tally-db errors       └── DbError      - Persistence failures         │
//! │  tally-devices errors  └── DeviceError  - Serial open/write failures   │
//! │  terminal app          └── CommandError - What the operator sees       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CommandError → Operator           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `CoreError` is recovered at the call boundary: the operation that
//! produced it did not change the cart.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Cart, pricing and payment errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Line index does not exist in the cart.
    #[error("No cart line at index {index} (cart has {len} lines)")]
    InvalidIndex { index: usize, len: usize },

    /// Quantity must be at least one.
    #[error("Invalid quantity {0}: must be at least 1")]
    InvalidQuantity(i64),

    /// Adding or setting the quantity would exceed the stock on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// Scan "Teh Botol" (stock 3, already 3 in cart)
    ///      │
    ///      ▼
    /// OutOfStock { name: "Teh Botol", ceiling: 3, requested: 4 }
    ///      │
    ///      ▼
    /// Operator sees: "Only 3 Teh Botol in stock"
    /// ```
    #[error("Out of stock for {name}: {ceiling} available, {requested} requested")]
    OutOfStock {
        name: String,
        ceiling: i64,
        requested: i64,
    },

    /// Product is sold by weight but no positive weight was supplied.
    #[error("{0} is sold by weight: a positive weight is required")]
    WeightRequired(String),

    /// Discount is negative or larger than subtotal plus tax.
    #[error("Invalid discount {discount}: must be between 0 and {max}")]
    InvalidDiscount { discount: Money, max: Money },

    /// Cash tendered does not cover the total.
    #[error("Insufficient payment: {tendered} tendered, {total} due")]
    InsufficientPayment { tendered: Money, total: Money },

    /// Checkout attempted on an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has reached its line limit.
    #[error("Cart cannot have more than {max} lines")]
    CartFull { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true for stock-ceiling violations (reported separately from
    /// plain validation failures).
    pub fn is_stock_error(&self) -> bool {
        matches!(self, CoreError::OutOfStock { .. })
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. unparseable weight).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
