//! # Validation Module
//!
//! Input checks applied before anything reaches the cart or the ledger.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Operator console                                              │
//! │  └── Parsing (numbers, weights, payment method names)                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Business rule validation (names, prices, barcodes, tax rates)      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Cart / PriceEngine                                            │
//! │  └── Stock ceilings, discount bounds, payment coverage                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_barcode, validate_quantity};
//!
//! validate_barcode("8991002101234").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_LINE_QUANTITY, MAX_UNIT_PRICE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest barcode payload we accept (Code 128 tops out well below this).
pub const MAX_BARCODE_LEN: usize = 64;

/// Longest display name for a line item.
pub const MAX_LINE_NAME_LEN: usize = 120;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a scanned or typed barcode.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_BARCODE_LEN`] characters
/// - Printable ASCII only, no spaces
///
/// ```rust
/// use tally_core::validation::validate_barcode;
///
/// assert!(validate_barcode("8991002101234").is_ok());
/// assert!(validate_barcode("PLU-0042").is_ok());
/// assert!(validate_barcode("").is_err());
/// assert!(validate_barcode("89 91").is_err());
/// ```
pub fn validate_barcode(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    if code.len() > MAX_BARCODE_LEN {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: MAX_BARCODE_LEN,
        });
    }

    if !code.chars().all(|c| c.is_ascii_graphic()) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only printable ASCII without spaces".to_string(),
        });
    }

    Ok(())
}

/// Validates the name of an ad-hoc line.
pub fn validate_line_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_LINE_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_LINE_NAME_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price.
///
/// ## Rules
/// - Zero is allowed (free items)
/// - Must not be negative or exceed [`MAX_UNIT_PRICE`]
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() || price.minor() > MAX_UNIT_PRICE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_UNIT_PRICE,
        });
    }

    Ok(())
}

/// Validates an amount tendered. Must not be negative.
pub fn validate_tendered(amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustBePositive {
            field: "amount tendered".to_string(),
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate_bps".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

/// Validates a serial baud rate against the standard termios speeds.
pub fn validate_baud(baud: u32) -> ValidationResult<()> {
    const STANDARD: [u32; 8] = [1_200, 2_400, 4_800, 9_600, 19_200, 38_400, 57_600, 115_200];

    if !STANDARD.contains(&baud) {
        return Err(ValidationError::InvalidFormat {
            field: "baud".to_string(),
            reason: format!("{} is not one of {:?}", baud, STANDARD),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
