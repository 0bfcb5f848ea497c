//! # Price Engine
//!
//! Pure computation of the cart totals. Called after every cart mutation so
//! the figures shown to the operator always match the cart contents.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines ──► subtotal = Σ(unit_price × quantity)        exact, no rounding│
//! │                │                                                        │
//! │                ▼                                                        │
//! │            tax = round_half_up(subtotal × rate)        rounded ONCE     │
//! │                │                                                        │
//! │                ▼                                                        │
//! │            0 <= discount <= subtotal + tax             else InvalidDiscount
//! │                │                                                        │
//! │                ▼                                                        │
//! │            total = subtotal + tax − discount                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Totals are derived, never stored next to the cart they came from. A
//! [`crate::types::SaleRecord`] freezes a copy at checkout.

use serde::{Deserialize, Serialize};

use crate::cart::{Cart, LineItem};
use crate::error::{CoreError, CoreResult};
use crate::money::{Money, TaxRate};

/// Derived cart totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

impl Totals {
    /// Upper bound for a discount on these totals.
    pub fn max_discount(&self) -> Money {
        self.subtotal + self.tax
    }
}

/// Computes the totals of `cart` with an explicit discount.
///
/// Deterministic: unchanged inputs give identical output.
pub fn compute(cart: &Cart, tax_rate: TaxRate, discount: Money) -> CoreResult<Totals> {
    compute_lines(cart.items(), tax_rate, discount)
}

/// Computes the totals of `cart` with the discount the cart carries.
pub fn compute_for(cart: &Cart, tax_rate: TaxRate) -> CoreResult<Totals> {
    compute_lines(cart.items(), tax_rate, cart.discount())
}

/// Computes totals over a slice of lines.
pub fn compute_lines(lines: &[LineItem], tax_rate: TaxRate, discount: Money) -> CoreResult<Totals> {
    let subtotal: Money = lines.iter().map(LineItem::line_total).sum();
    let tax = subtotal.calculate_tax(tax_rate);
    let max = subtotal + tax;

    if discount.is_negative() || discount > max {
        return Err(CoreError::InvalidDiscount { discount, max });
    }

    Ok(Totals {
        subtotal,
        tax,
        discount,
        total: max - discount,
    })
}
