//! # Domain Types
//!
//! Core domain types shared by every Tally POS crate.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    LineItem     │   │   SaleRecord    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id, barcode    │──►│  id, name       │──►│  sale_id        │       │
//! │  │  unit_price     │   │  unit_price     │   │  items snapshot │       │
//! │  │  stock_on_hand  │   │  quantity       │   │  totals         │       │
//! │  │  sold_by_weight │   │  stock_ceiling  │   │  payment        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │   (external, read-only)  (cart.rs)             (immutable)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! A sale has a `sale_id` (UUID v4, for storage) and a `sale_number`
//! (`YYMMDD-HHMMSS-NNNN`, printed on the receipt).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::cart::LineItem;
use crate::error::ValidationError;
use crate::money::Money;
use crate::pricing::Totals;

// =============================================================================
// Product
// =============================================================================

/// A catalog product, as returned by the catalog lookup.
///
/// The core never mutates products; it only snapshots them into line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog identifier.
    pub id: String,

    /// Barcode (EAN-13, UPC-A, internal PLU, ...).
    pub barcode: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Price in minor units. For weighed products this is the price per kg.
    pub unit_price: Money,

    /// Units currently on hand; the ceiling for catalog-backed lines.
    pub stock_on_hand: i64,

    /// Priced per kilogram from a scale reading.
    pub sold_by_weight: bool,
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; requires an amount tendered that covers the total.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Bank or QR transfer.
    Transfer,
}

impl PaymentMethod {
    pub fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }

    /// Label printed on the receipt.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::Transfer => "Transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "transfer" | "qr" | "qris" => Ok(PaymentMethod::Transfer),
            other => Err(ValidationError::InvalidFormat {
                field: "payment method".to_string(),
                reason: format!("unknown method '{}' (cash, card, transfer)", other),
            }),
        }
    }
}

// =============================================================================
// Sale Record
// =============================================================================

/// A completed sale.
///
/// Immutable once created: fields are private and only readable through
/// accessors. Created by the checkout controller after payment validation and
/// appended to the sales ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    sale_id: String,
    sale_number: String,
    items: Vec<LineItem>,
    totals: Totals,
    payment_method: PaymentMethod,
    amount_tendered: Money,
    change: Money,
    cashier: String,
    timestamp: DateTime<Utc>,
}

/// Everything needed to freeze a sale. Consumed by [`SaleRecord::new`].
#[derive(Debug, Clone)]
pub struct NewSale {
    pub items: Vec<LineItem>,
    pub totals: Totals,
    pub payment_method: PaymentMethod,
    pub amount_tendered: Money,
    pub change: Money,
    pub cashier: String,
    pub timestamp: DateTime<Utc>,
}

impl SaleRecord {
    /// Freezes a sale with a fresh UUID and a sale number derived from the
    /// timestamp.
    pub fn new(sale: NewSale) -> Self {
        let sale_id = Uuid::new_v4();
        let sale_number = sale_number(sale.timestamp, &sale_id);
        SaleRecord {
            sale_id: sale_id.to_string(),
            sale_number,
            items: sale.items,
            totals: sale.totals,
            payment_method: sale.payment_method,
            amount_tendered: sale.amount_tendered,
            change: sale.change,
            cashier: sale.cashier,
            timestamp: sale.timestamp,
        }
    }

    /// Rebuilds a record with known identifiers (ledger reads, fixtures).
    pub fn with_ids(sale_id: impl Into<String>, sale_number: impl Into<String>, sale: NewSale) -> Self {
        SaleRecord {
            sale_id: sale_id.into(),
            sale_number: sale_number.into(),
            items: sale.items,
            totals: sale.totals,
            payment_method: sale.payment_method,
            amount_tendered: sale.amount_tendered,
            change: sale.change,
            cashier: sale.cashier,
            timestamp: sale.timestamp,
        }
    }

    pub fn sale_id(&self) -> &str {
        &self.sale_id
    }

    pub fn sale_number(&self) -> &str {
        &self.sale_number
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn amount_tendered(&self) -> Money {
        self.amount_tendered
    }

    pub fn change(&self) -> Money {
        self.change
    }

    pub fn cashier(&self) -> &str {
        &self.cashier
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// `YYMMDD-HHMMSS-NNNN`, the suffix taken from the sale UUID.
fn sale_number(timestamp: DateTime<Utc>, sale_id: &Uuid) -> String {
    let suffix = (sale_id.as_u128() % 10_000) as u16;
    format!("{}-{:04}", timestamp.format("%y%m%d-%H%M%S"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_sale() -> NewSale {
        NewSale {
            items: Vec::new(),
            totals: Totals::default(),
            payment_method: PaymentMethod::Cash,
            amount_tendered: Money::zero(),
            change: Money::zero(),
            cashier: "Ayu".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
        }
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("Debit".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert_eq!("qris".parse::<PaymentMethod>().unwrap(), PaymentMethod::Transfer);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_sale_number_format() {
        let record = SaleRecord::new(new_sale());
        assert!(record.sale_number().starts_with("260314-092653-"));
        assert_eq!(record.sale_number().len(), "260314-092653-0000".len());
        assert!(Uuid::parse_str(record.sale_id()).is_ok());
    }

    #[test]
    fn test_sale_ids_are_unique() {
        let a = SaleRecord::new(new_sale());
        let b = SaleRecord::new(new_sale());
        assert_ne!(a.sale_id(), b.sale_id());
    }

    #[test]
    fn test_sale_record_serde_round_trip() {
        let record = SaleRecord::with_ids("sale-1", "260314-092653-0001", new_sale());
        let json = serde_json::to_string(&record).unwrap();
        let back: SaleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert!(json.contains("\"payment_method\":\"cash\""));
    }
}
