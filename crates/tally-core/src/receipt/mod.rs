//! # Receipt Encoder
//!
//! Pure function from a completed sale to a printer document.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleRecord + StoreProfile                                              │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  layout_sale()  →  Vec<ReceiptLine>   (text, alignment, bold)           │
//! │          │                                                              │
//! │          ├── ReceiptTarget::EscPos  → escpos::render → Raw(bytes)       │
//! │          └── ReceiptTarget::Layout  → LayoutDocument  → Layout(doc)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Receipt Shape (32 columns)
//! ```text
//!           TALLY MART               ← centered, bold
//!             POS-01
//!        Jl. Melati No. 5
//!          0812-555-0100
//! --------------------------------
//! No: 260314-092653-0042
//! Date: 14/03/2026 16:26:53
//! Cashier: Ayu
//! --------------------------------
//! ITEM                               ← bold
//! --------------------------------
//! Teh Botol
//!   2 x 3.500 =              7.000
//! --------------------------------
//! Subtotal                Rp 7.000
//! Discount (only if > 0)
//! Tax      (only if > 0)
//! --------------------------------
//! TOTAL                   Rp 7.770   ← bold
//! --------------------------------
//! Payment                     Cash
//! Tendered               Rp 10.000
//! Change   (only if > 0)
//! --------------------------------
//!     Thank you for shopping!        ← centered
//!                                    ← blank
//! <cut>
//! ```
//!
//! Output is deterministic: the encoder never reads the clock or any
//! other ambient state. Item names are never wrapped.

pub mod escpos;
pub mod layout;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::money::Money;
use crate::types::SaleRecord;

pub use layout::{Align, LayoutDocument, ReceiptLine};

/// Receipt width in characters (58mm paper, font A).
pub const RECEIPT_WIDTH: usize = 32;

// =============================================================================
// Store Profile
// =============================================================================

/// Static store data printed in the receipt header, plus formatting hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreProfile {
    pub name: String,
    pub pos_id: String,
    pub address: String,
    pub phone: String,
    pub footer: String,

    /// Prefix for summary amounts, e.g. `"Rp "`. May be empty.
    pub currency_symbol: String,

    pub thousands_separator: char,

    /// chrono `strftime` pattern for the sale timestamp.
    pub timestamp_format: String,

    /// Local offset from UTC applied to the timestamp.
    pub utc_offset_minutes: i32,
}

impl Default for StoreProfile {
    fn default() -> Self {
        StoreProfile {
            name: "Tally Store".to_string(),
            pos_id: "POS-01".to_string(),
            address: String::new(),
            phone: String::new(),
            footer: "Thank you for shopping!".to_string(),
            currency_symbol: "Rp ".to_string(),
            thousands_separator: '.',
            timestamp_format: "%d/%m/%Y %H:%M:%S".to_string(),
            utc_offset_minutes: 0,
        }
    }
}

impl StoreProfile {
    /// Grouped amount with the currency symbol.
    pub fn money(&self, amount: Money) -> String {
        if amount.is_negative() {
            let positive = Money::from_minor(-amount.minor());
            return format!("-{}{}", self.currency_symbol, positive.format_grouped(self.thousands_separator));
        }
        format!("{}{}", self.currency_symbol, amount.format_grouped(self.thousands_separator))
    }

    /// Formats a timestamp in the store's offset. Falls back to RFC 3339 if
    /// the configured pattern is invalid.
    pub fn timestamp(&self, at: DateTime<Utc>) -> String {
        let offset = FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix());
        let local = at.with_timezone(&offset);

        let mut out = String::new();
        if write!(out, "{}", local.format(&self.timestamp_format)).is_err() {
            return local.to_rfc3339();
        }
        out
    }
}

// =============================================================================
// Output Document
// =============================================================================

/// Which representation the encoder should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptTarget {
    /// Raw command bytes for a line-protocol printer.
    #[default]
    #[serde(rename = "escpos")]
    EscPos,
    /// Structured document for a page-oriented or driver-based printer.
    Layout,
}

/// The encoder's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDocument {
    Raw(Vec<u8>),
    Layout(LayoutDocument),
}

impl OutputDocument {
    /// Bytes to write to a serial printer. A layout document goes out as
    /// plain text with the cut command appended when requested.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            OutputDocument::Raw(bytes) => bytes.clone(),
            OutputDocument::Layout(doc) => {
                let mut out = Vec::new();
                escpos::push_text_lines(&mut out, &doc.to_plain_text());
                if doc.cut {
                    out.extend_from_slice(&escpos::cut());
                }
                out
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OutputDocument::Raw(bytes) => bytes.len(),
            OutputDocument::Layout(doc) => doc.lines.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Encoder
// =============================================================================

/// Encodes a completed sale for `target`.
pub fn encode(sale: &SaleRecord, profile: &StoreProfile, target: ReceiptTarget) -> OutputDocument {
    finish(layout_sale(sale, profile), target)
}

/// Fixed diagnostic page used by the printer test command.
///
/// Exercises alignment, emphasis, the full printable range and the cutter.
pub fn test_page(profile: &StoreProfile, target: ReceiptTarget) -> OutputDocument {
    let lines = vec![
        ReceiptLine::center("PRINTER TEST").bold(),
        ReceiptLine::center(profile.name.as_str()),
        ReceiptLine::center(profile.pos_id.as_str()),
        divider(),
        ReceiptLine::left("ABCDEFGHIJKLMNOPQRSTUVWXYZ"),
        ReceiptLine::left("abcdefghijklmnopqrstuvwxyz"),
        ReceiptLine::left("0123456789 !\"#$%&'()*+,-./:;<=>?"),
        divider(),
        ReceiptLine::left(two_column("Left", "Right")),
        ReceiptLine::left("Bold line").bold(),
        ReceiptLine::center("Centered"),
        divider(),
        ReceiptLine::center("Printer OK"),
        ReceiptLine::blank(),
    ];
    finish(lines, target)
}

fn finish(lines: Vec<ReceiptLine>, target: ReceiptTarget) -> OutputDocument {
    match target {
        ReceiptTarget::EscPos => OutputDocument::Raw(escpos::render(&lines, true)),
        ReceiptTarget::Layout => OutputDocument::Layout(LayoutDocument {
            width: RECEIPT_WIDTH,
            lines,
            cut: true,
        }),
    }
}

/// Builds the styled lines of a sale receipt, in print order.
pub fn layout_sale(sale: &SaleRecord, profile: &StoreProfile) -> Vec<ReceiptLine> {
    let totals = sale.totals();
    let mut lines = Vec::with_capacity(24 + sale.items().len() * 2);

    // Header
    lines.push(ReceiptLine::center(profile.name.as_str()).bold());
    for extra in [&profile.pos_id, &profile.address, &profile.phone] {
        if !extra.is_empty() {
            lines.push(ReceiptLine::center(extra.as_str()));
        }
    }
    lines.push(divider());

    // Sale info
    lines.push(ReceiptLine::left(format!("No: {}", sale.sale_number())));
    lines.push(ReceiptLine::left(format!("Date: {}", profile.timestamp(sale.timestamp()))));
    lines.push(ReceiptLine::left(format!("Cashier: {}", sale.cashier())));

    lines.push(divider());
    lines.push(ReceiptLine::left("ITEM").bold());
    lines.push(divider());

    // Items
    let sep = profile.thousands_separator;
    for item in sale.items() {
        lines.push(ReceiptLine::left(item.display_name.as_str()));
        let left = format!(
            "  {} x {} =",
            item.quantity,
            item.unit_price.format_grouped(sep)
        );
        lines.push(ReceiptLine::left(two_column(
            &left,
            &item.line_total().format_grouped(sep),
        )));
    }

    // Totals
    lines.push(divider());
    lines.push(ReceiptLine::left(two_column("Subtotal", &profile.money(totals.subtotal))));
    if totals.discount.is_positive() {
        lines.push(ReceiptLine::left(two_column(
            "Discount",
            &profile.money(Money::zero() - totals.discount),
        )));
    }
    if totals.tax.is_positive() {
        lines.push(ReceiptLine::left(two_column("Tax", &profile.money(totals.tax))));
    }

    lines.push(divider());
    lines.push(ReceiptLine::left(two_column("TOTAL", &profile.money(totals.total))).bold());

    // Payment
    lines.push(divider());
    lines.push(ReceiptLine::left(two_column("Payment", sale.payment_method().label())));
    lines.push(ReceiptLine::left(two_column(
        "Tendered",
        &profile.money(sale.amount_tendered()),
    )));
    if sale.change().is_positive() {
        lines.push(ReceiptLine::left(two_column("Change", &profile.money(sale.change()))));
    }

    // Footer
    lines.push(divider());
    lines.push(ReceiptLine::center(profile.footer.as_str()));
    lines.push(ReceiptLine::blank());

    lines
}

fn divider() -> ReceiptLine {
    ReceiptLine::left("-".repeat(RECEIPT_WIDTH))
}

/// `left` and `right` on one row, `right` flush with the last column.
/// Overlong rows keep a single space between the two.
fn two_column(left: &str, right: &str) -> String {
    let used = left.chars().count() + right.chars().count();
    let gap = RECEIPT_WIDTH.saturating_sub(used).max(1);
    format!("{}{}{}", left, " ".repeat(gap), right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Cart;
    use crate::money::TaxRate;
    use crate::pricing;
    use crate::types::{NewSale, PaymentMethod, Product};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn profile() -> StoreProfile {
        StoreProfile {
            name: "TALLY MART".to_string(),
            pos_id: "POS-01".to_string(),
            address: "Jl. Melati No. 5".to_string(),
            phone: "0812-555-0100".to_string(),
            footer: "Thank you for shopping!".to_string(),
            currency_symbol: "Rp ".to_string(),
            thousands_separator: '.',
            timestamp_format: "%d/%m/%Y %H:%M:%S".to_string(),
            utc_offset_minutes: 7 * 60,
        }
    }

    fn sale(discount: i64, method: PaymentMethod, tendered: i64) -> SaleRecord {
        let mut cart = Cart::new();
        let teh = Product {
            id: "p-teh".to_string(),
            barcode: "8991002101234".to_string(),
            name: "Teh Botol".to_string(),
            unit_price: Money::from_minor(3_500),
            stock_on_hand: 10,
            sold_by_weight: false,
        };
        cart.add_catalog_item(&teh, None).unwrap();
        cart.add_catalog_item(&teh, None).unwrap();
        cart.add_ad_hoc_item("Kantong", Money::from_minor(1_000)).unwrap();

        let totals = pricing::compute(&cart, TaxRate::from_bps(1100), Money::from_minor(discount)).unwrap();
        let tendered = Money::from_minor(tendered);
        let change = if method.is_cash() { tendered - totals.total } else { Money::zero() };

        SaleRecord::with_ids(
            "sale-1",
            "260314-092653-0042",
            NewSale {
                items: cart.items().to_vec(),
                totals,
                payment_method: method,
                amount_tendered: tendered,
                change,
                cashier: "Ayu".to_string(),
                timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
            },
        )
    }

    fn text_of(doc: &OutputDocument) -> String {
        match doc {
            OutputDocument::Layout(doc) => doc
                .lines
                .iter()
                .map(|l| l.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            OutputDocument::Raw(_) => panic!("expected layout"),
        }
    }

    #[test]
    fn test_layout_content_and_order() {
        let record = sale(500, PaymentMethod::Cash, 10_000);
        let doc = encode(&record, &profile(), ReceiptTarget::Layout);

        let expected = "\
TALLY MART
POS-01
Jl. Melati No. 5
0812-555-0100
--------------------------------
No: 260314-092653-0042
Date: 14/03/2026 16:26:53
Cashier: Ayu
--------------------------------
ITEM
--------------------------------
Teh Botol
  2 x 3.500 =              7.000
Kantong
  1 x 1.000 =              1.000
--------------------------------
Subtotal                Rp 8.000
Discount                 -Rp 500
Tax                       Rp 880
--------------------------------
TOTAL                   Rp 8.380
--------------------------------
Payment                     Cash
Tendered               Rp 10.000
Change                  Rp 1.620
--------------------------------
Thank you for shopping!
";
        assert_eq!(text_of(&doc), expected);
    }

    #[test]
    fn test_conditional_lines_omitted() {
        let record = sale(0, PaymentMethod::Card, 0);
        let text = text_of(&encode(&record, &profile(), ReceiptTarget::Layout));

        assert!(!text.contains("Discount"));
        assert!(!text.contains("Change"));
        assert!(text.contains("Tax"));
    }

    #[test]
    fn test_styles() {
        let record = sale(0, PaymentMethod::Cash, 10_000);
        let lines = layout_sale(&record, &profile());

        assert_eq!(lines[0].align, Align::Center);
        assert!(lines[0].bold);
        assert!(lines.iter().any(|l| l.text == "ITEM" && l.bold));
        assert!(lines.iter().any(|l| l.text.starts_with("TOTAL") && l.bold));
        assert!(lines.iter().filter(|l| l.text.starts_with("  ")).all(|l| l.text.len() == RECEIPT_WIDTH));
    }

    #[test]
    fn test_escpos_framing() {
        let record = sale(0, PaymentMethod::Cash, 10_000);
        let OutputDocument::Raw(bytes) = encode(&record, &profile(), ReceiptTarget::EscPos) else {
            panic!("expected raw bytes");
        };

        assert_eq!(&bytes[..2], &[0x1B, 0x40]);
        assert_eq!(&bytes[bytes.len() - 4..], &[0x1D, 0x56, 0x42, 0x00]);
        // Centered bold header right after init
        assert_eq!(&bytes[2..8], &[0x1B, 0x61, 1, 0x1B, 0x45, 1]);
        assert!(bytes.windows(10).any(|w| w == b"TALLY MART"));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let record = sale(500, PaymentMethod::Cash, 10_000);
        let p = profile();

        let a = encode(&record, &p, ReceiptTarget::EscPos);
        let b = encode(&record, &p, ReceiptTarget::EscPos);
        assert_eq!(a, b);

        let a = encode(&record, &p, ReceiptTarget::Layout);
        let b = encode(&record, &p, ReceiptTarget::Layout);
        assert_eq!(a, b);
    }

    #[test]
    fn test_layout_to_bytes_is_plain_text() {
        let doc = test_page(&profile(), ReceiptTarget::Layout);
        let bytes = doc.to_bytes();

        assert!(bytes.starts_with(b"          PRINTER TEST\n"));
        assert_eq!(&bytes[bytes.len() - 4..], &escpos::cut());
    }

    #[test]
    fn test_test_page_is_fixed() {
        let p = profile();
        assert_eq!(
            test_page(&p, ReceiptTarget::EscPos),
            test_page(&p, ReceiptTarget::EscPos)
        );
    }

    #[test]
    fn test_money_formatting() {
        let p = profile();
        assert_eq!(p.money(Money::from_minor(1_234_567)), "Rp 1.234.567");
        assert_eq!(p.money(Money::from_minor(-500)), "-Rp 500");

        let plain = StoreProfile {
            currency_symbol: String::new(),
            thousands_separator: ',',
            ..p
        };
        assert_eq!(plain.money(Money::from_minor(100_000)), "100,000");
    }

    #[test]
    fn test_timestamp_uses_offset() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 20, 0, 0).unwrap();
        assert_eq!(profile().timestamp(at), "15/03/2026 03:00:00");
    }
}
