//! # Cart
//!
//! The in-memory transaction: ordered line items, a selection and a flat
//! discount. Pure data plus the rules for mutating it; persistence and
//! locking live in the terminal's `CartStore`.
//!
//! ## Line Kinds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Catalog   id = product id    scan again → quantity + 1                 │
//! │            stock_ceiling = Some(stock_on_hand)                          │
//! │                                                                         │
//! │  Weighed   id = synthetic     always a new line, quantity = 1           │
//! │            unit_price = price/kg × weight, name embeds the weight       │
//! │            stock_ceiling = None (no stock check)                        │
//! │                                                                         │
//! │  AdHoc     id = synthetic     same name + price → quantity + 1          │
//! │            stock_ceiling = None                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - `quantity >= 1` on every line
//! - `quantity <= stock_ceiling` when a ceiling is present
//! - Insertion order is display order
//! - A failed operation leaves the cart untouched

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, TaxRate, Weight};
use crate::pricing::{self, Totals};
use crate::types::Product;
use crate::validation::{validate_line_name, validate_price};
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

// =============================================================================
// Line Item
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Catalog,
    Weighed,
    AdHoc,
}

/// One row of the cart.
///
/// Product data is frozen at the moment the line is created: a catalog
/// price change does not reach an open cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product id for catalog lines, synthetic for weighed and ad-hoc lines.
    pub id: String,

    pub kind: LineKind,

    pub display_name: String,

    /// Effective unit price in minor units.
    pub unit_price: Money,

    pub quantity: i64,

    /// Stock available when the line was last touched. `None` waives the
    /// stock check.
    pub stock_ceiling: Option<i64>,
}

impl LineItem {
    /// unit_price × quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    pub fn is_catalog_backed(&self) -> bool {
        self.kind == LineKind::Catalog
    }

    fn check_quantity(&self, requested: i64) -> CoreResult<()> {
        if requested > MAX_LINE_QUANTITY {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: MAX_LINE_QUANTITY,
            }
            .into());
        }
        match self.stock_ceiling {
            Some(ceiling) if requested > ceiling => Err(CoreError::OutOfStock {
                name: self.display_name.clone(),
                ceiling,
                requested,
            }),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<LineItem>,

    selected_index: Option<usize>,

    /// Flat discount applied at checkout. Kept within `subtotal + tax`.
    #[serde(default)]
    discount: Money,

    /// When the cart was created or last cleared.
    created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            selected_index: None,
            discount: Money::zero(),
            created_at: Utc::now(),
        }
    }

    /// Adds a catalog product and returns the id of the affected line.
    ///
    /// ## Behavior
    /// - Sold by weight: requires a positive `weight`, always appends a new
    ///   line priced `unit_price × weight` with quantity 1.
    /// - Otherwise: increments the existing line for this product, or
    ///   appends one with quantity 1. Fails with `OutOfStock` when the new
    ///   quantity would exceed `stock_on_hand`.
    pub fn add_catalog_item(&mut self, product: &Product, weight: Option<Weight>) -> CoreResult<String> {
        validate_price("unit price", product.unit_price)?;

        if product.sold_by_weight {
            let weight = weight
                .filter(|w| !w.is_zero())
                .ok_or_else(|| CoreError::WeightRequired(product.name.clone()))?;
            let price = product.unit_price.multiply_weight(weight);
            validate_price("weighed price", price)?;
            self.ensure_room()?;

            let line = LineItem {
                id: format!("{}@{}", product.id, Uuid::new_v4()),
                kind: LineKind::Weighed,
                display_name: format!("{} ({})", product.name, weight),
                unit_price: price,
                quantity: 1,
                stock_ceiling: None,
            };
            let id = line.id.clone();
            self.items.push(line);
            return Ok(id);
        }

        if let Some(line) = self
            .items
            .iter_mut()
            .find(|l| l.kind == LineKind::Catalog && l.id == product.id)
        {
            let requested = line.quantity + 1;
            let mut candidate = line.clone();
            candidate.stock_ceiling = Some(product.stock_on_hand);
            candidate.check_quantity(requested)?;

            line.stock_ceiling = Some(product.stock_on_hand);
            line.quantity = requested;
            return Ok(line.id.clone());
        }

        let line = LineItem {
            id: product.id.clone(),
            kind: LineKind::Catalog,
            display_name: product.name.clone(),
            unit_price: product.unit_price,
            quantity: 1,
            stock_ceiling: Some(product.stock_on_hand),
        };
        line.check_quantity(1)?;
        self.ensure_room()?;

        self.items.push(line);
        Ok(product.id.clone())
    }

    /// Adds a manually priced line, or increments an identical ad-hoc line.
    pub fn add_ad_hoc_item(&mut self, name: &str, price: Money) -> CoreResult<String> {
        let name = name.trim();
        validate_line_name(name)?;
        validate_price("price", price)?;

        if let Some(line) = self
            .items
            .iter_mut()
            .find(|l| l.kind == LineKind::AdHoc && l.display_name == name && l.unit_price == price)
        {
            line.check_quantity(line.quantity + 1)?;
            line.quantity += 1;
            return Ok(line.id.clone());
        }

        self.ensure_room()?;
        let id = format!("adhoc-{}", Uuid::new_v4());
        self.items.push(LineItem {
            id: id.clone(),
            kind: LineKind::AdHoc,
            display_name: name.to_string(),
            unit_price: price,
            quantity: 1,
            stock_ceiling: None,
        });
        Ok(id)
    }

    /// Sets the quantity of the line at `index`.
    pub fn set_quantity(&mut self, index: usize, quantity: i64) -> CoreResult<()> {
        let len = self.items.len();
        let line = self
            .items
            .get_mut(index)
            .ok_or(CoreError::InvalidIndex { index, len })?;

        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity(quantity));
        }
        line.check_quantity(quantity)?;

        line.quantity = quantity;
        Ok(())
    }

    /// Removes and returns the line at `index`. The selection follows the
    /// line it pointed at, or is cleared if that line was removed.
    pub fn remove_item(&mut self, index: usize) -> CoreResult<LineItem> {
        let len = self.items.len();
        if index >= len {
            return Err(CoreError::InvalidIndex { index, len });
        }

        let removed = self.items.remove(index);
        self.selected_index = match self.selected_index {
            Some(sel) if sel == index => None,
            Some(sel) if sel > index => Some(sel - 1),
            other => other,
        };
        Ok(removed)
    }

    /// Empties the cart, resets the selection and the discount.
    pub fn clear(&mut self) {
        self.items.clear();
        self.selected_index = None;
        self.discount = Money::zero();
        self.created_at = Utc::now();
    }

    pub fn select(&mut self, index: usize) -> CoreResult<()> {
        if index >= self.items.len() {
            return Err(CoreError::InvalidIndex {
                index,
                len: self.items.len(),
            });
        }
        self.selected_index = Some(index);
        Ok(())
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn selected(&self) -> Option<&LineItem> {
        self.selected_index.and_then(|i| self.items.get(i))
    }

    /// Sets the flat discount after checking it against the price engine.
    pub fn set_discount(&mut self, discount: Money, tax_rate: TaxRate) -> CoreResult<Totals> {
        let totals = pricing::compute_lines(&self.items, tax_rate, discount)?;
        self.discount = discount;
        Ok(totals)
    }

    pub fn discount(&self) -> Money {
        self.discount
    }

    /// Lowers the discount to `subtotal + tax` if item changes shrank the
    /// cart below it. Returns true when the discount changed.
    pub fn clamp_discount(&mut self, tax_rate: TaxRate) -> bool {
        let subtotal = self.subtotal();
        let max = subtotal + subtotal.calculate_tax(tax_rate);
        if self.discount > max {
            self.discount = max;
            return true;
        }
        false
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|l| l.quantity).sum()
    }

    /// Σ(unit_price × quantity), exact.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Re-checks the line rules on a cart that did not come from these
    /// operations, such as a deserialized snapshot.
    pub fn check_invariants(&self) -> CoreResult<()> {
        if self.items.len() > MAX_CART_LINES {
            return Err(CoreError::CartFull {
                max: MAX_CART_LINES,
            });
        }
        for line in &self.items {
            validate_line_name(&line.display_name)?;
            validate_price("unit price", line.unit_price)?;
            if line.quantity <= 0 {
                return Err(CoreError::InvalidQuantity(line.quantity));
            }
            line.check_quantity(line.quantity)?;
        }
        if let Some(index) = self.selected_index {
            if index >= self.items.len() {
                return Err(CoreError::InvalidIndex {
                    index,
                    len: self.items.len(),
                });
            }
        }
        Ok(())
    }

    fn ensure_room(&self) -> CoreResult<()> {
        if self.items.len() >= MAX_CART_LINES {
            return Err(CoreError::CartFull {
                max: MAX_CART_LINES,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_UNIT_PRICE;

    fn product(id: &str, price: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            barcode: format!("899{}", id),
            name: format!("Product {}", id),
            unit_price: Money::from_minor(price),
            stock_on_hand: stock,
            sold_by_weight: false,
        }
    }

    fn weighed(id: &str, price_per_kg: i64) -> Product {
        Product {
            sold_by_weight: true,
            name: "Apel Fuji".to_string(),
            ..product(id, price_per_kg, 0)
        }
    }

    #[test]
    fn test_add_same_product_increments() {
        let mut cart = Cart::new();
        let p = product("1", 3_500, 10);

        let first = cart.add_catalog_item(&p, None).unwrap();
        let second = cart.add_catalog_item(&p, None).unwrap();

        assert_eq!(first, "1");
        assert_eq!(first, second);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.subtotal().minor(), 7_000);
    }

    #[test]
    fn test_add_beyond_stock_fails_without_change() {
        let mut cart = Cart::new();
        let p = product("1", 3_500, 2);

        cart.add_catalog_item(&p, None).unwrap();
        cart.add_catalog_item(&p, None).unwrap();
        let before = cart.clone();

        let err = cart.add_catalog_item(&p, None).unwrap_err();
        assert!(matches!(err, CoreError::OutOfStock { ceiling: 2, requested: 3, .. }));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_add_product_with_no_stock_fails() {
        let mut cart = Cart::new();
        let err = cart.add_catalog_item(&product("1", 3_500, 0), None).unwrap_err();
        assert!(err.is_stock_error());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_weighed_product_line() {
        let mut cart = Cart::new();
        let p = weighed("7", 12_000);

        cart.add_catalog_item(&p, Some(Weight::from_grams(500))).unwrap();

        let line = &cart.items()[0];
        assert_eq!(line.unit_price.minor(), 6_000);
        assert_eq!(line.quantity, 1);
        assert_eq!(line.display_name, "Apel Fuji (0.5 kg)");
        assert_eq!(line.kind, LineKind::Weighed);
        assert_ne!(line.id, p.id);
        assert_eq!(line.stock_ceiling, None);
    }

    #[test]
    fn test_weighed_product_always_new_line() {
        let mut cart = Cart::new();
        let p = weighed("7", 12_000);

        let a = cart.add_catalog_item(&p, Some(Weight::from_grams(500))).unwrap();
        let b = cart.add_catalog_item(&p, Some(Weight::from_grams(500))).unwrap();

        assert_ne!(a, b);
        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn test_weighed_product_requires_weight() {
        let mut cart = Cart::new();
        let p = weighed("7", 12_000);

        assert!(matches!(
            cart.add_catalog_item(&p, None),
            Err(CoreError::WeightRequired(_))
        ));
        assert!(matches!(
            cart.add_catalog_item(&p, Some(Weight::from_grams(0))),
            Err(CoreError::WeightRequired(_))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_ad_hoc_items_merge_on_name_and_price() {
        let mut cart = Cart::new();

        let a = cart.add_ad_hoc_item("Kantong plastik", Money::from_minor(200)).unwrap();
        let b = cart.add_ad_hoc_item("Kantong plastik", Money::from_minor(200)).unwrap();
        let c = cart.add_ad_hoc_item("Kantong plastik", Money::from_minor(500)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn test_ad_hoc_rejects_bad_input() {
        let mut cart = Cart::new();
        assert!(cart.add_ad_hoc_item("  ", Money::from_minor(100)).is_err());
        assert!(cart.add_ad_hoc_item("Bag", Money::from_minor(-1)).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_price_cap_keeps_totals_in_range() {
        let mut cart = Cart::new();
        assert!(matches!(
            cart.add_ad_hoc_item("Big", Money::from_minor(i64::MAX / 2 + 1)),
            Err(CoreError::Validation(_))
        ));
        assert!(cart.is_empty());

        // The largest accepted price at the largest quantity still sums
        cart.add_ad_hoc_item("Big", Money::from_minor(MAX_UNIT_PRICE)).unwrap();
        cart.set_quantity(0, MAX_LINE_QUANTITY).unwrap();
        let totals = crate::pricing::compute_for(&cart, TaxRate::from_bps(10_000)).unwrap();
        assert_eq!(totals.subtotal.minor(), MAX_UNIT_PRICE * MAX_LINE_QUANTITY);
        assert_eq!(totals.tax, totals.subtotal);
    }

    #[test]
    fn test_weighed_price_over_cap_rejected() {
        let mut cart = Cart::new();
        let heavy = weighed("w", MAX_UNIT_PRICE);
        let err = cart
            .add_catalog_item(&heavy, Some(Weight::from_grams(2_000)))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_rules() {
        let mut cart = Cart::new();
        cart.add_catalog_item(&product("1", 1_000, 5), None).unwrap();
        cart.add_ad_hoc_item("Service", Money::from_minor(2_000)).unwrap();

        assert!(matches!(
            cart.set_quantity(2, 1),
            Err(CoreError::InvalidIndex { index: 2, len: 2 })
        ));
        assert!(matches!(cart.set_quantity(0, 0), Err(CoreError::InvalidQuantity(0))));
        assert!(matches!(cart.set_quantity(0, -3), Err(CoreError::InvalidQuantity(-3))));
        assert!(matches!(cart.set_quantity(0, 6), Err(CoreError::OutOfStock { .. })));

        cart.set_quantity(0, 5).unwrap();
        // Ad-hoc lines have no stock ceiling
        cart.set_quantity(1, 40).unwrap();

        assert_eq!(cart.subtotal().minor(), 5 * 1_000 + 40 * 2_000);
    }

    #[test]
    fn test_subtotal_is_exact_across_operations() {
        let mut cart = Cart::new();
        let a = product("a", 1_999, 100);
        let b = product("b", 333, 100);

        let mut expected = 0i64;
        for _ in 0..50 {
            cart.add_catalog_item(&a, None).unwrap();
            expected += 1_999;
            assert_eq!(cart.subtotal().minor(), expected);

            cart.add_catalog_item(&b, None).unwrap();
            expected += 333;
            assert_eq!(cart.subtotal().minor(), expected);
        }

        cart.set_quantity(0, 7).unwrap();
        assert_eq!(cart.subtotal().minor(), 7 * 1_999 + 50 * 333);
    }

    #[test]
    fn test_remove_adjusts_selection() {
        let mut cart = Cart::new();
        for name in ["a", "b", "c"] {
            cart.add_ad_hoc_item(name, Money::from_minor(100)).unwrap();
        }

        cart.select(2).unwrap();
        cart.remove_item(0).unwrap();
        assert_eq!(cart.selected_index(), Some(1));
        assert_eq!(cart.selected().unwrap().display_name, "c");

        cart.remove_item(1).unwrap();
        assert_eq!(cart.selected_index(), None);

        assert!(matches!(cart.remove_item(5), Err(CoreError::InvalidIndex { .. })));
    }

    #[test]
    fn test_clear_resets_selection_and_discount() {
        let mut cart = Cart::new();
        cart.add_ad_hoc_item("a", Money::from_minor(10_000)).unwrap();
        cart.select(0).unwrap();
        cart.set_discount(Money::from_minor(500), TaxRate::zero()).unwrap();

        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.selected_index(), None);
        assert!(cart.discount().is_zero());
    }

    #[test]
    fn test_select_out_of_range() {
        let mut cart = Cart::new();
        assert!(cart.select(0).is_err());
    }

    #[test]
    fn test_discount_validation_and_clamp() {
        let mut cart = Cart::new();
        cart.add_ad_hoc_item("a", Money::from_minor(10_000)).unwrap();
        let rate = TaxRate::from_bps(1000);

        assert!(cart.set_discount(Money::from_minor(11_001), rate).is_err());
        assert!(cart.set_discount(Money::from_minor(-1), rate).is_err());
        assert!(cart.discount().is_zero());

        cart.set_discount(Money::from_minor(11_000), rate).unwrap();
        cart.add_ad_hoc_item("b", Money::from_minor(1_000)).unwrap();
        cart.remove_item(0).unwrap();

        assert!(cart.clamp_discount(rate));
        assert_eq!(cart.discount().minor(), 1_100);
        assert!(!cart.clamp_discount(rate));
    }

    #[test]
    fn test_check_invariants_on_deserialized_cart() {
        let mut cart = Cart::new();
        cart.add_catalog_item(&product("1", 1_000, 3), None).unwrap();
        cart.select(0).unwrap();
        assert!(cart.check_invariants().is_ok());

        let mut over_stock = cart.clone();
        over_stock.items[0].quantity = 4;
        assert!(matches!(over_stock.check_invariants(), Err(CoreError::OutOfStock { .. })));

        let mut zero = cart.clone();
        zero.items[0].quantity = 0;
        assert!(matches!(zero.check_invariants(), Err(CoreError::InvalidQuantity(0))));

        let mut dangling = cart.clone();
        dangling.items.clear();
        assert!(matches!(dangling.check_invariants(), Err(CoreError::InvalidIndex { index: 0, len: 0 })));
    }
}
