//! # Cart Commands
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Checkout │────►│  Sale    │       │
//! │  │  Cart    │     │          │     │          │     │ committed│       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │       ▲                │   │                                           │
//! │       │           scan_barcode      hold_cart ──► held:<timestamp>     │
//! │       │           add_ad_hoc_item         ▲              │             │
//! │       │           set_quantity            └─ recall_cart ┘             │
//! │       │           remove_item                                          │
//! │       └──────────  clear_cart                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every command returns the cart as it now stands, with fresh totals.

use tally_core::validation::validate_barcode;
use tally_core::{Money, Weight};
use tally_db::Catalog;
use tracing::debug;

use crate::error::{CommandError, CommandResult, Outcome};
use crate::state::{CartStore, CartView};

/// Resolves a barcode and adds the product.
///
/// Weighed products need `weight`; scanner events never carry one, so a
/// weighed product scanned without the scale fails with a validation error.
pub async fn scan_barcode(
    cart: &CartStore,
    catalog: &dyn Catalog,
    code: &str,
    weight: Option<Weight>,
) -> CommandResult<Outcome<CartView>> {
    let code = code.trim();
    debug!(barcode = %code, ?weight, "scan_barcode command");
    validate_barcode(code)?;

    let product = catalog
        .resolve_by_barcode(code)
        .await?
        .ok_or_else(|| CommandError::not_found("Product", code))?;

    let outcome = cart.add_catalog_item(&product, weight).await?;
    Ok(outcome.map(|(_, view)| view))
}

pub async fn add_ad_hoc_item(cart: &CartStore, name: &str, price: Money) -> CommandResult<Outcome<CartView>> {
    debug!(name = %name, price = %price, "add_ad_hoc_item command");
    let outcome = cart.add_ad_hoc_item(name, price).await?;
    Ok(outcome.map(|(_, view)| view))
}

pub async fn set_quantity(cart: &CartStore, index: usize, quantity: i64) -> CommandResult<Outcome<CartView>> {
    debug!(index, quantity, "set_quantity command");
    cart.set_quantity(index, quantity).await
}

pub async fn remove_item(cart: &CartStore, index: usize) -> CommandResult<Outcome<CartView>> {
    debug!(index, "remove_item command");
    let outcome = cart.remove_item(index).await?;
    Ok(outcome.map(|(_, view)| view))
}

pub async fn clear_cart(cart: &CartStore) -> CommandResult<Outcome<CartView>> {
    debug!("clear_cart command");
    cart.clear().await
}

pub async fn select_item(cart: &CartStore, index: usize) -> CommandResult<Outcome<CartView>> {
    cart.select(index).await
}

pub async fn set_discount(cart: &CartStore, discount: Money) -> CommandResult<Outcome<CartView>> {
    debug!(discount = %discount, "set_discount command");
    cart.set_discount(discount).await
}

pub async fn get_cart(cart: &CartStore) -> CommandResult<CartView> {
    cart.view().await
}

pub async fn hold_cart(cart: &CartStore) -> CommandResult<Outcome<String>> {
    debug!("hold_cart command");
    cart.hold().await
}

pub async fn list_held(cart: &CartStore) -> CommandResult<Vec<String>> {
    cart.held().await
}

pub async fn recall_cart(cart: &CartStore, key: &str) -> CommandResult<Outcome<CartView>> {
    debug!(key = %key, "recall_cart command");
    cart.recall(key).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::sync::Arc;
    use tally_core::{Product, TaxRate};
    use tally_db::{MemoryCatalog, MemoryStore};

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::with_products([
            Product {
                id: "p-teh".to_string(),
                barcode: "8991002101234".to_string(),
                name: "Teh Botol".to_string(),
                unit_price: Money::from_minor(3_500),
                stock_on_hand: 2,
                sold_by_weight: false,
            },
            Product {
                id: "p-apel".to_string(),
                barcode: "2000001".to_string(),
                name: "Apel".to_string(),
                unit_price: Money::from_minor(12_000),
                stock_on_hand: 0,
                sold_by_weight: true,
            },
        ])
    }

    fn cart() -> CartStore {
        CartStore::new(Arc::new(MemoryStore::new()), TaxRate::zero())
    }

    #[tokio::test]
    async fn test_scan_known_barcode() {
        let (cart, catalog) = (cart(), catalog());
        scan_barcode(&cart, &catalog, " 8991002101234 ", None).await.unwrap();
        let view = scan_barcode(&cart, &catalog, "8991002101234", None).await.unwrap().value;

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 2);
        assert_eq!(view.totals.subtotal.minor(), 7_000);
    }

    #[tokio::test]
    async fn test_scan_unknown_barcode() {
        let (cart, catalog) = (cart(), catalog());
        let err = scan_barcode(&cart, &catalog, "0000", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_scan_past_stock() {
        let (cart, catalog) = (cart(), catalog());
        for _ in 0..2 {
            scan_barcode(&cart, &catalog, "8991002101234", None).await.unwrap();
        }
        let err = scan_barcode(&cart, &catalog, "8991002101234", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::StockError);
    }

    #[tokio::test]
    async fn test_weighed_product() {
        let (cart, catalog) = (cart(), catalog());

        let err = scan_barcode(&cart, &catalog, "2000001", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let weight: Weight = "0.5".parse().unwrap();
        let view = scan_barcode(&cart, &catalog, "2000001", Some(weight)).await.unwrap().value;
        assert_eq!(view.items[0].unit_price.minor(), 6_000);
        assert_eq!(view.items[0].quantity, 1);
        assert_eq!(view.items[0].display_name, "Apel (0.5 kg)");
    }

    #[tokio::test]
    async fn test_bad_barcode_rejected_before_lookup() {
        let (cart, catalog) = (cart(), catalog());
        let err = scan_barcode(&cart, &catalog, "   ", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_ad_hoc_and_remove() {
        let cart = cart();
        add_ad_hoc_item(&cart, "Gift wrap", Money::from_minor(5_000)).await.unwrap();
        add_ad_hoc_item(&cart, "Gift wrap", Money::from_minor(5_000)).await.unwrap();
        let view = get_cart(&cart).await.unwrap();
        assert_eq!(view.items[0].quantity, 2);

        let view = remove_item(&cart, 0).await.unwrap().value;
        assert!(view.items.is_empty());

        let err = remove_item(&cart, 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
    }
}
