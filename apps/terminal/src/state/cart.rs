//! # Cart Store
//!
//! The live cart behind a single async mutex, with every change persisted.
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  scan event / operator command                                          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  lock cart ─────────────────────────────────────────────────────────┐   │
//! │  │  1. apply the operation to a copy                                │   │
//! │  │  2. clamp the discount, recompute totals                         │   │
//! │  │     (error here: copy dropped, cart untouched)                   │   │
//! │  │  3. commit the copy                                              │   │
//! │  │  4. write the snapshot to the store                              │   │
//! │  │     (failure: Warning::Persistence, change stands)               │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │  unlock, return CartView                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Scanner events and operator commands go through the same lock, so their
//! updates never interleave. Snapshot writes happen under the lock as well,
//! which keeps them in mutation order.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tally_core::cart::{Cart, LineItem};
use tally_core::pricing::{self, Totals};
use tally_core::{CoreError, CoreResult, Money, Product, TaxRate, Weight};
use tally_db::KeyValueStore;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::error::{CommandError, CommandResult, Outcome, Warning};

/// Store key of the live cart snapshot.
pub const CART_SNAPSHOT_KEY: &str = "cart_snapshot";

/// Prefix of held-cart keys; the rest of the key is the hold timestamp.
pub const HELD_PREFIX: &str = "held:";

/// What the operator sees after every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub items: Vec<LineItem>,
    pub selected_index: Option<usize>,
    pub totals: Totals,
}

impl CartView {
    fn of(cart: &Cart, tax_rate: TaxRate) -> CoreResult<Self> {
        Ok(CartView {
            items: cart.items().to_vec(),
            selected_index: cart.selected_index(),
            totals: pricing::compute_for(cart, tax_rate)?,
        })
    }
}

pub struct CartStore {
    cart: Mutex<Cart>,
    store: Arc<dyn KeyValueStore>,
    tax_rate: TaxRate,
}

impl CartStore {
    pub fn new(store: Arc<dyn KeyValueStore>, tax_rate: TaxRate) -> Self {
        CartStore {
            cart: Mutex::new(Cart::new()),
            store,
            tax_rate,
        }
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    /// Loads the persisted snapshot, if any. An unreadable snapshot is
    /// discarded with a warning and the cart starts empty.
    pub async fn restore(&self) -> Outcome<CartView> {
        let mut cart = self.cart.lock().await;
        let mut warnings = Vec::new();

        match self.store.get(CART_SNAPSHOT_KEY).await {
            Ok(Some(json)) => match decode_cart(&json) {
                Ok(saved) => {
                    info!(lines = saved.len(), "Cart restored");
                    *cart = saved;
                }
                Err(reason) => {
                    warn!(error = %reason, "Discarding cart snapshot");
                    warnings.push(Warning::Persistence(format!("cart snapshot {}", reason)));
                    if let Err(e) = self.store.delete(CART_SNAPSHOT_KEY).await {
                        warnings.push(Warning::Persistence(e.to_string()));
                    }
                }
            },
            Ok(None) => debug!("No cart snapshot"),
            Err(e) => {
                warn!(error = %e, "Cart snapshot could not be read");
                warnings.push(Warning::Persistence(e.to_string()));
            }
        }

        cart.clamp_discount(self.tax_rate);
        let view = match CartView::of(&cart, self.tax_rate) {
            Ok(view) => view,
            Err(e) => {
                warnings.push(Warning::Persistence(format!("cart snapshot inconsistent: {}", e)));
                *cart = Cart::new();
                empty_view()
            }
        };
        Outcome::with_warnings(view, warnings)
    }

    pub async fn view(&self) -> CommandResult<CartView> {
        let cart = self.cart.lock().await;
        Ok(CartView::of(&cart, self.tax_rate)?)
    }

    /// Adds a catalog product; weighed products need `weight`.
    pub async fn add_catalog_item(
        &self,
        product: &Product,
        weight: Option<Weight>,
    ) -> CommandResult<Outcome<(String, CartView)>> {
        self.mutate(|cart| cart.add_catalog_item(product, weight)).await
    }

    pub async fn add_ad_hoc_item(&self, name: &str, price: Money) -> CommandResult<Outcome<(String, CartView)>> {
        self.mutate(|cart| cart.add_ad_hoc_item(name, price)).await
    }

    pub async fn set_quantity(&self, index: usize, quantity: i64) -> CommandResult<Outcome<CartView>> {
        self.mutate_view(|cart| cart.set_quantity(index, quantity)).await
    }

    pub async fn remove_item(&self, index: usize) -> CommandResult<Outcome<(LineItem, CartView)>> {
        self.mutate(|cart| cart.remove_item(index)).await
    }

    pub async fn clear(&self) -> CommandResult<Outcome<CartView>> {
        self.mutate_view(|cart| {
            cart.clear();
            Ok(())
        })
        .await
    }

    pub async fn select(&self, index: usize) -> CommandResult<Outcome<CartView>> {
        self.mutate_view(|cart| cart.select(index)).await
    }

    pub async fn set_discount(&self, discount: Money) -> CommandResult<Outcome<CartView>> {
        let tax_rate = self.tax_rate;
        self.mutate_view(|cart| cart.set_discount(discount, tax_rate).map(|_| ()))
            .await
    }

    // =========================================================================
    // Held carts
    // =========================================================================

    /// Parks the cart under `held:<timestamp>` and clears it.
    ///
    /// The held copy must be written; if that fails the cart is left as is.
    pub async fn hold(&self) -> CommandResult<Outcome<String>> {
        let mut cart = self.cart.lock().await;
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let key = format!("{}{}", HELD_PREFIX, Utc::now().format("%Y%m%dT%H%M%S%.6fZ"));
        let json = serde_json::to_string(&*cart).map_err(|e| CommandError::internal(e.to_string()))?;
        self.store.set(&key, &json).await?;

        cart.clear();
        let mut outcome = Outcome::new(key.clone());
        if let Some(warning) = self.persist(&cart).await {
            outcome.warn(warning);
        }

        info!(key = %key, "Cart held");
        Ok(outcome)
    }

    /// Held cart keys, oldest first.
    pub async fn held(&self) -> CommandResult<Vec<String>> {
        Ok(self.store.keys_with_prefix(HELD_PREFIX).await?)
    }

    /// Restores a held cart into the (empty) live cart and drops the held
    /// entry.
    pub async fn recall(&self, key: &str) -> CommandResult<Outcome<CartView>> {
        let mut cart = self.cart.lock().await;
        if !cart.is_empty() {
            return Err(CommandError::cart("Cart must be empty to recall a held cart"));
        }
        if !key.starts_with(HELD_PREFIX) {
            return Err(CommandError::not_found("Held cart", key));
        }

        let json = self
            .store
            .get(key)
            .await?
            .ok_or_else(|| CommandError::not_found("Held cart", key))?;
        let mut held =
            decode_cart(&json).map_err(|reason| CommandError::internal(format!("held cart {}", reason)))?;
        held.clamp_discount(self.tax_rate);
        let view = CartView::of(&held, self.tax_rate)?;

        *cart = held;
        let mut outcome = Outcome::new(view);
        if let Err(e) = self.store.delete(key).await {
            warn!(key = %key, error = %e, "Held cart not removed");
            outcome.warn(Warning::Persistence(e.to_string()));
        }
        if let Some(warning) = self.persist(&cart).await {
            outcome.warn(warning);
        }

        info!(key = %key, lines = cart.len(), "Held cart recalled");
        Ok(outcome)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Exclusive access for checkout. Callers must [`persist`](Self::persist)
    /// any change before releasing the guard.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock().await
    }

    /// Writes the snapshot. Returns the warning to report on failure.
    pub(crate) async fn persist(&self, cart: &Cart) -> Option<Warning> {
        let json = match serde_json::to_string(cart) {
            Ok(json) => json,
            Err(e) => return Some(Warning::Persistence(e.to_string())),
        };
        match self.store.set(CART_SNAPSHOT_KEY, &json).await {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "Cart snapshot not saved");
                Some(Warning::Persistence(e.to_string()))
            }
        }
    }

    async fn mutate<T>(&self, op: impl FnOnce(&mut Cart) -> CoreResult<T>) -> CommandResult<Outcome<(T, CartView)>> {
        let mut cart = self.cart.lock().await;

        let mut next = cart.clone();
        let value = op(&mut next)?;
        if next.clamp_discount(self.tax_rate) {
            debug!(discount = %next.discount(), "Discount lowered to cart total");
        }
        let view = CartView::of(&next, self.tax_rate)?;
        *cart = next;

        let mut outcome = Outcome::new((value, view));
        if let Some(warning) = self.persist(&cart).await {
            outcome.warn(warning);
        }
        Ok(outcome)
    }

    async fn mutate_view(&self, op: impl FnOnce(&mut Cart) -> CoreResult<()>) -> CommandResult<Outcome<CartView>> {
        Ok(self.mutate(op).await?.map(|((), view)| view))
    }
}

/// Parses a stored cart and re-checks its lines. The error reads as the
/// tail of "cart snapshot ...".
fn decode_cart(json: &str) -> Result<Cart, String> {
    let cart: Cart = serde_json::from_str(json).map_err(|e| format!("unreadable: {}", e))?;
    cart.check_invariants().map_err(|e| format!("invalid: {}", e))?;
    Ok(cart)
}

fn empty_view() -> CartView {
    CartView {
        items: Vec::new(),
        selected_index: None,
        totals: Totals::default(),
    }
}
