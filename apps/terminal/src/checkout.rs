//! # Checkout Controller
//!
//! Turns the live cart into a committed sale and a printed receipt.
//!
//! ## Checkout Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  pay(method, tendered)                                                  │
//! │                                                                         │
//! │  ┌── cart lock ─────────────────────────────────────────────────────┐   │
//! │  │ 1. totals = pricing::compute_for(cart)                           │   │
//! │  │ 2. tendered < total? ──► InsufficientPayment (cart unchanged)    │   │
//! │  │ 3. SaleRecord { items, totals, change, cashier, now }            │   │
//! │  │ 4. sink.append(record)  ──► error: cart unchanged, sale not made │   │
//! │  │ 5. cart.clear() + snapshot                                       │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │  6. receipt::encode(record) ──► printer.submit()                        │
//! │        failure ──► Warning::PrintFailed (sale stays committed)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Printing happens after the cart lock is released, so a slow printer
//! never holds up the next scan.

use chrono::Utc;
use std::sync::Arc;
use tally_core::pricing;
use tally_core::receipt::{self, ReceiptTarget, StoreProfile};
use tally_core::validation::validate_tendered;
use tally_core::{CoreError, Money, NewSale, PaymentMethod, SaleRecord};
use tally_db::SaleSink;
use tally_devices::PrinterChannel;
use tracing::{info, warn};

use crate::error::{CommandError, CommandResult, Outcome, Warning};
use crate::state::CartStore;

/// Everything the receipt needs that is not in the sale.
#[derive(Debug, Clone)]
pub struct ReceiptSettings {
    pub profile: StoreProfile,
    pub target: ReceiptTarget,
    pub cashier: String,
}

pub struct CheckoutController {
    cart: Arc<CartStore>,
    sink: Arc<dyn SaleSink>,
    printer: Arc<PrinterChannel>,
    receipt: ReceiptSettings,
}

impl CheckoutController {
    pub fn new(
        cart: Arc<CartStore>,
        sink: Arc<dyn SaleSink>,
        printer: Arc<PrinterChannel>,
        receipt: ReceiptSettings,
    ) -> Self {
        CheckoutController {
            cart,
            sink,
            printer,
            receipt,
        }
    }

    /// Takes payment for the live cart.
    ///
    /// Cash needs `tendered`. For other methods `tendered` is optional; when
    /// given it must cover the total and the difference is returned as
    /// change, otherwise the amount tendered is the total and change is 0.
    pub async fn checkout(
        &self,
        method: PaymentMethod,
        tendered: Option<Money>,
    ) -> CommandResult<Outcome<SaleRecord>> {
        let mut cart = self.cart.lock().await;
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let totals = pricing::compute_for(&cart, self.cart.tax_rate())?;

        if let Some(amount) = tendered {
            validate_tendered(amount)?;
        }
        let amount_tendered = match (method, tendered) {
            (PaymentMethod::Cash, None) => {
                return Err(CommandError::validation("Cash payment requires the amount tendered"));
            }
            (_, Some(amount)) => amount,
            (_, None) => totals.total,
        };
        if amount_tendered < totals.total {
            return Err(CoreError::InsufficientPayment {
                tendered: amount_tendered,
                total: totals.total,
            }
            .into());
        }

        let sale = SaleRecord::new(NewSale {
            items: cart.items().to_vec(),
            totals,
            payment_method: method,
            amount_tendered,
            change: amount_tendered - totals.total,
            cashier: self.receipt.cashier.clone(),
            timestamp: Utc::now(),
        });

        self.sink.append(&sale).await?;
        info!(
            sale_id = %sale.sale_id(),
            sale_number = %sale.sale_number(),
            total = %totals.total,
            method = %method,
            "Sale committed"
        );

        cart.clear();
        let mut outcome = Outcome::new(sale);
        if let Some(warning) = self.cart.persist(&cart).await {
            outcome.warn(warning);
        }
        drop(cart);

        let document = receipt::encode(&outcome.value, &self.receipt.profile, self.receipt.target);
        if let Err(e) = self.printer.submit(&document).await {
            warn!(sale_id = %outcome.value.sale_id(), error = %e, "Receipt not printed");
            outcome.warn(Warning::PrintFailed(e.to_string()));
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tally_core::TaxRate;
    use tally_db::{MemoryLedger, MemoryStore};
    use tally_devices::testing::ScriptedOpener;
    use tally_devices::DeviceEndpoint;
    use tokio::io::AsyncReadExt;

    struct Fixture {
        kv: Arc<MemoryStore>,
        ledger: Arc<MemoryLedger>,
        cart: Arc<CartStore>,
        printer: Arc<PrinterChannel>,
        opener: Arc<ScriptedOpener>,
        checkout: CheckoutController,
    }

    fn fixture(tax_bps: u32) -> Fixture {
        let kv = Arc::new(MemoryStore::new());
        let ledger = Arc::new(MemoryLedger::new());
        let cart = Arc::new(CartStore::new(kv.clone(), TaxRate::from_bps(tax_bps)));
        let opener = Arc::new(ScriptedOpener::new());
        let printer = Arc::new(PrinterChannel::new(opener.clone()));
        let checkout = CheckoutController::new(
            cart.clone(),
            ledger.clone(),
            printer.clone(),
            ReceiptSettings {
                profile: StoreProfile::default(),
                target: ReceiptTarget::EscPos,
                cashier: "Ayu".to_string(),
            },
        );
        Fixture {
            kv,
            ledger,
            cart,
            printer,
            opener,
            checkout,
        }
    }

    #[tokio::test]
    async fn test_exact_cash_gives_zero_change() {
        let f = fixture(0);
        let mut far = f.opener.push_port();
        f.printer
            .connect(&DeviceEndpoint::from_path("/dev/ttyUSB0"), 9_600)
            .await
            .unwrap();
        f.cart.add_ad_hoc_item("Rice cooker", Money::from_minor(100_000)).await.unwrap();

        let outcome = f
            .checkout
            .checkout(PaymentMethod::Cash, Some(Money::from_minor(100_000)))
            .await
            .unwrap();
        assert!(outcome.is_clean());
        assert_eq!(outcome.value.change(), Money::zero());
        assert_eq!(outcome.value.totals().total.minor(), 100_000);

        assert!(f.cart.view().await.unwrap().items.is_empty());
        assert_eq!(f.ledger.len().await, 1);

        // Receipt reached the printer: starts with ESC @
        let mut head = [0u8; 2];
        far.read_exact(&mut head).await.unwrap();
        assert_eq!(head, [0x1B, b'@']);
    }

    #[tokio::test]
    async fn test_short_cash_rejected_and_cart_unchanged() {
        let f = fixture(0);
        f.cart.add_ad_hoc_item("Rice cooker", Money::from_minor(100_000)).await.unwrap();
        let before = f.cart.view().await.unwrap();

        let err = f
            .checkout
            .checkout(PaymentMethod::Cash, Some(Money::from_minor(99_999)))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentError);

        assert_eq!(f.cart.view().await.unwrap(), before);
        assert_eq!(f.ledger.len().await, 0);
    }

    #[tokio::test]
    async fn test_print_failure_keeps_sale() {
        // Printer never connected
        let f = fixture(1_100);
        f.cart.add_ad_hoc_item("Gift wrap", Money::from_minor(5_000)).await.unwrap();

        let outcome = f
            .checkout
            .checkout(PaymentMethod::Cash, Some(Money::from_minor(10_000)))
            .await
            .unwrap();

        assert!(matches!(outcome.warnings.as_slice(), [Warning::PrintFailed(_)]));
        assert_eq!(outcome.value.change().minor(), 10_000 - 5_550);
        assert!(f.cart.view().await.unwrap().items.is_empty());
        assert_eq!(f.ledger.records().await, vec![outcome.value]);
    }

    #[tokio::test]
    async fn test_ledger_failure_keeps_cart() {
        let f = fixture(0);
        f.cart.add_ad_hoc_item("Gift wrap", Money::from_minor(5_000)).await.unwrap();
        f.ledger.set_fail_writes(true);

        let err = f
            .checkout
            .checkout(PaymentMethod::Card, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(f.cart.view().await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_failure_is_warning_after_commit() {
        let f = fixture(0);
        f.cart.add_ad_hoc_item("Gift wrap", Money::from_minor(5_000)).await.unwrap();
        f.kv.set_fail_writes(true);

        let outcome = f.checkout.checkout(PaymentMethod::Transfer, None).await.unwrap();
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::Persistence(_))));
        assert_eq!(f.ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_card_without_tendered_has_no_change() {
        let f = fixture(0);
        f.cart.add_ad_hoc_item("Gift wrap", Money::from_minor(5_000)).await.unwrap();

        let sale = f.checkout.checkout(PaymentMethod::Card, None).await.unwrap().value;
        assert_eq!(sale.amount_tendered().minor(), 5_000);
        assert_eq!(sale.change(), Money::zero());
    }

    #[tokio::test]
    async fn test_cash_requires_tendered() {
        let f = fixture(0);
        f.cart.add_ad_hoc_item("Gift wrap", Money::from_minor(5_000)).await.unwrap();

        let err = f.checkout.checkout(PaymentMethod::Cash, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let f = fixture(0);
        let err = f.checkout.checkout(PaymentMethod::Card, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
    }

    #[tokio::test]
    async fn test_discount_reflected_in_sale() {
        let f = fixture(1_100);
        f.cart.add_ad_hoc_item("A", Money::from_minor(8_000)).await.unwrap();
        f.cart.set_discount(Money::from_minor(500)).await.unwrap();

        let sale = f
            .checkout
            .checkout(PaymentMethod::Cash, Some(Money::from_minor(10_000)))
            .await
            .unwrap()
            .value;
        assert_eq!(sale.totals().discount.minor(), 500);
        assert_eq!(sale.totals().total.minor(), 8_380);
        assert_eq!(sale.change().minor(), 1_620);
    }
}
