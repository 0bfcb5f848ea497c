//! Sale commands.

use tally_core::{Money, PaymentMethod, SaleRecord};
use tracing::debug;

use crate::checkout::CheckoutController;
use crate::error::{CommandResult, Outcome};

/// Takes payment for the live cart.
///
/// `method` is the operator's text (`cash`, `card`, `transfer`).
pub async fn checkout(
    controller: &CheckoutController,
    method: &str,
    tendered: Option<Money>,
) -> CommandResult<Outcome<SaleRecord>> {
    debug!(method = %method, ?tendered, "checkout command");

    let method: PaymentMethod = method.parse()?;

    controller.checkout(method, tendered).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::ReceiptSettings;
    use crate::error::ErrorCode;
    use crate::state::CartStore;
    use std::sync::Arc;
    use tally_core::receipt::{ReceiptTarget, StoreProfile};
    use tally_core::TaxRate;
    use tally_db::{MemoryLedger, MemoryStore};
    use tally_devices::testing::ScriptedOpener;
    use tally_devices::PrinterChannel;

    fn controller() -> (Arc<CartStore>, CheckoutController) {
        let cart = Arc::new(CartStore::new(Arc::new(MemoryStore::new()), TaxRate::zero()));
        let printer = Arc::new(PrinterChannel::new(Arc::new(ScriptedOpener::new())));
        let controller = CheckoutController::new(
            cart.clone(),
            Arc::new(MemoryLedger::new()),
            printer,
            ReceiptSettings {
                profile: StoreProfile::default(),
                target: ReceiptTarget::Layout,
                cashier: "Budi".to_string(),
            },
        );
        (cart, controller)
    }

    #[tokio::test]
    async fn test_unknown_method_rejected() {
        let (cart, controller) = controller();
        cart.add_ad_hoc_item("Bag", Money::from_minor(1_000)).await.unwrap();

        let err = checkout(&controller, "cheque", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(cart.view().await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_checkout() {
        let (cart, controller) = controller();
        cart.add_ad_hoc_item("Bag", Money::from_minor(1_000)).await.unwrap();

        let outcome = checkout(&controller, "transfer", None).await.unwrap();
        assert_eq!(outcome.value.payment_method(), PaymentMethod::Transfer);
        assert_eq!(outcome.value.cashier(), "Budi");
        assert!(cart.view().await.unwrap().items.is_empty());
    }
}
