//! # Store Seams
//!
//! The three collaborators the checkout core needs from the outside world,
//! as object-safe async traits.
//!
//! ```text
//! ┌──────────────────┬───────────────────────────┬─────────────────────────┐
//! │ Trait            │ SQLite implementation     │ In-memory double        │
//! ├──────────────────┼───────────────────────────┼─────────────────────────┤
//! │ KeyValueStore    │ KvRepository              │ MemoryStore             │
//! │ Catalog          │ ProductRepository         │ MemoryCatalog           │
//! │ SaleSink         │ SaleLedgerRepository      │ MemoryLedger            │
//! └──────────────────┴───────────────────────────┴─────────────────────────┘
//! ```
//!
//! The doubles can be told to fail their writes so callers can exercise the
//! persistence-warning and ledger-failure paths without a broken disk.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use tally_core::{Product, SaleRecord};

use crate::error::{DbError, DbResult};

// =============================================================================
// Traits
// =============================================================================

/// String key-value persistence.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> DbResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> DbResult<()>;

    /// Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> DbResult<()>;

    /// Keys starting with `prefix`, in ascending order.
    async fn keys_with_prefix(&self, prefix: &str) -> DbResult<Vec<String>>;
}

/// Product lookup.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// `Ok(None)` when no product carries this barcode.
    async fn resolve_by_barcode(&self, code: &str) -> DbResult<Option<Product>>;
}

/// Destination for finished sales. Appends are never reordered or dropped.
#[async_trait]
pub trait SaleSink: Send + Sync {
    async fn append(&self, sale: &SaleRecord) -> DbResult<()>;
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Makes every following `set`/`delete` fail with `Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    fn check_writable(&self) -> DbResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("memory store is read-only".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        self.check_writable()?;
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> DbResult<()> {
        self.check_writable()?;
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> DbResult<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

// =============================================================================
// MemoryCatalog
// =============================================================================

/// In-memory [`Catalog`] keyed by barcode.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    by_barcode: Mutex<HashMap<String, Product>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        MemoryCatalog::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        MemoryCatalog {
            by_barcode: Mutex::new(
                products
                    .into_iter()
                    .map(|p| (p.barcode.clone(), p))
                    .collect(),
            ),
        }
    }

    /// Inserts or replaces a product.
    pub async fn insert(&self, product: Product) {
        self.by_barcode
            .lock()
            .await
            .insert(product.barcode.clone(), product);
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn resolve_by_barcode(&self, code: &str) -> DbResult<Option<Product>> {
        Ok(self.by_barcode.lock().await.get(code.trim()).cloned())
    }
}

// =============================================================================
// MemoryLedger
// =============================================================================

/// In-memory [`SaleSink`] that keeps every appended record in order.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<SaleRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        MemoryLedger::default()
    }

    /// Makes every following `append` fail with `Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn records(&self) -> Vec<SaleRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

#[async_trait]
impl SaleSink for MemoryLedger {
    async fn append(&self, sale: &SaleRecord) -> DbResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("memory ledger is read-only".to_string()));
        }

        let mut records = self.records.lock().await;
        if records.iter().any(|r| r.sale_id() == sale.sale_id()) {
            return Err(DbError::duplicate("sale_id", sale.sale_id()));
        }
        records.push(sale.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tally_core::{Money, NewSale, PaymentMethod, Totals};

    fn sale(id: &str) -> SaleRecord {
        SaleRecord::with_ids(
            id,
            "260101-000000-0000",
            NewSale {
                items: Vec::new(),
                totals: Totals::default(),
                payment_method: PaymentMethod::Card,
                amount_tendered: Money::zero(),
                change: Money::zero(),
                cashier: "test".to_string(),
                timestamp: Utc::now(),
            },
        )
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();

        assert_eq!(store.get("cart_snapshot").await.unwrap(), None);
        store.set("cart_snapshot", "{}").await.unwrap();
        assert_eq!(store.get("cart_snapshot").await.unwrap().as_deref(), Some("{}"));

        store.delete("cart_snapshot").await.unwrap();
        store.delete("cart_snapshot").await.unwrap();
        assert_eq!(store.get("cart_snapshot").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_injected_failure() {
        let store = MemoryStore::new();
        store.set("a", "1").await.unwrap();

        store.set_fail_writes(true);
        assert!(matches!(store.set("a", "2").await, Err(DbError::Unavailable(_))));
        assert!(store.delete("a").await.is_err());
        // Reads still work
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_keys_with_prefix_sorted() {
        let store = MemoryStore::new();
        for key in ["held:2", "cart_snapshot", "held:1", "device_config"] {
            store.set(key, "x").await.unwrap();
        }

        assert_eq!(
            store.keys_with_prefix("held:").await.unwrap(),
            vec!["held:1".to_string(), "held:2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_memory_catalog_lookup() {
        let catalog = MemoryCatalog::with_products([Product {
            id: "p1".to_string(),
            barcode: "123".to_string(),
            name: "Teh".to_string(),
            unit_price: Money::from_minor(3_500),
            stock_on_hand: 3,
            sold_by_weight: false,
        }]);

        assert!(catalog.resolve_by_barcode("123").await.unwrap().is_some());
        assert!(catalog.resolve_by_barcode("999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_ledger_keeps_order_and_rejects_duplicates() {
        let ledger = MemoryLedger::new();
        ledger.append(&sale("a")).await.unwrap();
        ledger.append(&sale("b")).await.unwrap();

        assert!(ledger.append(&sale("a")).await.is_err());

        let ids: Vec<String> = ledger
            .records()
            .await
            .iter()
            .map(|r| r.sale_id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);

        ledger.set_fail_writes(true);
        assert!(ledger.append(&sale("c")).await.is_err());
        assert_eq!(ledger.len().await, 2);
    }
}
