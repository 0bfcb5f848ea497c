//! # Sales Ledger Repository
//!
//! Append-only log of completed sales.
//!
//! ```text
//! ┌──────┬──────────┬────────────────────┬───────┬─────┬──────────────────┐
//! │ seq  │ sale_id  │ sale_number        │ total │ ... │ record (JSON)    │
//! ├──────┼──────────┼────────────────────┼───────┼─────┼──────────────────┤
//! │ 1    │ 5f0c...  │ 260314-092653-0042 │ 8380  │     │ full SaleRecord  │
//! │ 2    │ a91e...  │ 260314-093110-7731 │ 12000 │     │ full SaleRecord  │
//! └──────┴──────────┴────────────────────┴───────┴─────┴──────────────────┘
//! ```
//!
//! `seq` is AUTOINCREMENT, so ledger order is append order. Triggers reject
//! UPDATE and DELETE on the table.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, info};

use tally_core::SaleRecord;

use crate::error::DbResult;
use crate::store::SaleSink;

/// Repository for the `sales` table.
#[derive(Debug, Clone)]
pub struct SaleLedgerRepository {
    pool: SqlitePool,
}

impl SaleLedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleLedgerRepository { pool }
    }

    /// Most recent sales first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<SaleRecord>> {
        let documents: Vec<String> =
            sqlx::query_scalar("SELECT record FROM sales ORDER BY seq DESC LIMIT ?1")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;

        let records = documents
            .iter()
            .map(|doc| serde_json::from_str(doc))
            .collect::<Result<Vec<SaleRecord>, _>>()?;
        Ok(records)
    }

    /// Gets a sale by its id.
    pub async fn get_by_id(&self, sale_id: &str) -> DbResult<Option<SaleRecord>> {
        let document: Option<String> =
            sqlx::query_scalar("SELECT record FROM sales WHERE sale_id = ?1")
                .bind(sale_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(document.map(|doc| serde_json::from_str(&doc)).transpose()?)
    }

    /// Number of sales in the ledger.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl SaleSink for SaleLedgerRepository {
    async fn append(&self, sale: &SaleRecord) -> DbResult<()> {
        let document = serde_json::to_string(sale)?;
        debug!(sale_id = %sale.sale_id(), bytes = document.len(), "Appending sale");

        sqlx::query(
            r#"
            INSERT INTO sales (sale_id, sale_number, total, payment_method, cashier, created_at, record)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(sale.sale_id())
        .bind(sale.sale_number())
        .bind(sale.totals().total.minor())
        .bind(sale.payment_method().label())
        .bind(sale.cashier())
        .bind(sale.timestamp())
        .bind(document)
        .execute(&self.pool)
        .await?;

        info!(
            sale_id = %sale.sale_id(),
            sale_number = %sale.sale_number(),
            total = %sale.totals().total,
            "Sale appended to ledger"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use chrono::{TimeZone, Utc};
    use tally_core::{Money, NewSale, PaymentMethod, Totals};

    fn sale(id: &str, total: i64) -> SaleRecord {
        SaleRecord::with_ids(
            id,
            format!("260314-092653-{}", id),
            NewSale {
                items: Vec::new(),
                totals: Totals {
                    total: Money::from_minor(total),
                    subtotal: Money::from_minor(total),
                    ..Totals::default()
                },
                payment_method: PaymentMethod::Cash,
                amount_tendered: Money::from_minor(total),
                change: Money::zero(),
                cashier: "Ayu".to_string(),
                timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
            },
        )
    }

    #[tokio::test]
    async fn test_append_and_read_back_in_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ledger = db.sales();

        ledger.append(&sale("0001", 1_000)).await.unwrap();
        ledger.append(&sale("0002", 2_000)).await.unwrap();
        ledger.append(&sale("0003", 3_000)).await.unwrap();

        assert_eq!(ledger.count().await.unwrap(), 3);

        let recent = ledger.recent(2).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|r| r.sale_id()).collect();
        assert_eq!(ids, vec!["0003", "0002"]);

        let one = ledger.get_by_id("0001").await.unwrap().unwrap();
        assert_eq!(one, sale("0001", 1_000));
        assert!(ledger.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sale_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ledger = db.sales();

        ledger.append(&sale("0001", 1_000)).await.unwrap();
        assert!(matches!(
            ledger.append(&sale("0001", 1_000)).await,
            Err(DbError::UniqueViolation { .. })
        ));
        assert_eq!(ledger.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ledger_rows_are_immutable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ledger = db.sales();
        ledger.append(&sale("0001", 1_000)).await.unwrap();

        let update = sqlx::query("UPDATE sales SET total = 0").execute(db.pool()).await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM sales").execute(db.pool()).await;
        assert!(delete.is_err());

        assert_eq!(ledger.count().await.unwrap(), 1);
    }
}
