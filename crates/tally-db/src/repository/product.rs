//! # Product Repository
//!
//! Barcode lookup for the scanner path, plus the writes the seed tool needs.
//! The terminal itself never changes products.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use tally_core::{Money, Product};

use crate::error::{DbError, DbResult};
use crate::store::Catalog;

/// Repository for the `products` table.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product or replaces the one with the same id.
    pub async fn upsert(&self, product: &Product) -> DbResult<()> {
        if product.unit_price.is_negative() {
            return Err(DbError::QueryFailed(format!(
                "negative unit price for {}",
                product.id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO products (id, barcode, name, unit_price, stock_on_hand, sold_by_weight, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                barcode = excluded.barcode,
                name = excluded.name,
                unit_price = excluded.unit_price,
                stock_on_hand = excluded.stock_on_hand,
                sold_by_weight = excluded.sold_by_weight,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&product.id)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(product.unit_price.minor())
        .bind(product.stock_on_hand)
        .bind(product.sold_by_weight)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a product by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, barcode, name, unit_price, stock_on_hand, sold_by_weight FROM products WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| product_from_row(&r)).transpose()
    }

    /// Sets the stock on hand for a product.
    pub async fn set_stock(&self, id: &str, stock_on_hand: i64) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET stock_on_hand = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(stock_on_hand)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Counts products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl Catalog for ProductRepository {
    async fn resolve_by_barcode(&self, code: &str) -> DbResult<Option<Product>> {
        let code = code.trim();
        debug!(barcode = %code, "Resolving barcode");

        let row = sqlx::query(
            "SELECT id, barcode, name, unit_price, stock_on_hand, sold_by_weight FROM products WHERE barcode = ?1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| product_from_row(&r)).transpose()
    }
}

fn product_from_row(row: &SqliteRow) -> DbResult<Product> {
    Ok(Product {
        id: row.try_get("id")?,
        barcode: row.try_get("barcode")?,
        name: row.try_get("name")?,
        unit_price: Money::from_minor(row.try_get("unit_price")?),
        stock_on_hand: row.try_get("stock_on_hand")?,
        sold_by_weight: row.try_get("sold_by_weight")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn apel() -> Product {
        Product {
            id: "p-apel".to_string(),
            barcode: "2000001".to_string(),
            name: "Apel Fuji".to_string(),
            unit_price: Money::from_minor(12_000),
            stock_on_hand: 0,
            sold_by_weight: true,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_resolve() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.upsert(&apel()).await.unwrap();

        let found = repo.resolve_by_barcode(" 2000001 ").await.unwrap().unwrap();
        assert_eq!(found, apel());
        assert!(repo.resolve_by_barcode("404").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        repo.upsert(&apel()).await.unwrap();

        let mut changed = apel();
        changed.unit_price = Money::from_minor(15_000);
        repo.upsert(&changed).await.unwrap();

        assert_eq!(repo.get_by_id("p-apel").await.unwrap().unwrap().unit_price.minor(), 15_000);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_barcode_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        repo.upsert(&apel()).await.unwrap();

        let mut other = apel();
        other.id = "p-other".to_string();
        assert!(matches!(
            repo.upsert(&other).await,
            Err(DbError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_set_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        repo.upsert(&apel()).await.unwrap();

        repo.set_stock("p-apel", 12).await.unwrap();
        assert_eq!(repo.get_by_id("p-apel").await.unwrap().unwrap().stock_on_hand, 12);
        assert!(matches!(repo.set_stock("missing", 1).await, Err(DbError::NotFound { .. })));
    }
}
