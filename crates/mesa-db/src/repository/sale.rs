//! # Sale Repository
//!
//! Database operations for table sales and their items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Table Sale Lifecycle                              │
//! │                                                                         │
//! │  1. SAVE ORDER                                                         │
//! │     └── insert_with_items() → Sale { status: Open } + items            │
//! │         (one transaction: both land or neither does)                   │
//! │                                                                         │
//! │  2. CLOSE BILL                                                         │
//! │     └── set_status(Open → Closed)                                      │
//! │                                                                         │
//! │  3. (OPTIONAL) CANCEL                                                  │
//! │     └── set_status(Open → Cancelled)                                   │
//! │                                                                         │
//! │  Items are never edited after the sale is saved; deleting a sale       │
//! │  cascades to its items.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mesa_core::{Sale, SaleItem, SaleStatus};

const SALE_COLUMNS: &str = r#"
    id,
    table_id,
    operator_name,
    customer_name,
    customer_count,
    subtotal_cents,
    discount_cents,
    total_cents,
    payment_type,
    change_cents,
    status,
    notes,
    opened_at,
    updated_at
"#;

const ITEM_COLUMNS: &str = r#"
    id,
    sale_id,
    line_no,
    product_code,
    product_name,
    quantity,
    weight_grams,
    unit_price_cents,
    price_per_gram_millicents,
    discount_cents,
    subtotal_cents,
    notes,
    created_at
"#;

/// Which half of a sale write failed.
///
/// Either way the transaction is rolled back, so nothing of the sale is
/// left in the database.
#[derive(Debug, Error)]
pub enum SaleWriteError {
    #[error("Failed to insert sale: {0}")]
    Sale(#[source] DbError),

    #[error("Failed to insert sale items: {0}")]
    Items(#[source] DbError),
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM table_sales WHERE id = ?1");

        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets all items for a sale in cart order.
    pub async fn items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM table_sale_items WHERE sale_id = ?1 ORDER BY line_no"
        );

        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Sales ever opened on a table, newest first.
    pub async fn list_for_table(&self, table_id: &str) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM table_sales WHERE table_id = ?1 ORDER BY opened_at DESC"
        );

        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(table_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Inserts the sale header alone.
    pub async fn insert(&self, sale: &Sale) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_sale_row(&mut conn, sale).await
    }

    /// Inserts a batch of items; all of them or none.
    pub async fn insert_items(&self, items: &[SaleItem]) -> DbResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for item in items {
            insert_item_row(&mut tx, item).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Inserts a sale and its items in one transaction.
    ///
    /// ## Transaction
    /// ```text
    /// BEGIN
    ///   INSERT INTO table_sales ...        ── fails → SaleWriteError::Sale
    ///   INSERT INTO table_sale_items ...   ── fails → SaleWriteError::Items
    ///   INSERT INTO table_sale_items ...
    /// COMMIT                               ── fails → SaleWriteError::Items
    /// ```
    /// Dropping the transaction on an early return rolls it back.
    pub async fn insert_with_items(
        &self,
        sale: &Sale,
        items: &[SaleItem],
    ) -> Result<(), SaleWriteError> {
        debug!(id = %sale.id, table_id = %sale.table_id, items = items.len(), "Inserting sale with items");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SaleWriteError::Sale(DbError::TransactionFailed(e.to_string())))?;

        insert_sale_row(&mut tx, sale)
            .await
            .map_err(SaleWriteError::Sale)?;

        for item in items {
            if let Err(e) = insert_item_row(&mut tx, item).await {
                warn!(sale_id = %sale.id, line_no = item.line_no, error = %e, "Item insert failed, rolling back sale");
                return Err(SaleWriteError::Items(e));
            }
        }

        tx.commit()
            .await
            .map_err(|e| SaleWriteError::Items(DbError::TransactionFailed(e.to_string())))?;

        info!(id = %sale.id, items = items.len(), total_cents = sale.total_cents, "Sale saved");
        Ok(())
    }

    /// Deletes a sale; its items go with it (ON DELETE CASCADE).
    ///
    /// Deleting a sale that doesn't exist is not an error.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting sale");

        let result = sqlx::query("DELETE FROM table_sales WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Moves a sale from `from` to `to`.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no sale with this id in status `from`
    pub async fn set_status(&self, id: &str, from: SaleStatus, to: SaleStatus) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        set_status_row(&mut conn, id, from, to).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM table_sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn count_items(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM table_sale_items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

async fn insert_sale_row(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO table_sales (
            id, table_id, operator_name, customer_name, customer_count,
            subtotal_cents, discount_cents, total_cents,
            payment_type, change_cents, status, notes,
            opened_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.table_id)
    .bind(&sale.operator_name)
    .bind(&sale.customer_name)
    .bind(sale.customer_count)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_cents)
    .bind(sale.total_cents)
    .bind(sale.payment_type)
    .bind(sale.change_cents)
    .bind(sale.status)
    .bind(&sale.notes)
    .bind(sale.opened_at)
    .bind(sale.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn set_status_row(
    conn: &mut SqliteConnection,
    id: &str,
    from: SaleStatus,
    to: SaleStatus,
) -> DbResult<()> {
    debug!(id = %id, ?from, ?to, "Updating sale status");

    let result = sqlx::query(
        "UPDATE table_sales SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sale", id));
    }

    Ok(())
}

/// Product name and prices are copied onto the item so later catalog
/// edits don't rewrite history.
async fn insert_item_row(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO table_sale_items (
            id, sale_id, line_no, product_code, product_name,
            quantity, weight_grams, unit_price_cents, price_per_gram_millicents,
            discount_cents, subtotal_cents, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(item.line_no)
    .bind(&item.product_code)
    .bind(&item.product_name)
    .bind(item.quantity)
    .bind(item.weight_grams)
    .bind(item.unit_price_cents)
    .bind(item.price_per_gram_millicents)
    .bind(item.discount_cents)
    .bind(item.subtotal_cents)
    .bind(&item.notes)
    .bind(item.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale item ID.
pub fn generate_sale_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
