//! # Table Repository
//!
//! Database operations for restaurant tables.
//!
//! ## Two Kinds of Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Details (number, name, capacity, location, is_active)                 │
//! │  └── update_details() / set_active()     plain UPDATE by id            │
//! │                                                                         │
//! │  State (status, current_sale_id)                                       │
//! │  └── update_state()                      compare-and-set:              │
//! │                                                                         │
//! │      UPDATE restaurant_tables                                          │
//! │         SET status = 'occupied', current_sale_id = 's1'                │
//! │       WHERE id = 't1' AND status = 'free'                              │
//! │                                                                         │
//! │      rows_affected = 0  →  someone moved the table first               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::sale::set_status_row;
use mesa_core::{SaleStatus, Table, TableState, TableStatus};

const TABLE_COLUMNS: &str = r#"
    id,
    number,
    name,
    capacity,
    status,
    location,
    is_active,
    current_sale_id,
    created_at,
    updated_at
"#;

/// The editable, non-state fields of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDetails {
    pub number: i64,
    pub name: String,
    pub capacity: i64,
    pub location: Option<String>,
}

/// Repository for restaurant table operations.
#[derive(Debug, Clone)]
pub struct TableRepository {
    pool: SqlitePool,
}

impl TableRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TableRepository { pool }
    }

    /// Gets a table by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Table>> {
        let sql = format!("SELECT {TABLE_COLUMNS} FROM restaurant_tables WHERE id = ?1");

        let table = sqlx::query_as::<_, Table>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(table)
    }

    /// Lists tables ordered by number. Inactive tables only when asked.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<Table>> {
        let sql = if include_inactive {
            format!("SELECT {TABLE_COLUMNS} FROM restaurant_tables ORDER BY number, created_at")
        } else {
            format!(
                "SELECT {TABLE_COLUMNS} FROM restaurant_tables WHERE is_active = 1 ORDER BY number"
            )
        };

        let tables = sqlx::query_as::<_, Table>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(tables)
    }

    /// Finds the active table carrying `number`, if any.
    pub async fn find_active_by_number(&self, number: i64) -> DbResult<Option<Table>> {
        let sql = format!(
            "SELECT {TABLE_COLUMNS} FROM restaurant_tables WHERE number = ?1 AND is_active = 1"
        );

        let table = sqlx::query_as::<_, Table>(&sql)
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(table)
    }

    /// Highest number over all tables, inactive ones included.
    pub async fn max_number(&self) -> DbResult<Option<i64>> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(number) FROM restaurant_tables")
            .fetch_one(&self.pool)
            .await?;

        Ok(max)
    }

    /// Inserts a new table.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - an active table already has this number
    pub async fn insert(&self, table: &Table) -> DbResult<Table> {
        debug!(number = table.number, "Inserting table");

        sqlx::query(
            r#"
            INSERT INTO restaurant_tables (
                id, number, name, capacity, status, location,
                is_active, current_sale_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&table.id)
        .bind(table.number)
        .bind(&table.name)
        .bind(table.capacity)
        .bind(table.status)
        .bind(&table.location)
        .bind(table.is_active)
        .bind(&table.current_sale_id)
        .bind(table.created_at)
        .bind(table.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| number_conflict(e, table.number))?;

        Ok(table.clone())
    }

    /// Rewrites number, name, capacity and location.
    pub async fn update_details(&self, id: &str, details: &TableDetails) -> DbResult<()> {
        debug!(id = %id, number = details.number, "Updating table details");

        let result = sqlx::query(
            r#"
            UPDATE restaurant_tables SET
                number = ?2,
                name = ?3,
                capacity = ?4,
                location = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(details.number)
        .bind(&details.name)
        .bind(details.capacity)
        .bind(&details.location)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| number_conflict(e, details.number))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Table", id));
        }

        Ok(())
    }

    /// Toggles the soft-delete flag.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active, "Setting table active flag");

        let result = sqlx::query(
            "UPDATE restaurant_tables SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Table", id));
        }

        Ok(())
    }

    /// Writes `next` only if the table is still in `expected` status.
    ///
    /// ## Returns
    /// * `Ok(true)` - the state was written
    /// * `Ok(false)` - the table is gone or no longer in `expected`
    pub async fn update_state(
        &self,
        id: &str,
        expected: TableStatus,
        next: &TableState,
    ) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        update_state_row(&mut conn, id, expected, next).await
    }

    /// [`update_state`](Self::update_state) plus moving `sale_id` from
    /// open to `sale_status`, in one transaction.
    ///
    /// ## Transaction
    /// ```text
    /// BEGIN
    ///   UPDATE restaurant_tables ... WHERE status = expected  ── 0 rows → Ok(false)
    ///   UPDATE table_sales ... WHERE status = 'open'          ── 0 rows → NotFound
    /// COMMIT
    /// ```
    /// Any early return drops the transaction, which rolls the table back.
    pub async fn update_state_with_sale(
        &self,
        id: &str,
        expected: TableStatus,
        next: &TableState,
        sale_id: &str,
        sale_status: SaleStatus,
    ) -> DbResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        if !update_state_row(&mut tx, id, expected, next).await? {
            return Ok(false);
        }

        set_status_row(&mut tx, sale_id, SaleStatus::Open, sale_status).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(true)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM restaurant_tables WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

async fn update_state_row(
    conn: &mut SqliteConnection,
    id: &str,
    expected: TableStatus,
    next: &TableState,
) -> DbResult<bool> {
    debug!(
        id = %id,
        from = %expected,
        to = %next.status,
        sale_id = ?next.current_sale_id,
        "Updating table state"
    );

    let result = sqlx::query(
        r#"
        UPDATE restaurant_tables SET
            status = ?3,
            current_sale_id = ?4,
            updated_at = ?5
        WHERE id = ?1 AND status = ?2
        "#,
    )
    .bind(id)
    .bind(expected)
    .bind(next.status)
    .bind(&next.current_sale_id)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// The only UNIQUE index on the table is the active-number one.
fn number_conflict(err: sqlx::Error, number: i64) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("number", number.to_string()),
        other => other,
    }
}

/// Helper to generate a new table ID.
pub fn generate_table_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn new_table(number: i64) -> Table {
        let now = Utc::now();
        Table {
            id: generate_table_id(),
            number,
            name: format!("Mesa {number}"),
            capacity: 4,
            status: TableStatus::Free,
            location: Some("Área Principal".to_string()),
            is_active: true,
            current_sale_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_get_and_list_ordered() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tables();

        repo.insert(&new_table(3)).await.unwrap();
        let one = repo.insert(&new_table(1)).await.unwrap();
        repo.insert(&new_table(2)).await.unwrap();

        let fetched = repo.get(&one.id).await.unwrap().unwrap();
        assert_eq!(fetched.number, 1);
        assert_eq!(fetched.status, TableStatus::Free);
        assert!(fetched.is_active);

        let numbers: Vec<i64> = repo.list(false).await.unwrap().iter().map(|t| t.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(repo.max_number().await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_active_number_is_unique() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tables();

        let first = repo.insert(&new_table(5)).await.unwrap();
        let err = repo.insert(&new_table(5)).await.unwrap_err();
        assert!(err.is_unique_violation());

        // Once the first is deactivated its number is free again.
        repo.set_active(&first.id, false).await.unwrap();
        repo.insert(&new_table(5)).await.unwrap();

        assert_eq!(repo.list(false).await.unwrap().len(), 1);
        assert_eq!(repo.list(true).await.unwrap().len(), 2);
        assert_eq!(repo.count().await.unwrap(), 1);

        // Reactivating the old one would collide.
        let err = repo.set_active(&first.id, true).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_find_active_by_number() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tables();

        let t = repo.insert(&new_table(7)).await.unwrap();
        assert_eq!(repo.find_active_by_number(7).await.unwrap().unwrap().id, t.id);

        repo.set_active(&t.id, false).await.unwrap();
        assert!(repo.find_active_by_number(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_details() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tables();

        let t = repo.insert(&new_table(1)).await.unwrap();
        let details = TableDetails {
            number: 10,
            name: "Varanda 10".to_string(),
            capacity: 6,
            location: Some("Varanda".to_string()),
        };
        repo.update_details(&t.id, &details).await.unwrap();

        let fetched = repo.get(&t.id).await.unwrap().unwrap();
        assert_eq!(fetched.number, 10);
        assert_eq!(fetched.name, "Varanda 10");
        assert_eq!(fetched.capacity, 6);
        assert_eq!(fetched.status, TableStatus::Free);

        assert!(matches!(
            repo.update_details("missing", &details).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_state_is_compare_and_set() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tables();
        let t = repo.insert(&new_table(1)).await.unwrap();

        let occupied = TableState {
            status: TableStatus::Occupied,
            current_sale_id: None,
        };
        assert!(repo.update_state(&t.id, TableStatus::Free, &occupied).await.unwrap());
        // Second writer expecting `free` loses.
        assert!(!repo.update_state(&t.id, TableStatus::Free, &occupied).await.unwrap());

        let fetched = repo.get(&t.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, TableStatus::Occupied);
        assert_eq!(fetched.current_sale_id, None);
    }

    #[tokio::test]
    async fn test_schema_rejects_free_table_with_sale() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tables();
        let t = repo.insert(&new_table(1)).await.unwrap();

        let bad = TableState {
            status: TableStatus::Free,
            current_sale_id: Some("s1".to_string()),
        };
        let err = repo.update_state(&t.id, TableStatus::Free, &bad).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation(_)));
    }
}
