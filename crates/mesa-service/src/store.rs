//! # Order Store
//!
//! The persistence seam the coordinator and table service talk to.
//!
//! ## Saving a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert_sale_with_items(sale, items)                                    │
//! │                                                                         │
//! │  Default (two writes + compensation)    SQLite (Database)               │
//! │  ───────────────────────────────────    ─────────────────               │
//! │  insert_sale(sale)                      BEGIN                           │
//! │       │ fails → SaleInsertError::Sale     INSERT sale                   │
//! │       ▼                                   INSERT items                  │
//! │  insert_sale_items(items)               COMMIT                          │
//! │       │ fails                             │ any failure → ROLLBACK      │
//! │       ▼                                   ▼                             │
//! │  delete_sale(sale.id)                   Items { compensated: true }     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Items { compensated: delete ok? }                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use tracing::{debug, error, warn};

use mesa_core::{Sale, SaleItem, SaleStatus, Table, TableState, TableStatus};
use mesa_db::{Database, SaleWriteError, TableDetails};

use crate::error::{StoreError, StoreResult};

/// Which step of saving a sale failed.
#[derive(Debug)]
pub enum SaleInsertError {
    /// The sale header was not written; nothing to clean up.
    Sale(StoreError),

    /// The items were not written. `compensated` is true when the sale
    /// header is gone again.
    Items {
        source: StoreError,
        compensated: bool,
    },
}

/// Persistent storage for tables and table sales.
#[async_trait]
pub trait OrderStore: Send + Sync {
    // -------------------------------------------------------------------------
    // Tables
    // -------------------------------------------------------------------------

    async fn get_table(&self, id: &str) -> StoreResult<Option<Table>>;

    /// Tables ordered by number.
    async fn list_tables(&self, include_inactive: bool) -> StoreResult<Vec<Table>>;

    async fn find_active_table_by_number(&self, number: i64) -> StoreResult<Option<Table>>;

    /// Highest number over all tables, inactive ones included.
    async fn max_table_number(&self) -> StoreResult<Option<i64>>;

    async fn insert_table(&self, table: &Table) -> StoreResult<()>;

    async fn update_table_details(&self, id: &str, details: &TableDetails) -> StoreResult<()>;

    async fn set_table_active(&self, id: &str, active: bool) -> StoreResult<()>;

    /// Compare-and-set on status: writes `next` only while the table is
    /// still `expected`. Returns whether the write happened.
    async fn update_table_state(
        &self,
        id: &str,
        expected: TableStatus,
        next: &TableState,
    ) -> StoreResult<bool>;

    // -------------------------------------------------------------------------
    // Sales
    // -------------------------------------------------------------------------

    async fn get_sale(&self, id: &str) -> StoreResult<Option<Sale>>;

    async fn get_sale_items(&self, sale_id: &str) -> StoreResult<Vec<SaleItem>>;

    async fn insert_sale(&self, sale: &Sale) -> StoreResult<()>;

    async fn insert_sale_items(&self, items: &[SaleItem]) -> StoreResult<()>;

    /// Deletes a sale together with its items.
    async fn delete_sale(&self, id: &str) -> StoreResult<()>;

    async fn set_sale_status(&self, id: &str, from: SaleStatus, to: SaleStatus)
        -> StoreResult<()>;

    /// Moves the table from `previous` to `next` (compare-and-set on
    /// `previous.status`) and the sale `sale_id` from open to
    /// `sale_status`. Both writes land or neither does.
    ///
    /// Returns `Ok(false)` when the table had already left
    /// `previous.status`; nothing is written then.
    ///
    /// The default writes the table first and puts it back to `previous`
    /// if the sale write fails.
    async fn update_table_state_with_sale(
        &self,
        id: &str,
        previous: &TableState,
        next: &TableState,
        sale_id: &str,
        sale_status: SaleStatus,
    ) -> StoreResult<bool> {
        if !self.update_table_state(id, previous.status, next).await? {
            return Ok(false);
        }

        if let Err(source) = self.set_sale_status(sale_id, SaleStatus::Open, sale_status).await {
            warn!(table_id = %id, sale_id, error = %source, "Sale status write failed, reverting table");

            match self.update_table_state(id, next.status, previous).await {
                Ok(true) => {}
                Ok(false) => error!(table_id = %id, "Table moved again before it could be reverted"),
                Err(e) => error!(table_id = %id, error = %e, "Reverting table failed"),
            }

            return Err(source);
        }

        Ok(true)
    }

    /// Saves a sale and its items so that either both exist or neither does.
    ///
    /// Stores without multi-row transactions get this default: two writes,
    /// and a best-effort delete of the sale when the items fail.
    async fn insert_sale_with_items(
        &self,
        sale: &Sale,
        items: &[SaleItem],
    ) -> Result<(), SaleInsertError> {
        self.insert_sale(sale).await.map_err(SaleInsertError::Sale)?;
        debug!(sale_id = %sale.id, "Sale header written");

        if let Err(source) = self.insert_sale_items(items).await {
            warn!(sale_id = %sale.id, error = %source, "Item insert failed, deleting sale");

            let compensated = match self.delete_sale(&sale.id).await {
                Ok(()) => true,
                Err(e) => {
                    error!(sale_id = %sale.id, error = %e, "Compensating delete failed, sale is orphaned");
                    false
                }
            };

            return Err(SaleInsertError::Items {
                source,
                compensated,
            });
        }

        Ok(())
    }
}

// =============================================================================
// SQLite implementation
// =============================================================================

#[async_trait]
impl OrderStore for Database {
    async fn get_table(&self, id: &str) -> StoreResult<Option<Table>> {
        Ok(self.tables().get(id).await?)
    }

    async fn list_tables(&self, include_inactive: bool) -> StoreResult<Vec<Table>> {
        Ok(self.tables().list(include_inactive).await?)
    }

    async fn find_active_table_by_number(&self, number: i64) -> StoreResult<Option<Table>> {
        Ok(self.tables().find_active_by_number(number).await?)
    }

    async fn max_table_number(&self) -> StoreResult<Option<i64>> {
        Ok(self.tables().max_number().await?)
    }

    async fn insert_table(&self, table: &Table) -> StoreResult<()> {
        self.tables().insert(table).await?;
        Ok(())
    }

    async fn update_table_details(&self, id: &str, details: &TableDetails) -> StoreResult<()> {
        Ok(self.tables().update_details(id, details).await?)
    }

    async fn set_table_active(&self, id: &str, active: bool) -> StoreResult<()> {
        Ok(self.tables().set_active(id, active).await?)
    }

    async fn update_table_state(
        &self,
        id: &str,
        expected: TableStatus,
        next: &TableState,
    ) -> StoreResult<bool> {
        Ok(self.tables().update_state(id, expected, next).await?)
    }

    async fn get_sale(&self, id: &str) -> StoreResult<Option<Sale>> {
        Ok(self.sales().get(id).await?)
    }

    async fn get_sale_items(&self, sale_id: &str) -> StoreResult<Vec<SaleItem>> {
        Ok(self.sales().items(sale_id).await?)
    }

    async fn insert_sale(&self, sale: &Sale) -> StoreResult<()> {
        Ok(self.sales().insert(sale).await?)
    }

    async fn insert_sale_items(&self, items: &[SaleItem]) -> StoreResult<()> {
        Ok(self.sales().insert_items(items).await?)
    }

    async fn delete_sale(&self, id: &str) -> StoreResult<()> {
        self.sales().delete(id).await?;
        Ok(())
    }

    async fn set_sale_status(
        &self,
        id: &str,
        from: SaleStatus,
        to: SaleStatus,
    ) -> StoreResult<()> {
        Ok(self.sales().set_status(id, from, to).await?)
    }

    async fn update_table_state_with_sale(
        &self,
        id: &str,
        previous: &TableState,
        next: &TableState,
        sale_id: &str,
        sale_status: SaleStatus,
    ) -> StoreResult<bool> {
        Ok(self
            .tables()
            .update_state_with_sale(id, previous.status, next, sale_id, sale_status)
            .await?)
    }

    /// One transaction, so there is never a sale to clean up.
    async fn insert_sale_with_items(
        &self,
        sale: &Sale,
        items: &[SaleItem],
    ) -> Result<(), SaleInsertError> {
        self.sales()
            .insert_with_items(sale, items)
            .await
            .map_err(|e| match e {
                SaleWriteError::Sale(db) => SaleInsertError::Sale(db.into()),
                SaleWriteError::Items(db) => SaleInsertError::Items {
                    source: db.into(),
                    compensated: true,
                },
            })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory store with per-step failure injection.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Step {
        InsertSale,
        InsertItems,
        DeleteSale,
        UpdateTableState,
        SetSaleStatus,
    }

    #[derive(Default)]
    struct State {
        tables: HashMap<String, Table>,
        sales: HashMap<String, Sale>,
        items: Vec<SaleItem>,
        failing: Vec<Step>,
        delays: HashMap<Step, Duration>,
        writes: usize,
    }

    /// Uses the trait's default `insert_sale_with_items`.
    #[derive(Default)]
    pub struct FakeStore {
        state: Mutex<State>,
    }

    impl FakeStore {
        pub fn with_table(table: Table) -> Self {
            let store = FakeStore::default();
            store.put_table(table);
            store
        }

        pub fn put_table(&self, table: Table) {
            self.state.lock().unwrap().tables.insert(table.id.clone(), table);
        }

        pub fn fail_on(&self, step: Step) {
            self.state.lock().unwrap().failing.push(step);
        }

        /// Makes `step` sleep before it runs, to widen race windows.
        pub fn delay_on(&self, step: Step, delay: Duration) {
            self.state.lock().unwrap().delays.insert(step, delay);
        }

        pub fn recover(&self, step: Step) {
            self.state.lock().unwrap().failing.retain(|s| *s != step);
        }

        pub fn table(&self, id: &str) -> Table {
            self.state.lock().unwrap().tables[id].clone()
        }

        pub fn sales(&self) -> Vec<Sale> {
            self.state.lock().unwrap().sales.values().cloned().collect()
        }

        pub fn items(&self) -> Vec<SaleItem> {
            self.state.lock().unwrap().items.clone()
        }

        /// Count of successful write calls.
        pub fn writes(&self) -> usize {
            self.state.lock().unwrap().writes
        }

        fn check(&self, state: &mut State, step: Step) -> StoreResult<()> {
            if state.failing.contains(&step) {
                return Err(StoreError::backend(format!("injected failure at {step:?}")));
            }
            state.writes += 1;
            Ok(())
        }
    }

    #[async_trait]
    impl OrderStore for FakeStore {
        async fn get_table(&self, id: &str) -> StoreResult<Option<Table>> {
            Ok(self.state.lock().unwrap().tables.get(id).cloned())
        }

        async fn list_tables(&self, include_inactive: bool) -> StoreResult<Vec<Table>> {
            let state = self.state.lock().unwrap();
            let mut tables: Vec<Table> = state
                .tables
                .values()
                .filter(|t| include_inactive || t.is_active)
                .cloned()
                .collect();
            tables.sort_by_key(|t| t.number);
            Ok(tables)
        }

        async fn find_active_table_by_number(&self, number: i64) -> StoreResult<Option<Table>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .tables
                .values()
                .find(|t| t.is_active && t.number == number)
                .cloned())
        }

        async fn max_table_number(&self) -> StoreResult<Option<i64>> {
            Ok(self.state.lock().unwrap().tables.values().map(|t| t.number).max())
        }

        async fn insert_table(&self, table: &Table) -> StoreResult<()> {
            let mut state = self.state.lock().unwrap();
            state.writes += 1;
            state.tables.insert(table.id.clone(), table.clone());
            Ok(())
        }

        async fn update_table_details(&self, id: &str, details: &TableDetails) -> StoreResult<()> {
            let mut state = self.state.lock().unwrap();
            state.writes += 1;
            let table = state
                .tables
                .get_mut(id)
                .ok_or_else(|| StoreError::backend("no such table"))?;
            table.number = details.number;
            table.name = details.name.clone();
            table.capacity = details.capacity;
            table.location = details.location.clone();
            Ok(())
        }

        async fn set_table_active(&self, id: &str, active: bool) -> StoreResult<()> {
            let mut state = self.state.lock().unwrap();
            state.writes += 1;
            let table = state
                .tables
                .get_mut(id)
                .ok_or_else(|| StoreError::backend("no such table"))?;
            table.is_active = active;
            Ok(())
        }

        async fn update_table_state(
            &self,
            id: &str,
            expected: TableStatus,
            next: &TableState,
        ) -> StoreResult<bool> {
            let mut state = self.state.lock().unwrap();
            self.check(&mut state, Step::UpdateTableState)?;
            match state.tables.get_mut(id) {
                Some(table) if table.status == expected => {
                    table.status = next.status;
                    table.current_sale_id = next.current_sale_id.clone();
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn get_sale(&self, id: &str) -> StoreResult<Option<Sale>> {
            Ok(self.state.lock().unwrap().sales.get(id).cloned())
        }

        async fn get_sale_items(&self, sale_id: &str) -> StoreResult<Vec<SaleItem>> {
            let state = self.state.lock().unwrap();
            Ok(state.items.iter().filter(|i| i.sale_id == sale_id).cloned().collect())
        }

        async fn insert_sale(&self, sale: &Sale) -> StoreResult<()> {
            let mut state = self.state.lock().unwrap();
            self.check(&mut state, Step::InsertSale)?;
            state.sales.insert(sale.id.clone(), sale.clone());
            Ok(())
        }

        async fn insert_sale_items(&self, items: &[SaleItem]) -> StoreResult<()> {
            let delay = self.state.lock().unwrap().delays.get(&Step::InsertItems).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let mut state = self.state.lock().unwrap();
            self.check(&mut state, Step::InsertItems)?;
            state.items.extend_from_slice(items);
            Ok(())
        }

        async fn delete_sale(&self, id: &str) -> StoreResult<()> {
            let mut state = self.state.lock().unwrap();
            self.check(&mut state, Step::DeleteSale)?;
            state.sales.remove(id);
            state.items.retain(|i| i.sale_id != id);
            Ok(())
        }

        async fn set_sale_status(
            &self,
            id: &str,
            from: SaleStatus,
            to: SaleStatus,
        ) -> StoreResult<()> {
            let mut state = self.state.lock().unwrap();
            self.check(&mut state, Step::SetSaleStatus)?;
            match state.sales.get_mut(id) {
                Some(sale) if sale.status == from => {
                    sale.status = to;
                    Ok(())
                }
                _ => Err(StoreError::backend("sale not found in expected status")),
            }
        }
    }
}
