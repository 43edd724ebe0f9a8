//! # Table Service
//!
//! Table CRUD plus the lifecycle moves that don't create a sale.
//!
//! ## Transition Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  transition_table(table_id, event)           [per-table lock held]     │
//! │                                                                         │
//! │  read table                                                            │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  table::transition(table, event) ── rejected ──► CoreError (no write)  │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  close-bill / cancel-sale with a sale:                                 │
//! │     update_table_state_with_sale   table + sale: open → closed /       │
//! │                                    cancelled, both or neither          │
//! │  anything else:                                                        │
//! │     update_table_state                                                 │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  table not in the old status ──────────────────► StaleTable            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Number, name, capacity and location are edited here. Status and
//! current sale only move through `transition_table` and the commit
//! coordinator.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use mesa_core::table::{self, TableEvent};
use mesa_core::validation::{validate_capacity, validate_table_name, validate_table_number};
use mesa_core::{CoreError, Sale, SaleItem, SaleStatus, Table, TableState, TableStatus};
use mesa_db::repository::table::generate_table_id;
use mesa_db::TableDetails;

use crate::coordinator::{load_open_sale, load_table};
use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::locks::TableLocks;
use crate::store::OrderStore;

/// Location given to new tables when none is provided.
pub const DEFAULT_LOCATION: &str = "Área Principal";

/// Seats given to new tables when none is provided.
pub const DEFAULT_CAPACITY: i64 = 4;

/// Defaults applied by [`TableService::create_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefaults {
    pub capacity: i64,
    pub location: String,
}

impl Default for TableDefaults {
    fn default() -> Self {
        TableDefaults {
            capacity: DEFAULT_CAPACITY,
            location: DEFAULT_LOCATION.to_string(),
        }
    }
}

/// Input for [`TableService::create_table`]. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTable {
    /// Defaults to the highest number in use plus one.
    pub number: Option<i64>,
    /// Defaults to "Mesa {number}".
    pub name: Option<String>,
    pub capacity: Option<i64>,
    pub location: Option<String>,
}

/// Changes for [`TableService::update_table`]. `None` keeps the field.
///
/// An empty `location` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TablePatch {
    pub number: Option<i64>,
    pub name: Option<String>,
    pub capacity: Option<i64>,
    pub location: Option<String>,
}

pub struct TableService {
    store: Arc<dyn OrderStore>,
    locks: TableLocks,
    defaults: TableDefaults,
}

impl TableService {
    pub fn new(store: Arc<dyn OrderStore>, locks: TableLocks, defaults: TableDefaults) -> Self {
        TableService {
            store,
            locks,
            defaults,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_table(&self, table_id: &str) -> ServiceResult<Table> {
        load_table(self.store.as_ref(), table_id).await
    }

    /// Tables ordered by number.
    pub async fn list_tables(&self, include_inactive: bool) -> ServiceResult<Vec<Table>> {
        Ok(self.store.list_tables(include_inactive).await?)
    }

    /// The open sale a table points at, with its items in line order.
    ///
    /// `None` for a table without a sale (free, cleaning, or seated
    /// without an order).
    pub async fn current_order(&self, table_id: &str) -> ServiceResult<Option<(Sale, Vec<SaleItem>)>> {
        let table = load_table(self.store.as_ref(), table_id).await?;

        let Some(sale_id) = table.current_sale_id.as_deref() else {
            return Ok(None);
        };

        let sale = load_open_sale(self.store.as_ref(), table_id, sale_id).await?;
        let items = self.store.get_sale_items(&sale.id).await?;
        Ok(Some((sale, items)))
    }

    /// Number a new table gets when none is given.
    ///
    /// Counts inactive tables too, so a deactivated table's number is not
    /// handed out again by default.
    pub async fn next_table_number(&self) -> ServiceResult<i64> {
        Ok(self.store.max_table_number().await?.unwrap_or(0) + 1)
    }

    // =========================================================================
    // Table CRUD
    // =========================================================================

    #[instrument(skip(self, input))]
    pub async fn create_table(&self, input: NewTable) -> ServiceResult<Table> {
        let number = match input.number {
            Some(number) => number,
            None => self.next_table_number().await?,
        };
        validate_table_number(number).map_err(CoreError::from)?;

        let name = input.name.unwrap_or_else(|| format!("Mesa {number}"));
        let name = validate_table_name(&name).map_err(CoreError::from)?;

        let capacity = input.capacity.unwrap_or(self.defaults.capacity);
        validate_capacity(capacity).map_err(CoreError::from)?;

        let location = match input.location {
            Some(location) => non_blank(&location),
            None => Some(self.defaults.location.clone()),
        };

        self.ensure_number_free(number, None).await?;

        let now = Utc::now();
        let table = Table {
            id: generate_table_id(),
            number,
            name,
            capacity,
            status: TableStatus::Free,
            location,
            is_active: true,
            current_sale_id: None,
            created_at: now,
            updated_at: now,
        };

        self.store
            .insert_table(&table)
            .await
            .map_err(|e| number_conflict(e, number))?;

        info!(table_id = %table.id, number, "Table created");
        Ok(table)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_table(&self, table_id: &str, patch: TablePatch) -> ServiceResult<Table> {
        let mut table = load_table(self.store.as_ref(), table_id).await?;

        if let Some(number) = patch.number {
            validate_table_number(number).map_err(CoreError::from)?;
            if number != table.number && table.is_active {
                self.ensure_number_free(number, Some(&table.id)).await?;
            }
            table.number = number;
        }

        if let Some(name) = patch.name {
            table.name = validate_table_name(&name).map_err(CoreError::from)?;
        }

        if let Some(capacity) = patch.capacity {
            validate_capacity(capacity).map_err(CoreError::from)?;
            table.capacity = capacity;
        }

        if let Some(location) = patch.location {
            table.location = non_blank(&location);
        }

        let details = TableDetails {
            number: table.number,
            name: table.name.clone(),
            capacity: table.capacity,
            location: table.location.clone(),
        };

        self.store
            .update_table_details(&table.id, &details)
            .await
            .map_err(|e| number_conflict(e, details.number))?;

        table.updated_at = Utc::now();
        debug!(number = table.number, "Table details updated");
        Ok(table)
    }

    /// Soft-deletes or restores a table. Status and sale are left alone.
    #[instrument(skip(self))]
    pub async fn set_table_active(&self, table_id: &str, active: bool) -> ServiceResult<Table> {
        let mut table = load_table(self.store.as_ref(), table_id).await?;

        if table.is_active == active {
            return Ok(table);
        }

        if active {
            self.ensure_number_free(table.number, Some(&table.id)).await?;
        }

        self.store
            .set_table_active(&table.id, active)
            .await
            .map_err(|e| number_conflict(e, table.number))?;

        table.is_active = active;
        table.updated_at = Utc::now();

        info!(number = table.number, active, "Table activity changed");
        Ok(table)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Applies `event` to the table and persists the result.
    ///
    /// `close-bill` and `cancel-sale` also close or cancel the sale the
    /// table pointed at.
    #[instrument(skip(self), fields(event = event.name()))]
    pub async fn transition_table(&self, table_id: &str, event: TableEvent) -> ServiceResult<Table> {
        let _guard = self.locks.acquire(table_id).await;

        let mut table = load_table(self.store.as_ref(), table_id).await?;

        if let TableEvent::OpenWithSale(sale_id) = &event {
            load_open_sale(self.store.as_ref(), table_id, sale_id).await?;
        }

        let next = table::transition(&table, &event)?;
        let previous = TableState::of(&table);

        let sale_status = match &event {
            TableEvent::CloseBill => Some(SaleStatus::Closed),
            TableEvent::CancelSale => Some(SaleStatus::Cancelled),
            _ => None,
        };

        let written = match (sale_status, previous.current_sale_id.as_deref()) {
            (Some(status), Some(sale_id)) => {
                let written = self
                    .store
                    .update_table_state_with_sale(&table.id, &previous, &next, sale_id, status)
                    .await?;
                if written {
                    debug!(sale_id, ?status, "Sale status updated");
                }
                written
            }
            _ => {
                self.store
                    .update_table_state(&table.id, table.status, &next)
                    .await?
            }
        };

        if !written {
            warn!(from = %table.status, "Table changed while transitioning");
            return Err(ServiceError::StaleTable {
                table_id: table.id,
            });
        }

        info!(
            number = table.number,
            from = %table.status,
            to = %next.status,
            "Table transitioned"
        );

        table.status = next.status;
        table.current_sale_id = next.current_sale_id;
        table.updated_at = Utc::now();
        Ok(table)
    }

    /// Seats guests before anything is ordered.
    pub async fn open_table_without_sale(&self, table_id: &str) -> ServiceResult<Table> {
        self.transition_table(table_id, TableEvent::OpenWithoutSale)
            .await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Fails when an active table other than `exclude_id` uses `number`.
    async fn ensure_number_free(&self, number: i64, exclude_id: Option<&str>) -> ServiceResult<()> {
        match self.store.find_active_table_by_number(number).await? {
            Some(existing) if Some(existing.id.as_str()) != exclude_id => {
                Err(CoreError::DuplicateTableNumber { number }.into())
            }
            _ => Ok(()),
        }
    }
}

/// The unique index is the last line of defense against two tables
/// racing for the same number.
fn number_conflict(err: StoreError, number: i64) -> ServiceError {
    if err.is_unique_violation() {
        CoreError::DuplicateTableNumber { number }.into()
    } else {
        err.into()
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================
