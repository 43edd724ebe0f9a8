//! # Order Commit Coordinator
//!
//! Turns a cart into a saved sale and seats the table on it.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit_order(table_id, cart, meta)          [per-table lock held]     │
//! │                                                                         │
//! │  1. read table ── inactive? ──────────────► TableInactive              │
//! │        │        ── not free? ─────────────► TableNotAvailable          │
//! │        │        ── empty cart? ───────────► EmptyCart                  │
//! │        │        ── bad count/discount? ───► Validation                 │
//! │        ▼                                    (nothing written yet)       │
//! │  2. price cart, build Sale + SaleItems, compute free → occupied        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  3+4. store.insert_sale_with_items        [spawned task from here on]  │
//! │        │   header fails ──────────────────► Store                      │
//! │        │   items fail (sale removed) ─────► ItemPersistence            │
//! │        ▼                                                                │
//! │  6. store.update_table_state(free → occupied, sale.id)                 │
//! │        │   fails / table moved ───────────► TableUpdate                │
//! │        │   (sale kept; retry with finalize_table_for_sale)             │
//! │        ▼                                                                │
//! │  CommittedOrder { sale, items, table }                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The per-table lock serializes commits inside this process; the
//! compare-and-set on `status = 'free'` catches writers outside it.
//!
//! Steps 3 to 6 run in a spawned task holding the table lock. A caller
//! that gives up mid-commit (a timeout, a dropped request) does not cut
//! the sequence short: the compensating delete still runs, or the table
//! still gets occupied.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn, Instrument};

use mesa_core::table::{self, TableEvent};
use mesa_core::validation::{validate_customer_count, validate_non_negative_cents};
use mesa_core::{
    Cart, CoreError, Money, Sale, SaleItem, SaleMeta, SaleStatus, Table, TableState, TableStatus,
};
use mesa_db::repository::sale::{generate_sale_id, generate_sale_item_id};

use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::locks::TableLocks;
use crate::notify::{order_created_message, NoticeKind, Notifier};
use crate::store::{OrderStore, SaleInsertError};

/// Result of a successful commit.
#[derive(Debug, Clone, Serialize)]
pub struct CommittedOrder {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    /// The table as it is now: occupied by `sale`.
    pub table: Table,
}

pub struct OrderCommitCoordinator {
    store: Arc<dyn OrderStore>,
    notifier: Arc<dyn Notifier>,
    locks: TableLocks,
    default_operator: String,
}

impl OrderCommitCoordinator {
    pub fn new(
        store: Arc<dyn OrderStore>,
        notifier: Arc<dyn Notifier>,
        locks: TableLocks,
        default_operator: impl Into<String>,
    ) -> Self {
        OrderCommitCoordinator {
            store,
            notifier,
            locks,
            default_operator: default_operator.into(),
        }
    }

    /// Saves `cart` as a new open sale on a free table and occupies the table.
    ///
    /// The cart itself is left alone; clearing it is up to the caller.
    #[instrument(skip(self, cart, meta), fields(items = cart.item_count()))]
    pub async fn commit_order(
        &self,
        table_id: &str,
        cart: &Cart,
        meta: SaleMeta,
    ) -> ServiceResult<CommittedOrder> {
        let result = self.try_commit(table_id, cart, meta).await;

        match &result {
            Ok(order) => self
                .notifier
                .notify(NoticeKind::Success, &order_created_message(order.table.number)),
            Err(e) => self.notifier.notify(NoticeKind::Failure, &e.to_string()),
        }

        result
    }

    async fn try_commit(
        &self,
        table_id: &str,
        cart: &Cart,
        meta: SaleMeta,
    ) -> ServiceResult<CommittedOrder> {
        let guard = self.locks.acquire(table_id).await;

        let table = load_table(self.store.as_ref(), table_id).await?;
        let (sale, items) = build_sale(&table, cart, meta, &self.default_operator)?;
        let next = table::transition(&table, &TableEvent::OpenWithSale(sale.id.clone()))?;

        debug!(sale_id = %sale.id, total_cents = sale.total_cents, "Persisting sale");

        // Once the first write starts the sequence must finish (or
        // compensate) even if this future is dropped, so it runs in its
        // own task and keeps the table lock until it is done.
        let store = self.store.clone();
        let writes = tokio::spawn(
            async move {
                let _guard = guard;
                persist_order(store.as_ref(), table, sale, items, next).await
            }
            .in_current_span(),
        );

        writes.await.map_err(|e| {
            error!(error = %e, "Commit task did not finish");
            ServiceError::Store(StoreError::backend(format!("commit task failed: {e}")))
        })?
    }

    /// Seats a table on a sale that is already saved.
    ///
    /// Recovery for `TableUpdate`: the sale must belong to the table and
    /// still be open. Calling it again once the table shows the sale is a
    /// no-op.
    #[instrument(skip(self))]
    pub async fn finalize_table_for_sale(
        &self,
        table_id: &str,
        sale_id: &str,
    ) -> ServiceResult<Table> {
        let _guard = self.locks.acquire(table_id).await;

        let table = load_table(self.store.as_ref(), table_id).await?;
        load_open_sale(self.store.as_ref(), table_id, sale_id).await?;

        if table.status == TableStatus::Occupied
            && table.current_sale_id.as_deref() == Some(sale_id)
        {
            debug!("Table already shows this sale");
            return Ok(table);
        }

        ensure_free(&table)?;
        let next = table::transition(&table, &TableEvent::OpenWithSale(sale_id.to_string()))?;
        let table = occupy(self.store.as_ref(), table, sale_id, next).await?;

        info!(table_number = table.number, "Table finalized for existing sale");
        Ok(table)
    }

}

/// Steps 3 to 6: sale and items, then the table.
async fn persist_order(
    store: &dyn OrderStore,
    table: Table,
    sale: Sale,
    items: Vec<SaleItem>,
    next: TableState,
) -> ServiceResult<CommittedOrder> {
    store
        .insert_sale_with_items(&sale, &items)
        .await
        .map_err(|e| match e {
            SaleInsertError::Sale(source) => ServiceError::Store(source),
            SaleInsertError::Items {
                source,
                compensated,
            } => ServiceError::ItemPersistence {
                sale_id: sale.id.clone(),
                compensated,
                source,
            },
        })?;

    let table = occupy(store, table, &sale.id, next).await?;

    info!(
        sale_id = %sale.id,
        table_number = table.number,
        total_cents = sale.total_cents,
        "Order committed"
    );

    Ok(CommittedOrder { sale, items, table })
}

/// Step 6: free → occupied, compare-and-set.
async fn occupy(
    store: &dyn OrderStore,
    mut table: Table,
    sale_id: &str,
    next: TableState,
) -> ServiceResult<Table> {
    let table_update = |reason: &str, source| ServiceError::TableUpdate {
        sale_id: sale_id.to_string(),
        table_id: table.id.clone(),
        reason: reason.to_string(),
        source,
    };

    match store
        .update_table_state(&table.id, TableStatus::Free, &next)
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            warn!(table_id = %table.id, sale_id, "Table left free state before it could be occupied");
            return Err(table_update("table is no longer free", None));
        }
        Err(e) => {
            warn!(table_id = %table.id, sale_id, error = %e, "Table update failed, sale kept");
            return Err(table_update("store error", Some(e)));
        }
    }

    table.status = next.status;
    table.current_sale_id = next.current_sale_id;
    table.updated_at = Utc::now();
    Ok(table)
}

// =============================================================================
// Helpers shared with the table service
// =============================================================================

pub(crate) async fn load_table(store: &dyn OrderStore, table_id: &str) -> ServiceResult<Table> {
    store
        .get_table(table_id)
        .await?
        .ok_or_else(|| ServiceError::TableNotFound(table_id.to_string()))
}

/// Loads a sale and checks it is open and belongs to `table_id`.
pub(crate) async fn load_open_sale(
    store: &dyn OrderStore,
    table_id: &str,
    sale_id: &str,
) -> ServiceResult<Sale> {
    let sale = store
        .get_sale(sale_id)
        .await?
        .ok_or_else(|| ServiceError::SaleNotFound(sale_id.to_string()))?;

    if sale.table_id != table_id {
        return Err(ServiceError::SaleTableMismatch {
            sale_id: sale.id,
            table_id: table_id.to_string(),
            actual_table_id: sale.table_id,
        });
    }

    if sale.status != SaleStatus::Open {
        return Err(ServiceError::SaleNotOpen {
            sale_id: sale.id,
            status: sale.status,
        });
    }

    Ok(sale)
}

/// Inactive tables can't be opened; other tables must be free.
fn ensure_free(table: &Table) -> Result<(), CoreError> {
    if !table.is_active {
        return Err(CoreError::TableInactive {
            table_id: table.id.clone(),
        });
    }

    if table.status != TableStatus::Free {
        return Err(CoreError::TableNotAvailable {
            table_id: table.id.clone(),
            status: table.status,
        });
    }

    Ok(())
}

/// Checks every precondition and prices the cart. Pure: no store access.
fn build_sale(
    table: &Table,
    cart: &Cart,
    meta: SaleMeta,
    default_operator: &str,
) -> Result<(Sale, Vec<SaleItem>), CoreError> {
    ensure_free(table)?;

    if cart.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    validate_customer_count(meta.customer_count, table.capacity)?;
    validate_non_negative_cents("discount", meta.discount_cents)?;
    validate_non_negative_cents("change", meta.change_cents)?;

    let totals = cart.totals(Money::from_cents(meta.discount_cents));
    let now = Utc::now();
    let sale_id = generate_sale_id();

    let sale = Sale {
        id: sale_id.clone(),
        table_id: table.id.clone(),
        operator_name: non_blank(meta.operator_name)
            .unwrap_or_else(|| default_operator.to_string()),
        customer_name: non_blank(meta.customer_name),
        customer_count: meta.customer_count,
        subtotal_cents: totals.subtotal_cents,
        discount_cents: totals.discount_cents,
        total_cents: totals.total_cents,
        payment_type: meta.payment_type,
        change_cents: meta.change_cents,
        status: SaleStatus::Open,
        notes: non_blank(meta.notes),
        opened_at: now,
        updated_at: now,
    };

    let items = cart
        .items()
        .iter()
        .enumerate()
        .map(|(i, line)| line.to_sale_item(generate_sale_item_id(), &sale_id, i as i64 + 1, now))
        .collect();

    Ok((sale, items))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================
