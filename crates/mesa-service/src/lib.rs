//! # mesa-service: Order Orchestration for Mesa POS
//!
//! The layer the UI talks to. It owns every operation that touches more
//! than one row: turning a cart into a sale and seating the table on it,
//! and moving a table through its lifecycle.
//!
//! ## Service Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          MesaService                                    │
//! │                                                                         │
//! │  ┌───────────────┐   ┌──────────────────────────┐   ┌──────────────┐  │
//! │  │  CartHandle   │   │  OrderCommitCoordinator  │   │ TableService │  │
//! │  │  add / set /  │──►│  commit_order            │   │ create/update│  │
//! │  │  remove       │   │  finalize_table_for_sale │   │ transition   │  │
//! │  └───────┬───────┘   └────────────┬─────────────┘   └──────┬───────┘  │
//! │          │                        │  TableLocks (shared)   │          │
//! │          ▼                        ▼                        ▼          │
//! │   ProductCatalog             OrderStore ◄──────────────────┘          │
//! │          │                        │            Notifier (fire & forget)│
//! └──────────┼────────────────────────┼────────────────────────────────────┘
//!            ▼                        ▼
//!        mesa-db (SQLite)         mesa-db (SQLite)
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use mesa_service::{MesaConfig, MesaService};
//! use mesa_core::SaleMeta;
//!
//! let service = MesaService::connect(&MesaConfig::load(None)?).await?;
//!
//! let cart = service.new_cart();
//! cart.add_item("PRATO-FEIJOADA", 2, None, None).await?;
//!
//! let meta = SaleMeta { customer_count: 2, ..SaleMeta::default() };
//! let order = service.commit_cart(&table_id, &cart, meta).await?;
//! ```

pub mod cart;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod locks;
pub mod logging;
pub mod notify;
pub mod store;
pub mod tables;

use std::sync::Arc;

use tracing::info;

use mesa_core::SaleMeta;
use mesa_db::Database;

pub use cart::CartHandle;
pub use catalog::{InMemoryCatalog, ProductCatalog};
pub use config::{DatabaseSettings, MesaConfig, ServiceSettings};
pub use coordinator::{CommittedOrder, OrderCommitCoordinator};
pub use error::{
    ConfigError, ErrorCode, ErrorResponse, ServiceError, ServiceResult, StoreError, StoreResult,
};
pub use locks::TableLocks;
pub use notify::{NoopNotifier, NoticeKind, Notifier, TracingNotifier};
pub use store::{OrderStore, SaleInsertError};
pub use tables::{NewTable, TableDefaults, TablePatch, TableService};

/// Everything the UI needs, wired to one store.
pub struct MesaService {
    coordinator: OrderCommitCoordinator,
    tables: TableService,
    catalog: Arc<dyn ProductCatalog>,
}

impl MesaService {
    /// Opens the configured database and wires the service to it.
    pub async fn connect(config: &MesaConfig) -> ServiceResult<Self> {
        let db = Database::new(config.db_config())
            .await
            .map_err(StoreError::from)?;
        Ok(Self::new(db, &config.service))
    }

    /// Uses `db` for both the order store and the product catalog.
    pub fn new(db: Database, settings: &ServiceSettings) -> Self {
        let db = Arc::new(db);
        Self::with_parts(db.clone(), db, Arc::new(TracingNotifier), settings)
    }

    pub fn with_parts(
        store: Arc<dyn OrderStore>,
        catalog: Arc<dyn ProductCatalog>,
        notifier: Arc<dyn Notifier>,
        settings: &ServiceSettings,
    ) -> Self {
        let locks = TableLocks::new();

        info!(
            operator = %settings.default_operator,
            capacity = settings.default_capacity,
            "Mesa service ready"
        );

        MesaService {
            coordinator: OrderCommitCoordinator::new(
                store.clone(),
                notifier,
                locks.clone(),
                settings.default_operator.clone(),
            ),
            tables: TableService::new(store, locks, settings.table_defaults()),
            catalog,
        }
    }

    pub fn coordinator(&self) -> &OrderCommitCoordinator {
        &self.coordinator
    }

    pub fn tables(&self) -> &TableService {
        &self.tables
    }

    /// A fresh, empty cart for one order.
    pub fn new_cart(&self) -> CartHandle {
        CartHandle::new(self.catalog.clone())
    }

    /// Commits the cart's current contents and empties it on success.
    ///
    /// The cart stays locked for the whole commit, so an edit made
    /// meanwhile lands after the clear instead of being wiped by it. On
    /// failure the cart is kept so the waiter can retry.
    pub async fn commit_cart(
        &self,
        table_id: &str,
        cart: &CartHandle,
        meta: SaleMeta,
    ) -> ServiceResult<CommittedOrder> {
        let mut contents = cart.lock().await;
        let order = self.coordinator.commit_order(table_id, &contents, meta).await?;
        contents.clear();
        Ok(order)
    }
}
