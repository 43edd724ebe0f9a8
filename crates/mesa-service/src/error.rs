//! # Service Error Types
//!
//! Errors surfaced to whoever drives the service (the UI layer).
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Mesa POS                               │
//! │                                                                         │
//! │  mesa-core          mesa-db            mesa-service                     │
//! │  ─────────          ───────            ────────────                     │
//! │                                                                         │
//! │  CoreError ──────────────────────────► ServiceError::Core              │
//! │                     DbError ──► StoreError ──► ServiceError::Store     │
//! │                                        │                                │
//! │                                        ├──► ItemPersistence            │
//! │                                        │    (sale rolled back)          │
//! │                                        └──► TableUpdate                │
//! │                                             (sale kept, table stale)    │
//! │                                                                         │
//! │  ServiceError::code() ──► ErrorCode ("TABLE_NOT_AVAILABLE", ...)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation, pricing and transition errors are raised before the first
//! write. Only `ItemPersistence` and `TableUpdate` describe failures that
//! happened after something was written.

use serde::Serialize;
use thiserror::Error;

use mesa_core::{CoreError, SaleStatus};
use mesa_db::DbError;

// =============================================================================
// Store Error
// =============================================================================

/// Failure of an [`OrderStore`](crate::store::OrderStore) or
/// [`ProductCatalog`](crate::catalog::ProductCatalog) call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),

    /// Failure reported by a non-SQLite backend.
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend(message.into())
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::Db(e) if e.is_unique_violation())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Config Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config file: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Service Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Business rule violation from mesa-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// The sale's items could not be saved.
    ///
    /// `compensated` tells whether the sale header was removed again. When
    /// it is `false` an orphan sale with id `sale_id` is left behind.
    #[error("Failed to save items of sale {sale_id} (rolled back: {compensated}): {source}")]
    ItemPersistence {
        sale_id: String,
        compensated: bool,
        #[source]
        source: StoreError,
    },

    /// Sale and items are saved but the table still shows its old state.
    ///
    /// Retry with `finalize_table_for_sale(table_id, sale_id)`.
    #[error("Sale {sale_id} was saved but table {table_id} was not updated: {reason}")]
    TableUpdate {
        sale_id: String,
        table_id: String,
        reason: String,
        #[source]
        source: Option<StoreError>,
    },

    /// The table moved between reading it and writing its new state.
    #[error("Table {table_id} was changed by someone else, reload and retry")]
    StaleTable { table_id: String },

    #[error("Sale {sale_id} belongs to table {actual_table_id}, not {table_id}")]
    SaleTableMismatch {
        sale_id: String,
        table_id: String,
        actual_table_id: String,
    },

    #[error("Sale {sale_id} is {status:?}, expected open")]
    SaleNotOpen { sale_id: String, status: SaleStatus },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Machine-readable error codes for the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    PricingError,
    CartError,
    InvalidTransition,
    DuplicateTableNumber,
    TableInactive,
    TableNotAvailable,
    EmptyCart,
    InconsistentTable,
    ItemPersistence,
    TableUpdate,
    Conflict,
    ConfigError,
    StoreError,
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Core(core) => match core {
                CoreError::Pricing(_) => ErrorCode::PricingError,
                CoreError::ProductNotFound(_) => ErrorCode::NotFound,
                CoreError::ItemNotInCart(_) => ErrorCode::CartError,
                CoreError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
                CoreError::DuplicateTableNumber { .. } => ErrorCode::DuplicateTableNumber,
                CoreError::TableInactive { .. } => ErrorCode::TableInactive,
                CoreError::TableNotAvailable { .. } => ErrorCode::TableNotAvailable,
                CoreError::EmptyCart => ErrorCode::EmptyCart,
                CoreError::InconsistentTable { .. } => ErrorCode::InconsistentTable,
                CoreError::Validation(_) => ErrorCode::ValidationError,
            },
            ServiceError::TableNotFound(_) | ServiceError::SaleNotFound(_) => ErrorCode::NotFound,
            ServiceError::ItemPersistence { .. } => ErrorCode::ItemPersistence,
            ServiceError::TableUpdate { .. } => ErrorCode::TableUpdate,
            ServiceError::StaleTable { .. } => ErrorCode::Conflict,
            ServiceError::SaleTableMismatch { .. } | ServiceError::SaleNotOpen { .. } => {
                ErrorCode::ValidationError
            }
            ServiceError::Config(_) => ErrorCode::ConfigError,
            ServiceError::Store(_) => ErrorCode::StoreError,
        }
    }
}

/// What the UI receives when an operation fails.
///
/// ```json
/// { "code": "TABLE_NOT_AVAILABLE", "message": "Table t1 is not available (status: occupied)" }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        ErrorResponse {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use mesa_core::TableStatus;

    #[test]
    fn test_core_errors_keep_their_code() {
        let err: ServiceError = CoreError::TableNotAvailable {
            table_id: "t1".to_string(),
            status: TableStatus::Occupied,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::TableNotAvailable);

        let err: ServiceError = CoreError::EmptyCart.into();
        assert_eq!(err.code(), ErrorCode::EmptyCart);
    }

    #[test]
    fn test_store_unique_violation() {
        let err = StoreError::from(DbError::duplicate("number", "3"));
        assert!(err.is_unique_violation());
        assert!(!StoreError::backend("boom").is_unique_violation());
    }

    #[test]
    fn test_error_response_shape() {
        let err = ServiceError::ItemPersistence {
            sale_id: "s1".to_string(),
            compensated: true,
            source: StoreError::backend("disk full"),
        };
        let json = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(json["code"], "ITEM_PERSISTENCE");
        assert!(json["message"].as_str().unwrap().contains("s1"));
    }
}
