//! # Error Types
//!
//! Domain-specific error types for mesa-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mesa-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── PricingError     - Missing price / weight, line amount too large  │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  mesa-db errors                                                        │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  mesa-service errors                                                   │
//! │  └── ServiceError     - What the UI layer sees                         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → UI                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant raised here is raised before anything is written, so a
//! `CoreError` never leaves partial state behind.

use thiserror::Error;

use crate::table::TableEvent;
use crate::types::TableStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A product needed for pricing could not be priced.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Product code unknown to the catalog (or deactivated there).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Cart operation referenced a product code the cart doesn't hold.
    #[error("Product {0} is not in the cart")]
    ItemNotInCart(String),

    /// Table event not allowed from the table's current status.
    ///
    /// ## User Workflow
    /// ```text
    /// Table 4 is Cleaning
    ///      │
    ///      ▼
    /// request-bill
    ///      │
    ///      ▼
    /// InvalidTransition { from: Cleaning, event: "request-bill" }
    ///      │
    ///      ▼
    /// Table row untouched
    /// ```
    #[error("Table {table_id}: cannot apply {event} while {from}")]
    InvalidTransition {
        table_id: String,
        from: TableStatus,
        event: String,
    },

    /// Another active table already uses this number.
    #[error("Table number {number} is already in use")]
    DuplicateTableNumber { number: i64 },

    /// Table is deactivated and cannot be opened.
    #[error("Table {table_id} is inactive")]
    TableInactive { table_id: String },

    /// Table must be free to start a new order.
    #[error("Table {table_id} is not available (status: {status})")]
    TableNotAvailable { table_id: String, status: TableStatus },

    /// Orders need at least one line.
    #[error("Cannot create an order from an empty cart")]
    EmptyCart,

    /// Table row breaks the status / current sale invariant.
    #[error("Table {table_id} is {status} but current sale is {current_sale_id:?}")]
    InconsistentTable {
        table_id: String,
        status: TableStatus,
        current_sale_id: Option<String>,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Builds an `InvalidTransition` for a table event.
    pub fn invalid_transition(
        table_id: impl Into<String>,
        from: TableStatus,
        event: &TableEvent,
    ) -> Self {
        CoreError::InvalidTransition {
            table_id: table_id.into(),
            from,
            event: event.name().to_string(),
        }
    }
}

// =============================================================================
// Pricing Error
// =============================================================================

/// Raised when a product lacks the data its pricing branch needs, or
/// prices a line beyond what a cart can hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// Unit-priced product without `unit_price`, or weighable product
    /// without `price_per_gram`.
    #[error("Product {code} has no {field}")]
    MissingPrice { code: String, field: &'static str },

    /// Weighable product priced without a weight.
    #[error("Product {code} is sold by weight; a weight in grams is required")]
    MissingWeight { code: String },

    /// Price × quantity (or weight) above `MAX_LINE_SUBTOTAL_CENTS`.
    #[error("Line total for product {code} is too large")]
    AmountTooLarge { code: String },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Field does not apply to this kind of product.
    #[error("{field} does not apply to {reason}")]
    NotApplicable { field: String, reason: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::TableNotAvailable {
            table_id: "t1".to_string(),
            status: TableStatus::Occupied,
        };
        assert_eq!(err.to_string(), "Table t1 is not available (status: occupied)");

        let err = CoreError::invalid_transition("t1", TableStatus::Cleaning, &TableEvent::RequestBill);
        assert_eq!(
            err.to_string(),
            "Table t1: cannot apply request-bill while cleaning"
        );
    }

    #[test]
    fn test_pricing_error_messages() {
        let err = PricingError::MissingPrice {
            code: "A".to_string(),
            field: "unit_price",
        };
        assert_eq!(err.to_string(), "Product A has no unit_price");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
