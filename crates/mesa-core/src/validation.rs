//! # Validation Module
//!
//! Input validation for Mesa POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI                                                           │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (business rules)                                 │
//! │  └── Runs before any write, so a rejection never leaves partial state │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK / NOT NULL constraints                                      │
//! │  ├── UNIQUE (active table number)                                      │
//! │  └── Foreign keys (sale → table, item → sale)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_ITEM_WEIGHT_GRAMS, MAX_TABLE_CAPACITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens, underscores only
///
/// ## Example
/// ```rust
/// use mesa_core::validation::validate_product_code;
///
/// assert!(validate_product_code("SUCO-LAR").is_ok());
/// assert!(validate_product_code("").is_err());
/// ```
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.chars().count() > 50 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (table or product), returning it trimmed.
pub fn validate_name(field: &str, name: &str, max: usize) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(name.to_string())
}

/// Table names: required, at most 100 characters.
pub fn validate_table_name(name: &str) -> ValidationResult<String> {
    validate_name("name", name, 100)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity for a unit-priced line (1..=999).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if !(1..=MAX_ITEM_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a weight for a weighable line (1 g to 100 kg).
pub fn validate_weight_grams(grams: i64) -> ValidationResult<()> {
    if !(1..=MAX_ITEM_WEIGHT_GRAMS).contains(&grams) {
        return Err(ValidationError::OutOfRange {
            field: "weight".to_string(),
            min: 1,
            max: MAX_ITEM_WEIGHT_GRAMS,
        });
    }

    Ok(())
}

/// Table numbers start at 1.
pub fn validate_table_number(number: i64) -> ValidationResult<()> {
    if number < 1 {
        return Err(ValidationError::OutOfRange {
            field: "number".to_string(),
            min: 1,
            max: i64::MAX,
        });
    }

    Ok(())
}

pub fn validate_capacity(capacity: i64) -> ValidationResult<()> {
    if !(1..=MAX_TABLE_CAPACITY).contains(&capacity) {
        return Err(ValidationError::OutOfRange {
            field: "capacity".to_string(),
            min: 1,
            max: MAX_TABLE_CAPACITY,
        });
    }

    Ok(())
}

/// Customer count must fit the table: 1..=capacity.
pub fn validate_customer_count(count: i64, capacity: i64) -> ValidationResult<()> {
    if !(1..=capacity).contains(&count) {
        return Err(ValidationError::OutOfRange {
            field: "customer_count".to_string(),
            min: 1,
            max: capacity,
        });
    }

    Ok(())
}

/// Monetary inputs typed by the waiter (discount, change) must not be negative.
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Checks there is room for one more line in a cart holding `current_items`.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_code() {
        assert!(validate_product_code("SUCO-LAR").is_ok());
        assert!(validate_product_code("prato_1").is_ok());

        assert!(validate_product_code("").is_err());
        assert!(validate_product_code("   ").is_err());
        assert!(validate_product_code("has space").is_err());
        assert!(validate_product_code(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_table_name() {
        assert_eq!(validate_table_name("  Mesa 1 ").unwrap(), "Mesa 1");
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_weight() {
        assert!(validate_weight_grams(1).is_ok());
        assert!(validate_weight_grams(100_000).is_ok());
        assert!(validate_weight_grams(0).is_err());
        assert!(validate_weight_grams(100_001).is_err());
    }

    #[test]
    fn test_validate_table_fields() {
        assert!(validate_table_number(1).is_ok());
        assert!(validate_table_number(0).is_err());
        assert!(validate_capacity(4).is_ok());
        assert!(validate_capacity(0).is_err());
        assert!(validate_capacity(51).is_err());
    }

    #[test]
    fn test_validate_customer_count() {
        assert!(validate_customer_count(1, 4).is_ok());
        assert!(validate_customer_count(4, 4).is_ok());
        assert!(validate_customer_count(0, 4).is_err());
        assert!(validate_customer_count(5, 4).is_err());
    }

    #[test]
    fn test_validate_non_negative_cents() {
        assert!(validate_non_negative_cents("discount", 0).is_ok());
        assert!(validate_non_negative_cents("discount", -1).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS - 1).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_err());
    }
}
