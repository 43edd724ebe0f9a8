//! # Domain Types
//!
//! Core domain types used throughout Mesa POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Table       │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  code (unique)  │   │  number         │   │  id (UUID)      │       │
//! │  │  is_weighable   │   │  status ────────┼──►│  table_id (FK)  │       │
//! │  │  unit_price     │   │  current_sale_id│   │  totals         │       │
//! │  │  price_per_gram │   │  is_active      │   │  payment_type   │       │
//! │  └─────────────────┘   └─────────────────┘   └────────┬────────┘       │
//! │                                                        │ owns           │
//! │                                               ┌────────▼────────┐       │
//! │                                               │    SaleItem     │       │
//! │                                               │  (snapshot of a │       │
//! │                                               │   cart line)    │       │
//! │                                               └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::{GramRate, Money};

// =============================================================================
// Product
// =============================================================================

/// A catalog product, as handed over by the product catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,

    /// Business identifier, unique across the catalog.
    pub code: String,

    pub name: String,

    /// Sold by weight (buffet, cheese counter) rather than by unit.
    pub is_weighable: bool,

    /// Price per unit in cents. Used when not weighable.
    pub unit_price_cents: Option<i64>,

    /// Price per gram in thousandths of a cent. Used when weighable.
    pub price_per_gram_millicents: Option<i64>,

    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn unit_price(&self) -> Option<Money> {
        self.unit_price_cents.map(Money::from_cents)
    }

    #[inline]
    pub fn price_per_gram(&self) -> Option<GramRate> {
        self.price_per_gram_millicents.map(GramRate::from_millicents)
    }
}

// =============================================================================
// Table Status
// =============================================================================

/// Occupancy status of a restaurant table.
///
/// ```text
/// free ──open──► occupied ──request-bill──► awaiting_payment
///  ▲                │                              │
///  │           cancel-sale                    close-bill
///  │                ▼                              ▼
///  └───────────── free          free ◄──mark-clean── cleaning
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Free,
    Occupied,
    AwaitingPayment,
    Cleaning,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Free => "free",
            TableStatus::Occupied => "occupied",
            TableStatus::AwaitingPayment => "awaiting_payment",
            TableStatus::Cleaning => "cleaning",
        }
    }
}

impl Default for TableStatus {
    fn default() -> Self {
        TableStatus::Free
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Table
// =============================================================================

/// A restaurant table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Table {
    pub id: String,

    /// Unique among active tables.
    pub number: i64,

    pub name: String,

    /// Seats; bounds the customer count of a sale.
    pub capacity: i64,

    pub status: TableStatus,

    /// Free-form area label ("Varanda", "Salão").
    pub location: Option<String>,

    /// Soft-delete flag. Inactive tables keep their history but cannot be opened.
    pub is_active: bool,

    pub current_sale_id: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Table {
    /// Checks that `current_sale_id` agrees with `status`.
    ///
    /// ## Rule
    /// - `free`, `cleaning`: no sale
    /// - `awaiting_payment`: a sale
    /// - `occupied`: a sale, unless the table was opened without one
    ///
    /// The last case comes from the "open without sale" quick action: the
    /// table is seated before anything is ordered.
    pub fn check_invariant(&self) -> Result<(), crate::error::CoreError> {
        let consistent = match self.status {
            TableStatus::Free | TableStatus::Cleaning => self.current_sale_id.is_none(),
            TableStatus::AwaitingPayment => self.current_sale_id.is_some(),
            TableStatus::Occupied => true,
        };

        if consistent {
            Ok(())
        } else {
            Err(crate::error::CoreError::InconsistentTable {
                table_id: self.id.clone(),
                status: self.status,
                current_sale_id: self.current_sale_id.clone(),
            })
        }
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// Lifecycle of a table sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Order placed, table occupied.
    Open,
    /// Bill closed at the table.
    Closed,
    /// Sale dropped before payment.
    Cancelled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Open
    }
}

// =============================================================================
// Payment Type
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Cash,
    Pix,
    CreditCard,
    DebitCard,
    Voucher,
    /// Split across several of the above.
    Mixed,
}

impl Default for PaymentType {
    fn default() -> Self {
        PaymentType::Cash
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A table order, persisted together with its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub table_id: String,
    pub operator_name: String,
    pub customer_name: Option<String>,
    /// 1..=table capacity.
    pub customer_count: i64,
    pub subtotal_cents: i64,
    /// 0..=subtotal.
    pub discount_cents: i64,
    /// max(0, subtotal - discount).
    pub total_cents: i64,
    pub payment_type: PaymentType,
    /// Change handed back; only meaningful for cash.
    pub change_cents: i64,
    pub status: SaleStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A persisted line of a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    /// 1-based position in the cart the sale was built from.
    pub line_no: i64,
    pub product_code: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    pub quantity: i64,
    pub weight_grams: Option<i64>,
    pub unit_price_cents: Option<i64>,
    pub price_per_gram_millicents: Option<i64>,
    pub discount_cents: i64,
    pub subtotal_cents: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Sale Meta
// =============================================================================

/// Header data the waiter enters alongside the cart when saving an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleMeta {
    /// Falls back to the configured default operator.
    pub operator_name: Option<String>,
    pub customer_name: Option<String>,
    pub customer_count: i64,
    pub discount_cents: i64,
    pub payment_type: PaymentType,
    pub change_cents: i64,
    pub notes: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
