//! # mesa-core: Pure Business Logic for Mesa POS
//!
//! This crate holds the rules that keep a restaurant table, its open sale
//! and the sale's line items consistent. Everything here is a pure
//! function or a plain data type; persistence and coordination live in
//! `mesa-db` and `mesa-service`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mesa POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    UI layer (external)                          │   │
//! │  │    Table grid ──► Order modal ──► Cart ──► Save order          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 mesa-service (orchestration)                    │   │
//! │  │    commit_order, transition_table, cart handle                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mesa-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  pricing  │  │   cart    │  │   table   │  │ validation│  │   │
//! │  │   │ subtotals │  │ LineItem  │  │  states   │  │   rules   │  │   │
//! │  │   │  totals   │  │  merging  │  │  events   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money and per-gram rates with integer arithmetic
//! - [`types`] - Domain types (Product, Table, Sale, SaleItem, ...)
//! - [`pricing`] - Line subtotals and cart totals
//! - [`cart`] - The in-progress order for one table
//! - [`table`] - Table lifecycle state machine
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use mesa_core::{Cart, Money};
//! # use chrono::Utc;
//! # let product = mesa_core::Product {
//! #     id: "p1".into(), code: "A".into(), name: "Suco".into(),
//! #     is_weighable: false, unit_price_cents: Some(1000),
//! #     price_per_gram_millicents: None, is_active: true,
//! #     created_at: Utc::now(), updated_at: Utc::now(),
//! # };
//!
//! let mut cart = Cart::new();
//! cart.add_item(&product, 2, None, None).unwrap();
//!
//! let totals = cart.totals(Money::zero());
//! assert_eq!(totals.subtotal_cents, 2000);
//! assert_eq!(totals.total_cents, 2000);
//! ```

pub mod cart;
pub mod error;
pub mod money;
pub mod pricing;
pub mod table;
pub mod types;
pub mod validation;

pub use cart::{Cart, CartTotals, LineItem};
pub use error::{CoreError, CoreResult, PricingError, ValidationError};
pub use money::{GramRate, Money};
pub use table::{TableEvent, TableState};
pub use types::*;

/// Maximum distinct lines in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single unit-priced line.
///
/// Guards against typing 1000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum weight of a single weighable line (100 kg).
pub const MAX_ITEM_WEIGHT_GRAMS: i64 = 100_000;

/// Largest subtotal a single line may reach (1 billion in major units).
///
/// With at most [`MAX_CART_ITEMS`] lines, cart sums stay far inside `i64`.
pub const MAX_LINE_SUBTOTAL_CENTS: i64 = 100_000_000_000;

/// Maximum seats on one table.
pub const MAX_TABLE_CAPACITY: i64 = 50;

/// Operator name recorded when the caller does not provide one.
pub const DEFAULT_OPERATOR_NAME: &str = "Sistema";
