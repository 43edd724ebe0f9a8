//! # Repository Module
//!
//! Database repository implementations for Mesa POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  mesa-service                                                          │
//! │       │                                                                 │
//! │       │  db.tables().update_state(id, Free, next)                      │
//! │       ▼                                                                 │
//! │  TableRepository                                                       │
//! │  ├── get(&self, id)                                                    │
//! │  ├── list(&self, include_inactive)                                     │
//! │  ├── insert(&self, table)                                              │
//! │  └── update_state(&self, id, expected, next)                           │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - catalog lookups
//! - [`TableRepository`](table::TableRepository) - restaurant tables and their state
//! - [`SaleRepository`](sale::SaleRepository) - table sales and their items

pub mod product;
pub mod sale;
pub mod table;
