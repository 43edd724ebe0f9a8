//! # Cart Handle
//!
//! The waiter's cart for one order modal, backed by the product catalog.
//!
//! ```text
//! add_item("KG-BUFFET", 1, Some(450), None)
//!      │
//!      ▼
//! catalog.lookup(code) ── None ──► ProductNotFound
//!      │ Some(product)
//!      ▼
//! cart.add_item(&product, ...)    (mesa-core, pure)
//!      │
//!      ▼
//! CartTotals for the footer
//! ```
//!
//! Lookups run before the cart lock is taken, so a slow catalog never
//! blocks a read of the totals.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use mesa_core::{Cart, CartTotals, CoreError, Money, Product};

use crate::catalog::ProductCatalog;
use crate::error::ServiceResult;

pub struct CartHandle {
    catalog: Arc<dyn ProductCatalog>,
    cart: Mutex<Cart>,
}

impl CartHandle {
    pub fn new(catalog: Arc<dyn ProductCatalog>) -> Self {
        CartHandle {
            catalog,
            cart: Mutex::new(Cart::new()),
        }
    }

    /// Adds a product by code. Weighable products need `weight_grams`.
    pub async fn add_item(
        &self,
        code: &str,
        quantity: i64,
        weight_grams: Option<i64>,
        notes: Option<&str>,
    ) -> ServiceResult<CartTotals> {
        let product = self.lookup(code).await?;

        let mut cart = self.cart.lock().await;
        cart.add_item(&product, quantity, weight_grams, notes)?;
        debug!(code, lines = cart.item_count(), "Item added to cart");
        Ok(cart.totals(Money::zero()))
    }

    /// `quantity <= 0` removes the line without asking the catalog.
    pub async fn set_quantity(&self, code: &str, quantity: i64) -> ServiceResult<CartTotals> {
        if quantity <= 0 {
            return Ok(self.remove_item(code).await);
        }

        let product = self.lookup(code).await?;
        let mut cart = self.cart.lock().await;
        cart.set_quantity(&product, quantity)?;
        Ok(cart.totals(Money::zero()))
    }

    /// `grams <= 0` removes the line without asking the catalog.
    pub async fn set_weight(&self, code: &str, grams: i64) -> ServiceResult<CartTotals> {
        if grams <= 0 {
            return Ok(self.remove_item(code).await);
        }

        let product = self.lookup(code).await?;
        let mut cart = self.cart.lock().await;
        cart.set_weight(&product, grams)?;
        Ok(cart.totals(Money::zero()))
    }

    pub async fn remove_item(&self, code: &str) -> CartTotals {
        let mut cart = self.cart.lock().await;
        cart.remove_item(code);
        cart.totals(Money::zero())
    }

    pub async fn clear(&self) {
        self.cart.lock().await.clear();
    }

    /// Footer totals with `discount` applied (clamped to the subtotal).
    pub async fn totals(&self, discount: Money) -> CartTotals {
        self.cart.lock().await.totals(discount)
    }

    /// Copy of the current cart.
    pub async fn snapshot(&self) -> Cart {
        self.cart.lock().await.clone()
    }

    /// Exclusive access to the cart; edits wait until the guard drops.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock().await
    }

    async fn lookup(&self, code: &str) -> ServiceResult<Product> {
        self.catalog
            .lookup(code)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(code.to_string()).into())
    }
}
